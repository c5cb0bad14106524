//! Map issues on flattened text back onto the text nodes they came from.
//!
//! Issues that can no longer be reconciled with the document are dropped,
//! never reported as errors: the analyzer works on a snapshot, and the text
//! may have moved underneath it.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::document::BlockPath;
use crate::flatten::FlatText;
use crate::issue::Issue;
use crate::text_helpers::word_bounds;

/// Limits applied while mapping issues.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Issues longer than this many chars are dropped.
    pub max_issue_len: usize,
    /// Issues whose text contains a period and is longer than this are
    /// treated as sentence-spanning and dropped.
    pub sentence_issue_len: usize,
    /// Word-boundary snapping may grow each side by at most this many chars.
    pub max_snap_expansion: usize,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            max_issue_len: 50,
            sentence_issue_len: 20,
            max_snap_expansion: 15,
        }
    }
}

/// An issue piece pinned to one text node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSpan {
    pub block: BlockPath,
    pub node_index: usize,
    /// Char range inside the node. Never empty.
    pub relative: Range<usize>,
    /// The same range in flattened-text coordinates.
    pub flattened: Range<usize>,
    pub issue: Issue,
}

impl ResolvedSpan {
    pub fn overlaps(&self, other: &ResolvedSpan) -> bool {
        self.relative.start < other.relative.end && other.relative.start < self.relative.end
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DropReason {
    TooLong,
    SpansSentences,
    NoOverlap,
    EmptyPiece,
    TextMismatch,
}

impl DropReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::TooLong => "too long",
            Self::SpansSentences => "spans sentences",
            Self::NoOverlap => "no text node overlaps",
            Self::EmptyPiece => "empty piece",
            Self::TextMismatch => "text mismatch",
        }
    }
}

/// Resolve issues against a flattened document.
///
/// Each issue yields one span per text node it overlaps, provided the
/// node's text still agrees with what the analyzer saw.
pub fn map_issues(issues: &[Issue], flat: &FlatText, config: &MapperConfig) -> Vec<ResolvedSpan> {
    let mut spans = Vec::new();

    for issue in issues {
        if let Some(reason) = length_filter(issue, config) {
            log_drop(issue, reason);
            continue;
        }

        let mut matched = false;
        for entry in flat.entries_overlapping(issue.range()) {
            matched = true;
            let Some(node_text) = flat.entry_text(entry) else {
                continue;
            };
            match resolve_piece(issue, entry.flattened.start, node_text, config) {
                Ok(relative) => {
                    tracing::trace!(
                        target: "redline::map",
                        block = %entry.block,
                        node = entry.node_index,
                        start = relative.start,
                        end = relative.end,
                        "mapped issue piece"
                    );
                    spans.push(ResolvedSpan {
                        block: entry.block.clone(),
                        node_index: entry.node_index,
                        flattened: entry.flattened.start + relative.start
                            ..entry.flattened.start + relative.end,
                        relative,
                        issue: issue.clone(),
                    });
                }
                Err(reason) => log_drop(issue, reason),
            }
        }

        if !matched {
            log_drop(issue, DropReason::NoOverlap);
        }
    }

    spans
}

fn length_filter(issue: &Issue, config: &MapperConfig) -> Option<DropReason> {
    let len = issue.len();
    if len > config.max_issue_len {
        Some(DropReason::TooLong)
    } else if issue.original_text.contains('.') && len > config.sentence_issue_len {
        Some(DropReason::SpansSentences)
    } else {
        None
    }
}

/// Compute, snap and verify the node-relative range for one overlap.
fn resolve_piece(
    issue: &Issue,
    node_start: usize,
    node_text: &str,
    config: &MapperConfig,
) -> Result<Range<usize>, DropReason> {
    let chars: Vec<char> = node_text.chars().collect();
    let start = issue.start.saturating_sub(node_start);
    let end = issue.end.saturating_sub(node_start).min(chars.len());
    if start >= end {
        return Err(DropReason::EmptyPiece);
    }

    let mut range = start..end;
    let snapped = word_bounds(&chars, range.clone());
    let within_cap = snapped.start + config.max_snap_expansion >= range.start
        && snapped.end <= range.end + config.max_snap_expansion;
    if within_cap {
        let expanded: String = chars[snapped.clone()].iter().collect();
        let raw: String = chars[range.clone()].iter().collect();
        if expanded.contains(raw.as_str()) || raw.contains(expanded.as_str()) {
            range = snapped;
        }
    }

    let actual: String = chars[range.clone()].iter().collect();
    let expected = issue.original_text.as_str();
    if actual == expected || actual.contains(expected) || expected.contains(actual.as_str()) {
        Ok(range)
    } else {
        Err(DropReason::TextMismatch)
    }
}

fn log_drop(issue: &Issue, reason: DropReason) {
    tracing::debug!(
        target: "redline::map",
        start = issue.start,
        end = issue.end,
        text = %issue.original_text,
        reason = reason.as_str(),
        "dropped issue"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Block, Document, InlineNode};
    use crate::flatten::flatten;

    fn doc(nodes: &[&str]) -> Document {
        Document::new(vec![Block::paragraph(
            nodes.iter().map(|t| InlineNode::text(*t)).collect(),
        )])
    }

    #[test]
    fn test_maps_to_single_node() {
        let flat = flatten(&doc(&["Hello ", "wrold"]));
        let issues = [Issue::new(6..11, "wrold").with_suggestion("world")];

        let spans = map_issues(&issues, &flat, &MapperConfig::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].node_index, 1);
        assert_eq!(spans[0].relative, 0..5);
        assert_eq!(spans[0].flattened, 6..11);
    }

    #[test]
    fn test_length_filters() {
        let text = "a".repeat(60);
        let flat = flatten(&doc(&[&text]));
        let config = MapperConfig::default();

        let long = Issue::new(0..60, text.clone());
        assert!(map_issues(&[long], &flat, &config).is_empty());

        let flat = flatten(&doc(&["One sentence. Another one here."]));
        let sentence = Issue::new(0..25, "One sentence. Another o");
        assert!(map_issues(&[sentence], &flat, &config).is_empty());

        let short = Issue::new(0..13, "One sentence.");
        assert_eq!(map_issues(&[short], &flat, &config).len(), 1);
    }

    #[test]
    fn test_snaps_to_word_boundaries() {
        let flat = flatten(&doc(&["The quick-witted fox"]));
        let issues = [Issue::new(10..16, "witted")];

        let spans = map_issues(&issues, &flat, &MapperConfig::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].relative, 4..16);
        assert_eq!(spans[0].flattened, 4..16);
    }

    #[test]
    fn test_snap_respects_expansion_cap() {
        let word = "supercalifragilisticexpialidocious";
        let flat = flatten(&doc(&[word]));
        let config = MapperConfig {
            max_snap_expansion: 3,
            ..MapperConfig::default()
        };
        let issues = [Issue::new(5..9, "cali")];

        let spans = map_issues(&issues, &flat, &config);
        assert_eq!(spans[0].relative, 5..9);
    }

    #[test]
    fn test_stale_issue_is_dropped() {
        let flat = flatten(&doc(&["The fox jumped"]));
        let issues = [Issue::new(4..7, "cat")];
        assert!(map_issues(&issues, &flat, &MapperConfig::default()).is_empty());
    }

    #[test]
    fn test_issue_across_nodes_splits_into_pieces() {
        let flat = flatten(&doc(&["very ", "big dog"]));
        let issues = [Issue::new(0..8, "very big").with_suggestion("huge")];

        let spans = map_issues(&issues, &flat, &MapperConfig::default());
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].node_index, spans[0].relative.clone()), (0, 0..5));
        assert_eq!((spans[1].node_index, spans[1].relative.clone()), (1, 0..3));
    }

    #[test]
    fn test_issue_in_separator_maps_nowhere() {
        let document = Document::new(vec![
            Block::paragraph(vec![InlineNode::text("One")]),
            Block::paragraph(vec![InlineNode::text("Two")]),
        ]);
        let flat = flatten(&document);
        let issues = [Issue::new(3..5, "\n\n")];
        assert!(map_issues(&issues, &flat, &MapperConfig::default()).is_empty());
    }
}
