//! Split text nodes around resolved spans, inserting annotation nodes.
//!
//! The rewrite preserves value: concatenating the output's text contents
//! and annotation original texts gives back the input text exactly.

use std::collections::BTreeMap;

use smol_str::{SmolStr, format_smolstr};

use crate::document::{
    Annotation, BlockPath, Document, InlineNode, MarkerKind, Styles, TextRun, block_at_mut,
};
use crate::ids::IdSource;
use crate::mapper::ResolvedSpan;
use crate::text_helpers::{char_len, char_slice};

/// Who an inserted annotation belongs to, and how it is rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationOwner {
    pub pass_id: Option<SmolStr>,
    pub marker: MarkerKind,
    /// Kind used when the issue carries none.
    pub default_kind: SmolStr,
}

impl AnnotationOwner {
    /// Annotations inserted by a check pass, tagged with its id and command.
    pub fn pass(pass_id: impl Into<SmolStr>, command: impl Into<SmolStr>) -> Self {
        Self {
            pass_id: Some(pass_id.into()),
            marker: MarkerKind::Issue,
            default_kind: command.into(),
        }
    }

    /// Annotations from the standalone grammar checker.
    pub fn grammar() -> Self {
        Self {
            pass_id: None,
            marker: MarkerKind::Grammar,
            default_kind: SmolStr::new_static("grammar"),
        }
    }
}

/// Result of [`annotate`].
#[derive(Clone, Debug, PartialEq)]
pub struct Annotated {
    pub document: Document,
    /// Ids of every annotation inserted, in document order.
    pub inserted: Vec<SmolStr>,
}

/// Rewrite one text run into fragments and annotations.
///
/// Spans are sorted by start, descending, and a span that overlaps one
/// already kept is discarded. Ties keep input order, so the first span
/// given wins. Spans that fall outside the run are ignored.
pub fn rewrite_node(
    run: &TextRun,
    spans: &[&ResolvedSpan],
    owner: &AnnotationOwner,
    ids: &mut dyn IdSource,
) -> Vec<InlineNode> {
    let chars: Vec<char> = run.content.chars().collect();

    let mut sorted: Vec<&ResolvedSpan> = spans
        .iter()
        .copied()
        .filter(|span| span.relative.start < span.relative.end && span.relative.end <= chars.len())
        .collect();
    sorted.sort_by(|a, b| b.relative.start.cmp(&a.relative.start));

    let mut kept: Vec<&ResolvedSpan> = Vec::with_capacity(sorted.len());
    for span in sorted {
        if kept.iter().any(|k| k.overlaps(span)) {
            tracing::trace!(
                target: "redline::rewrite",
                start = span.relative.start,
                end = span.relative.end,
                "discarded overlapping span"
            );
            continue;
        }
        kept.push(span);
    }

    // Ids are handed out left to right so they follow reading order.
    let mut fresh: Vec<SmolStr> = (0..kept.len()).map(|_| ids.next_id()).collect();

    let piece = |range: std::ops::Range<usize>| -> String { chars[range].iter().collect() };
    let mut out = Vec::with_capacity(kept.len() * 2 + 1);
    let mut cursor = chars.len();
    for span in &kept {
        if cursor > span.relative.end {
            out.push(InlineNode::Text(run.fragment(&piece(span.relative.end..cursor))));
        }
        let original = piece(span.relative.clone());
        let issue_id = fresh.pop().unwrap_or_default();
        let annotation = build_annotation(span, original, issue_id, owner, &run.styles);
        out.push(InlineNode::Annotation(annotation));
        cursor = span.relative.start;
    }
    if cursor > 0 {
        out.push(InlineNode::Text(run.fragment(&piece(0..cursor))));
    }

    out.reverse();
    out
}

/// Apply spans to a document in one copy-on-write block replacement.
///
/// Spans are grouped by node; each group's text node is replaced by its
/// rewrite. Groups whose target is no longer a text node are skipped.
pub fn annotate(
    document: &Document,
    spans: &[ResolvedSpan],
    owner: &AnnotationOwner,
    ids: &mut dyn IdSource,
) -> Annotated {
    let mut groups: BTreeMap<(BlockPath, usize), Vec<&ResolvedSpan>> = BTreeMap::new();
    for span in spans {
        groups
            .entry((span.block.clone(), span.node_index))
            .or_default()
            .push(span);
    }

    let mut rewrites = Vec::with_capacity(groups.len());
    let mut inserted = Vec::new();
    for ((path, node_index), group) in &groups {
        let Some(InlineNode::Text(run)) = document
            .block(path)
            .and_then(|block| block.content.get(*node_index))
        else {
            tracing::debug!(
                target: "redline::rewrite",
                block = %path,
                node = node_index,
                "target is not a text node, skipping"
            );
            continue;
        };
        let nodes = rewrite_node(run, group, owner, ids);
        inserted.extend(
            nodes
                .iter()
                .filter_map(InlineNode::as_annotation)
                .map(|a| a.issue_id.clone()),
        );
        rewrites.push((path, *node_index, nodes));
    }

    let mut blocks = document.blocks().to_vec();
    // Later nodes first, so earlier indices in the same block stay valid.
    for (path, node_index, nodes) in rewrites.into_iter().rev() {
        if let Some(block) = block_at_mut(&mut blocks, path) {
            block.content.splice(node_index..=node_index, nodes);
        }
    }

    tracing::debug!(
        target: "redline::rewrite",
        inserted = inserted.len(),
        "annotated document"
    );

    Annotated {
        document: Document::new(blocks),
        inserted,
    }
}

fn build_annotation(
    span: &ResolvedSpan,
    original: String,
    issue_id: SmolStr,
    owner: &AnnotationOwner,
    styles: &Styles,
) -> Annotation {
    let issue = &span.issue;
    Annotation {
        issue_id,
        pass_id: owner.pass_id.clone(),
        kind: if issue.kind.is_empty() {
            owner.default_kind.clone()
        } else {
            issue.kind.clone()
        },
        suggestion: suggestion_for(span, &original),
        original_text: original.into(),
        message: issue.message.clone(),
        severity: issue.severity,
        marker: owner.marker,
        styles: styles.clone(),
    }
}

/// The part of the issue's suggestion that belongs to this span.
///
/// A span that is exactly the issue takes the whole suggestion. A span
/// snapped wider than the issue carries its extra text around the
/// suggestion. A piece of an issue split across nodes takes the matching
/// slice when suggestion and original have equal length. Anything else
/// falls back to the whole suggestion.
fn suggestion_for(span: &ResolvedSpan, original: &str) -> SmolStr {
    let issue = &span.issue;
    let expected = issue.original_text.as_str();
    if issue.suggestion.is_empty() || original == expected {
        return issue.suggestion.clone();
    }

    let covers_issue = span.flattened.start <= issue.start && span.flattened.end >= issue.end;
    if covers_issue {
        if !expected.is_empty() {
            if let Some(at) = original.find(expected) {
                let after = at + expected.len();
                return format_smolstr!("{}{}{}", &original[..at], issue.suggestion, &original[after..]);
            }
        }
        return issue.suggestion.clone();
    }

    if char_len(&issue.suggestion) == char_len(expected) {
        let start = span.flattened.start.saturating_sub(issue.start);
        let end = span.flattened.end.min(issue.end).saturating_sub(issue.start);
        if let Some(slice) = char_slice(&issue.suggestion, start..end) {
            return SmolStr::new(slice);
        }
    }
    issue.suggestion.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use crate::ids::SequentialIds;
    use crate::issue::Issue;

    fn span(node_index: usize, relative: std::ops::Range<usize>, issue: Issue) -> ResolvedSpan {
        ResolvedSpan {
            block: BlockPath::root(0),
            node_index,
            flattened: relative.clone(),
            relative,
            issue,
        }
    }

    fn render(nodes: &[InlineNode]) -> String {
        nodes
            .iter()
            .map(|node| match node {
                InlineNode::Text(run) => format!("Text({:?})", run.content),
                InlineNode::Annotation(a) => {
                    format!("Mark[{}]({:?}->{:?})", a.issue_id, a.original_text, a.suggestion)
                }
                InlineNode::Opaque(_) => "Opaque".to_owned(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_rewrite_leading_issue() {
        let run = TextRun::new("Teh quick fox.");
        let s = span(0, 0..3, Issue::new(0..3, "Teh").with_suggestion("The"));
        let nodes = rewrite_node(&run, &[&s], &AnnotationOwner::pass("1", "spelling"), &mut SequentialIds::default());

        assert_eq!(
            render(&nodes),
            r#"Mark[iss-1]("Teh"->"The") Text(" quick fox.")"#
        );
        let mark = nodes[0].as_annotation().unwrap();
        assert_eq!(mark.pass_id.as_deref(), Some("1"));
        assert_eq!(mark.kind, "spelling");
    }

    #[test]
    fn test_rewrite_keeps_first_on_overlap() {
        let run = TextRun::new("abcdefghij");
        let first = span(0, 2..6, Issue::new(2..6, "cdef").with_suggestion("CDEF"));
        let second = span(0, 4..8, Issue::new(4..8, "efgh").with_suggestion("EFGH"));
        let third = span(0, 8..10, Issue::new(8..10, "ij").with_suggestion("IJ"));

        let nodes = rewrite_node(
            &run,
            &[&first, &second, &third],
            &AnnotationOwner::grammar(),
            &mut SequentialIds::default(),
        );
        // descending start order visits "ij", "efgh", then "cdef" which overlaps
        assert_eq!(
            render(&nodes),
            r#"Text("abcd") Mark[iss-1]("efgh"->"EFGH") Mark[iss-2]("ij"->"IJ")"#
        );
    }

    #[test]
    fn test_equal_starts_keep_input_order() {
        let run = TextRun::new("abcdef");
        let a = span(0, 1..3, Issue::new(1..3, "bc").with_suggestion("A"));
        let b = span(0, 1..4, Issue::new(1..4, "bcd").with_suggestion("B"));

        let nodes = rewrite_node(&run, &[&a, &b], &AnnotationOwner::grammar(), &mut SequentialIds::default());
        assert_eq!(render(&nodes), r#"Text("a") Mark[iss-1]("bc"->"A") Text("def")"#);
    }

    #[test]
    fn test_fragments_keep_styles() {
        let mut styles = crate::document::Styles::new();
        styles.insert("bold".into(), serde_json::Value::Bool(true));
        let run = TextRun::new("one two three").with_styles(styles.clone());
        let s = span(0, 4..7, Issue::new(4..7, "two").with_suggestion("2"));

        let nodes = rewrite_node(&run, &[&s], &AnnotationOwner::grammar(), &mut SequentialIds::default());
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0].as_text().unwrap().styles, styles);
        assert_eq!(nodes[1].as_annotation().unwrap().styles, styles);
        assert_eq!(nodes[2].as_text().unwrap().styles, styles);
    }

    #[test]
    fn test_snapped_span_wraps_suggestion() {
        let issue = Issue::new(6..12, "witted").with_suggestion("witty");
        let s = ResolvedSpan {
            block: BlockPath::root(0),
            node_index: 0,
            relative: 0..12,
            flattened: 0..12,
            issue,
        };
        let run = TextRun::new("quick-witted");
        let nodes = rewrite_node(&run, &[&s], &AnnotationOwner::grammar(), &mut SequentialIds::default());
        assert_eq!(nodes[0].as_annotation().unwrap().suggestion, "quick-witty");
    }

    #[test]
    fn test_split_issue_slices_suggestion() {
        let issue = Issue::new(0..8, "recieve ").with_suggestion("receive ");
        let s = ResolvedSpan {
            block: BlockPath::root(0),
            node_index: 1,
            relative: 0..4,
            flattened: 4..8,
            issue,
        };
        assert_eq!(suggestion_for(&s, "eve "), "ive ");
    }

    #[test]
    fn test_annotate_document_splices_nodes() {
        let doc = Document::new(vec![Block::paragraph(vec![
            InlineNode::text("Hello "),
            InlineNode::text("wrold"),
        ])]);
        let spans = vec![span(1, 0..5, Issue::new(6..11, "wrold").with_suggestion("world"))];

        let annotated = annotate(&doc, &spans, &AnnotationOwner::grammar(), &mut SequentialIds::default());
        assert_eq!(annotated.inserted, vec![SmolStr::new("iss-1")]);
        assert_eq!(
            render(&annotated.document.blocks()[0].content),
            r#"Text("Hello ") Mark[iss-1]("wrold"->"world")"#
        );
        // source document is untouched
        assert_eq!(doc.blocks()[0].content.len(), 2);
    }

    #[test]
    fn test_annotate_skips_non_text_targets() {
        let doc = Document::new(vec![Block::paragraph(vec![InlineNode::Opaque(serde_json::Value::Null)])]);
        let spans = vec![span(0, 0..2, Issue::new(0..2, "ab"))];
        let annotated = annotate(&doc, &spans, &AnnotationOwner::grammar(), &mut SequentialIds::default());
        assert!(annotated.inserted.is_empty());
        assert_eq!(annotated.document, doc);
    }
}
