//! Accepting, rejecting and stripping annotations.
//!
//! Every operation turns annotation nodes back into plain text and merges
//! the text runs this leaves side by side, so a fully resolved document
//! reads like one that was never annotated.

use serde::{Deserialize, Serialize};

use crate::document::{Block, Document, InlineNode, TextRun, for_each_block_mut};

/// What the human did with an annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolveAction {
    /// The suggestion replaced the original text.
    Applied,
    /// The original text was kept.
    Rejected,
}

impl ResolveAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Rejected => "rejected",
        }
    }
}

/// Replace the annotation `issue_id` with plain text.
///
/// Returns None when no annotation has that id.
pub fn resolve_annotation(document: &Document, issue_id: &str, action: ResolveAction) -> Option<Document> {
    let location = document.find_annotation(issue_id)?;
    let annotation = location.annotation;
    let replacement = match action {
        ResolveAction::Applied => annotation.replacement_text().to_owned(),
        ResolveAction::Rejected => annotation.original_text.to_string(),
    };
    let styles = annotation.styles.clone();
    let path = location.block.clone();
    let node_index = location.node_index;

    let mut blocks = document.blocks().to_vec();
    let block = crate::document::block_at_mut(&mut blocks, &path)?;
    if replacement.is_empty() {
        block.content.remove(node_index);
    } else {
        block.content[node_index] = InlineNode::Text(TextRun::new(replacement).with_styles(styles));
    }
    merge_adjacent_text(block);

    tracing::debug!(
        target: "redline::resolve",
        issue_id,
        action = action.as_str(),
        block = %path,
        "resolved annotation"
    );
    Some(Document::new(blocks))
}

/// Apply the annotation's suggestion.
pub fn accept(document: &Document, issue_id: &str) -> Option<Document> {
    resolve_annotation(document, issue_id, ResolveAction::Applied)
}

/// Restore the annotation's original text.
pub fn reject(document: &Document, issue_id: &str) -> Option<Document> {
    resolve_annotation(document, issue_id, ResolveAction::Rejected)
}

/// Revert annotations to their original text.
///
/// With `pass_id` set, only that pass's annotations are reverted. Returns
/// the new document and how many annotations were removed.
pub fn strip_annotations(document: &Document, pass_id: Option<&str>) -> (Document, usize) {
    let mut blocks = document.blocks().to_vec();
    let mut stripped = 0;

    for_each_block_mut(&mut blocks, &mut |block: &mut Block| {
        let mut touched = false;
        for node in &mut block.content {
            let InlineNode::Annotation(annotation) = node else {
                continue;
            };
            if pass_id.is_some_and(|id| !annotation.belongs_to(id)) {
                continue;
            }
            let run = TextRun::new(annotation.original_text.as_str()).with_styles(annotation.styles.clone());
            *node = InlineNode::Text(run);
            touched = true;
            stripped += 1;
        }
        if touched {
            merge_adjacent_text(block);
        }
    });

    (Document::new(blocks), stripped)
}

/// Merge neighbouring text runs that share styles, and drop empty runs.
fn merge_adjacent_text(block: &mut Block) {
    let mut merged: Vec<InlineNode> = Vec::with_capacity(block.content.len());
    for node in block.content.drain(..) {
        match node {
            InlineNode::Text(run) if run.is_empty() => {}
            InlineNode::Text(run) => match merged.last_mut() {
                Some(InlineNode::Text(prev)) if prev.styles == run.styles => {
                    prev.content.push_str(&run.content);
                }
                _ => merged.push(InlineNode::Text(run)),
            },
            other => merged.push(other),
        }
    }
    block.content = merged;
}
