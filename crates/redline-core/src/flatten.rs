//! Flatten a block tree into one plain-text string plus a position table.
//!
//! The position table is the inverse mapping: each entry records where one
//! text node's content landed in the flattened string. Annotations contribute
//! their original text but get no entry, so later passes see the
//! pre-annotation wording and never annotate it again.

use std::ops::Range;

use crate::document::{Block, BlockPath, Document, InlineNode};
use crate::text_helpers::{char_len, char_slice};

/// Inserted between the text of two contributing blocks.
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Length of [`BLOCK_SEPARATOR`] in chars.
pub const SEPARATOR_LEN: usize = 2;

/// Where one text node's content sits in the flattened string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionEntry {
    pub block: BlockPath,
    pub node_index: usize,
    /// Char range in the flattened string.
    pub flattened: Range<usize>,
    /// Char range inside the node. Always starts at zero.
    pub local: Range<usize>,
}

impl PositionEntry {
    pub fn len(&self) -> usize {
        self.flattened.end - self.flattened.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this entry overlaps the half-open char range.
    pub fn overlaps(&self, range: &Range<usize>) -> bool {
        self.flattened.start < range.end && range.start < self.flattened.end
    }
}

/// Flattened text and its position table.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlatText {
    pub text: String,
    pub table: Vec<PositionEntry>,
}

impl FlatText {
    pub fn len_chars(&self) -> usize {
        char_len(&self.text)
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Slice the flattened string by a char range.
    pub fn slice(&self, range: Range<usize>) -> Option<&str> {
        char_slice(&self.text, range)
    }

    /// Text of a table entry, read back from the flattened string.
    pub fn entry_text(&self, entry: &PositionEntry) -> Option<&str> {
        self.slice(entry.flattened.clone())
    }

    /// Table entries that overlap `range`, in flattened order.
    pub fn entries_overlapping(&self, range: Range<usize>) -> impl Iterator<Item = &PositionEntry> {
        self.table.iter().filter(move |entry| entry.overlaps(&range))
    }
}

/// Flatten a whole document.
pub fn flatten(document: &Document) -> FlatText {
    let mut flattener = Flattener::default();
    for (index, block) in document.blocks().iter().enumerate() {
        flattener.visit(block, BlockPath::root(index));
    }
    flattener.finish()
}

/// Flatten a single top-level block subtree.
///
/// Paths in the table are absolute, and offsets start at zero for this
/// block. Returns None when the index is out of range.
pub fn flatten_block(document: &Document, index: usize) -> Option<FlatText> {
    let block = document.blocks().get(index)?;
    let mut flattener = Flattener::default();
    flattener.visit(block, BlockPath::root(index));
    Some(flattener.finish())
}

#[derive(Default)]
struct Flattener {
    text: String,
    table: Vec<PositionEntry>,
    offset: usize,
    contributed: bool,
}

impl Flattener {
    fn visit(&mut self, block: &Block, path: BlockPath) {
        let mut block_started = false;

        for (node_index, node) in block.content.iter().enumerate() {
            let Some(content) = node.flattened_text() else {
                continue;
            };
            if content.is_empty() {
                continue;
            }

            if !block_started {
                if self.contributed {
                    self.text.push_str(BLOCK_SEPARATOR);
                    self.offset += SEPARATOR_LEN;
                }
                block_started = true;
                self.contributed = true;
            }

            let len = char_len(content);
            self.text.push_str(content);
            if let InlineNode::Text(_) = node {
                self.table.push(PositionEntry {
                    block: path.clone(),
                    node_index,
                    flattened: self.offset..self.offset + len,
                    local: 0..len,
                });
            }
            self.offset += len;
        }

        for (index, child) in block.children.iter().enumerate() {
            self.visit(child, path.child(index));
        }
    }

    fn finish(self) -> FlatText {
        tracing::trace!(
            target: "redline::flatten",
            chars = self.offset,
            entries = self.table.len(),
            "flattened document"
        );
        FlatText {
            text: self.text,
            table: self.table,
        }
    }
}
