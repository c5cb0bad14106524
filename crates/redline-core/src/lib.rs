//! redline-core: document annotation primitives.
//!
//! This crate provides:
//! - `Document` - block tree with text, annotation and opaque inline nodes
//! - `flatten` - plain-text view of a document plus its position table
//! - `map_issues` - pin analyzer issues back onto text nodes
//! - `annotate` / `rewrite_node` - split text nodes around issues
//! - `accept`, `reject`, `strip_annotations` - resolve annotations
//! - `text_differences`, `categorize`, `TextStats` - analyzer helpers
//!
//! Everything here is synchronous and free of I/O. Pass sequencing lives in
//! `redline-passes`.

pub mod diff;
pub mod document;
pub mod error;
pub mod flatten;
pub mod ids;
pub mod issue;
pub mod mapper;
pub mod resolve;
pub mod rewriter;
pub mod stats;
pub mod text_helpers;

pub use diff::{TextDifference, text_differences};
pub use document::{
    Annotation, AnnotationLocation, Block, BlockPath, Document, InlineNode, MarkerKind, Severity,
    Styles, TextRun,
};
pub use error::DocumentError;
pub use flatten::{BLOCK_SEPARATOR, FlatText, PositionEntry, SEPARATOR_LEN, flatten, flatten_block};
pub use ids::{IdSource, SequentialIds, UuidIds};
pub use issue::{Issue, LintCategory, LintReport, SuggestionPolicy, categorize};
pub use mapper::{MapperConfig, ResolvedSpan, map_issues};
pub use resolve::{ResolveAction, accept, reject, resolve_annotation, strip_annotations};
pub use rewriter::{Annotated, AnnotationOwner, annotate, rewrite_node};
pub use smol_str::SmolStr;
pub use stats::{TextStats, readability_label};
