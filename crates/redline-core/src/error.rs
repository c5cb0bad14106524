//! Error types for document decoding.

use miette::Diagnostic;
use thiserror::Error;

/// Errors that can occur while decoding a document from its JSON form.
///
/// Individual malformed nodes are never an error: they decode to
/// [`InlineNode::Opaque`](crate::InlineNode::Opaque). Only a document whose
/// overall shape is unusable is rejected.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum DocumentError {
    /// The input was not valid JSON.
    #[error("failed to decode document JSON")]
    #[diagnostic(code(redline::document::json))]
    Json(#[from] serde_json::Error),

    /// The JSON root was not an array of blocks.
    #[error("document root must be an array of blocks, found {found}")]
    #[diagnostic(
        code(redline::document::root),
        help("pass the editor's block list, not a single block or a wrapper object")
    )]
    InvalidRoot {
        /// JSON kind that was found instead.
        found: &'static str,
    },
}
