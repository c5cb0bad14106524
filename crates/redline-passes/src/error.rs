//! Error types for pass coordination.

use std::path::PathBuf;

use miette::{Diagnostic, NamedSource, SourceSpan};
use smol_str::SmolStr;
use thiserror::Error;

/// Errors reported by an analyzer.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum AnalysisError {
    /// The analyzer ran and failed.
    #[error("analysis failed: {0}")]
    #[diagnostic(code(redline::analysis::failed))]
    Failed(SmolStr),

    /// The analyzer is not ready (still loading, or failed to load).
    #[error("analyzer unavailable")]
    #[diagnostic(
        code(redline::analysis::unavailable),
        help("wait for the analyzer to finish initializing, then retry the pass")
    )]
    Unavailable,
}

/// Commands the coordinator refused.
#[derive(Error, Debug, Clone, PartialEq, Eq, Diagnostic)]
#[non_exhaustive]
pub enum CoordinatorError {
    /// Another pass is already running.
    #[error("pass {running} is still running")]
    #[diagnostic(
        code(redline::coordinator::pass_running),
        help("resolve the running pass's annotations before starting another")
    )]
    PassRunning { running: SmolStr },

    #[error("no pass with id {0}")]
    #[diagnostic(code(redline::coordinator::unknown_pass))]
    UnknownPass(SmolStr),

    #[error("pass {0} is disabled")]
    #[diagnostic(code(redline::coordinator::pass_disabled))]
    PassDisabled(SmolStr),

    /// A failed pass goes back to pending through a retry before it runs.
    #[error("pass {0} failed; retry it before running it again")]
    #[diagnostic(
        code(redline::coordinator::pass_failed),
        help("send a retry for the pass, then start it")
    )]
    PassFailed(SmolStr),

    /// No annotation in the current document has this id.
    #[error("no annotation with id {0}")]
    #[diagnostic(code(redline::coordinator::unknown_annotation))]
    UnknownAnnotation(SmolStr),

    /// The resolution named a different pass than the one that inserted the
    /// annotation.
    #[error("annotation {issue_id} belongs to pass {owner}, not {pass_id}")]
    #[diagnostic(code(redline::coordinator::wrong_pass))]
    WrongPass {
        issue_id: SmolStr,
        pass_id: SmolStr,
        owner: SmolStr,
    },

    /// Only failed passes can be retried.
    #[error("pass {0} has not failed and cannot be retried")]
    #[diagnostic(code(redline::coordinator::not_retryable))]
    NotRetryable(SmolStr),

    /// Only custom passes can be removed.
    #[error("pass {0} is built in and cannot be removed")]
    #[diagnostic(code(redline::coordinator::not_custom))]
    NotCustom(SmolStr),

    #[error("custom pass name is empty")]
    #[diagnostic(code(redline::coordinator::empty_name))]
    EmptyName,

    /// The coordinator task is gone.
    #[error("coordinator channel closed")]
    #[diagnostic(code(redline::coordinator::closed))]
    ChannelClosed,
}

/// Errors loading an [`EngineConfig`](crate::EngineConfig).
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    #[diagnostic(code(redline::config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {message}")]
    #[diagnostic(code(redline::config::parse))]
    Parse {
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: Option<SourceSpan>,
    },

    #[error("invalid config: {0}")]
    #[diagnostic(code(redline::config::invalid))]
    Invalid(String),
}
