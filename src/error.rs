//! Blame error types.
//!
//! Defines `BlameError` for every way a batch can fail. Per-file variants
//! carry enough context to reproduce the failure by hand:
//! - the relative path of the offending file
//! - the exact command line that was executed
//! - whatever the annotate tool wrote to stderr
//!
//! Error kinds:
//! - `Provision` → annotate executable could not be located or extracted
//! - `ToolInvocation` → launch failure, stream failure, or unexpected exit code
//! - `Parse` → malformed stdout line or line count mismatch
//! - `Interrupted` → the caller gave up while tasks were being joined
//! - `WorkerPool` → the runtime backing the worker pool could not start
//! - `NestedRuntime` → the blocking entry point was called from async code

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlameError {
    #[error("Unable to extract {resource}: {source}")]
    Provision {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("The TFS blame command [{command}] failed for {path}: {reason}: {stderr}")]
    ToolInvocation {
        path: String,
        command: String,
        reason: String,
        stderr: String,
    },

    #[error("Unable to parse output of TFS blame command [{command}] for {path}: {reason}: {stderr}")]
    Parse {
        path: String,
        command: String,
        reason: String,
        stderr: String,
    },

    #[error("Interrupted while waiting for TFS blame tasks ({pending} still running)")]
    Interrupted { pending: usize },

    #[error("Unable to start blame workers: {0}")]
    WorkerPool(#[source] std::io::Error),

    #[error("Blocking blame called from inside an async runtime; use blame_async")]
    NestedRuntime,
}

impl BlameError {
    /// Relative path of the file the error belongs to, if it is a per-file error.
    pub fn path(&self) -> Option<&str> {
        match self {
            BlameError::ToolInvocation { path, .. } | BlameError::Parse { path, .. } => Some(path),
            BlameError::Provision { .. }
            | BlameError::Interrupted { .. }
            | BlameError::WorkerPool(_)
            | BlameError::NestedRuntime => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BlameError>;
