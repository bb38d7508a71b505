//! Everything that touches the annotate executable.
//!
//! - `provision`: resolve or extract the executable, once per batch
//! - `command`: run it for one file and classify the exit code
//! - `parser`: turn its stdout into blame records

pub mod command;
pub mod parser;
pub mod provision;

pub use command::{annotate, AnnotateCommand, Annotation, SKIPPED_FILE_EXIT_CODE};
pub use provision::{AnnotateTool, BundledPayload, EmbeddedPayload, ANNOTATE_RESOURCE};
