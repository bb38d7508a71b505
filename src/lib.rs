//! TFS blame - line-level authorship for files under Team Foundation version control
//!
//! Runs the native `SonarTfsAnnotate.exe` once per file, in parallel, and
//! hands each file's blame records to a host-provided sink.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tfs_blame::{Batch, BlameCommand, CollectingOutput, InputFile, Settings, TfsConfiguration};
//!
//! let mut batch = Batch::new("/work");
//! batch.push(InputFile::new("src/Foo.cs", "/work/src/Foo.cs", 42));
//!
//! let output = Arc::new(CollectingOutput::new());
//! BlameCommand::new(TfsConfiguration::new(Settings::new())).blame(&batch, output.clone())?;
//! # Ok::<(), tfs_blame::BlameError>(())
//! ```

pub mod annotate;
pub mod blame;
pub mod config;
pub mod error;
pub mod models;

pub use blame::{BlameCommand, BlameOutput, CollectingOutput};
pub use config::{BlameOptions, PropertyDefinition, Settings, TfsConfiguration, SONAR_TFS_ANNOTATE_PROP_KEY};
pub use error::{BlameError, Result};
pub use models::{count_lines, Batch, BlameInput, BlameLine, InputFile};
