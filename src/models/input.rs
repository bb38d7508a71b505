//! Input side of the host contract.
//!
//! The host hands over a batch through `BlameInput`; each file is described
//! by an immutable `InputFile`.

use std::path::{Path, PathBuf};

/// A file to blame, as known to the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InputFile {
    relative_path: String,
    absolute_path: PathBuf,
    lines: usize,
}

impl InputFile {
    pub fn new(relative_path: impl Into<String>, absolute_path: impl Into<PathBuf>, lines: usize) -> Self {
        Self {
            relative_path: relative_path.into(),
            absolute_path: absolute_path.into(),
            lines,
        }
    }

    /// Path relative to the scan base directory, used in diagnostics.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// Absolute path, passed to the annotate tool.
    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    /// Number of lines the host counted for this file.
    pub fn lines(&self) -> usize {
        self.lines
    }
}

/// The batch a host asks to blame.
pub trait BlameInput: Sync {
    /// Absolute base directory of the scan. Only logged.
    fn base_dir(&self) -> &Path;

    fn files_to_blame(&self) -> Vec<InputFile>;
}

/// Plain in-memory batch.
#[derive(Debug, Clone)]
pub struct Batch {
    pub base_dir: PathBuf,
    pub files: Vec<InputFile>,
}

impl Batch {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            files: Vec::new(),
        }
    }

    /// Adds a file unless one with the same absolute path is already queued.
    pub fn push(&mut self, file: InputFile) -> bool {
        if self.files.iter().any(|f| f.absolute_path == file.absolute_path) {
            return false;
        }
        self.files.push(file);
        true
    }
}

impl BlameInput for Batch {
    fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn files_to_blame(&self) -> Vec<InputFile> {
        self.files.clone()
    }
}

/// Line count the way the host counts it: every `\n` starts a new line,
/// so content ending with a newline has a trailing empty line.
pub fn count_lines(content: &[u8]) -> usize {
    content.iter().filter(|&&b| b == b'\n').count() + 1
}
