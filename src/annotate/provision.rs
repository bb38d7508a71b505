//! Locates the annotate executable for a batch.
//!
//! A configured override path is used verbatim. Otherwise the bundled
//! `SonarTfsAnnotate.exe` is copied out of the binary into the batch's
//! temporary directory, which removes it again when dropped.

use std::borrow::Cow;
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_embed::Embed;
use tempfile::TempDir;

use crate::config::TfsConfiguration;
use crate::error::{BlameError, Result};

pub const ANNOTATE_RESOURCE: &str = "SonarTfsAnnotate.exe";
const ANNOTATE_STEM: &str = "SonarTfsAnnotate";
const ANNOTATE_SUFFIX: &str = ".exe";

/// Files packaged into the distribution
#[derive(Embed)]
#[folder = "resources/"]
struct Resources;

/// Source of the bundled annotate executable.
pub trait BundledPayload: Send + Sync {
    fn load(&self, name: &str) -> Option<Cow<'static, [u8]>>;
}

/// Payload embedded at build time from `resources/`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedPayload;

impl BundledPayload for EmbeddedPayload {
    fn load(&self, name: &str) -> Option<Cow<'static, [u8]>> {
        Resources::get(name).map(|file| file.data)
    }
}

/// Resolved annotate executable, valid for one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotateTool {
    /// Caller-supplied path from configuration
    Configured(PathBuf),
    /// Copy extracted into the batch's temporary directory
    Extracted(PathBuf),
}

impl AnnotateTool {
    pub fn path(&self) -> &Path {
        match self {
            AnnotateTool::Configured(path) | AnnotateTool::Extracted(path) => path,
        }
    }
}

pub fn resolve(
    config: &TfsConfiguration,
    payload: &dyn BundledPayload,
    scope: &TempDir,
) -> Result<AnnotateTool> {
    if let Some(path) = config.sonar_tfs_annotate_path() {
        tracing::debug!("Using configured annotate executable: {}", path);
        return Ok(AnnotateTool::Configured(PathBuf::from(path)));
    }

    let path = extract(payload, scope.path()).map_err(|source| BlameError::Provision {
        resource: ANNOTATE_RESOURCE.to_string(),
        source,
    })?;
    tracing::debug!("Extracted {} to {}", ANNOTATE_RESOURCE, path.display());
    Ok(AnnotateTool::Extracted(path))
}

fn extract(payload: &dyn BundledPayload, dir: &Path) -> std::io::Result<PathBuf> {
    let bytes = payload.load(ANNOTATE_RESOURCE).ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not bundled in this build", ANNOTATE_RESOURCE),
        )
    })?;

    let mut file = tempfile::Builder::new()
        .prefix(ANNOTATE_STEM)
        .suffix(ANNOTATE_SUFFIX)
        .tempfile_in(dir)?;
    file.write_all(&bytes)?;
    file.flush()?;
    make_executable(file.path())?;

    // The directory owns the file from here on; it goes away with the scope.
    let (handle, path) = file.keep().map_err(|e| e.error)?;
    drop(handle);
    Ok(path)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
