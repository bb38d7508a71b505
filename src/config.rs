//! Configuration read from the host's settings store.
//!
//! Only one property is defined: the path of a caller-supplied annotate
//! executable. When it is absent or blank the bundled copy is extracted.
//! Engine tuning (pool size, timeout, temp root) lives in `BlameOptions`
//! and is set programmatically.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

pub const SONAR_TFS_ANNOTATE_PROP_KEY: &str = "sonar.tfs.sonarTfsAnnotatePath";
const CATEGORY_SCM: &str = "SCM";
const CATEGORY_TFS: &str = "TFS";

/// String key/value settings as provided by the host.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parses a `key=value` pair, as given on the command line with `-D`.
    pub fn parse_pair(pair: &str) -> Result<(String, String), String> {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("empty key in '{}'", pair));
        }
        Ok((key.to_string(), value.to_string()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Settings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    String,
}

/// Declaration of a setting, as registered with the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub property_type: PropertyType,
    /// Resource qualifiers the property can be set on
    pub qualifiers: Vec<&'static str>,
    pub category: &'static str,
    pub sub_category: &'static str,
    pub index: u32,
}

#[derive(Debug, Clone)]
pub struct TfsConfiguration {
    settings: Settings,
}

impl TfsConfiguration {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn properties() -> Vec<PropertyDefinition> {
        vec![PropertyDefinition {
            key: SONAR_TFS_ANNOTATE_PROP_KEY,
            name: "SonarTfsAnnotate executable full path",
            description: "Use built-in SonarTfsAnnotate.exe by default",
            property_type: PropertyType::String,
            qualifiers: vec!["TRK"],
            category: CATEGORY_SCM,
            sub_category: CATEGORY_TFS,
            index: 0,
        }]
    }

    /// Override path for the annotate executable; `None` when unset or blank.
    pub fn sonar_tfs_annotate_path(&self) -> Option<&str> {
        self.settings
            .get_string(SONAR_TFS_ANNOTATE_PROP_KEY)
            .filter(|path| !path.trim().is_empty())
    }
}

/// Tuning knobs of the blame engine.
#[derive(Debug, Clone, Default)]
pub struct BlameOptions {
    /// Maximum number of annotate processes in flight; defaults to CPUs + 1
    pub pool_size: Option<usize>,
    /// Per-file deadline; unlimited when `None`
    pub timeout: Option<Duration>,
    /// Where the per-batch temporary directory is created; system temp when `None`
    pub temp_root: Option<PathBuf>,
}

impl BlameOptions {
    pub fn effective_pool_size(&self) -> usize {
        self.pool_size
            .filter(|&size| size > 0)
            .unwrap_or_else(|| num_cpus::get() + 1)
    }
}
