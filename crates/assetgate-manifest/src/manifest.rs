use serde_json::Value;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse manifest: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("manifest must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// One build output recorded in the manifest.
///
/// Only the fields the resolver reads are kept; bundler extras such as
/// `src`, `isEntry` or `imports` are dropped during parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file: Option<String>,
    pub css: Vec<String>,
}

impl ManifestEntry {
    pub fn new(file: Option<&str>, css: &[&str]) -> Self {
        Self {
            file: file.map(str::to_owned),
            css: css.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Extract an entry from a JSON value. Returns `None` for non-objects.
    ///
    /// A `file` that is not a string is treated as absent, and so is a `css`
    /// field that is not an array. Non-string array members are ignored.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let file = obj.get("file").and_then(Value::as_str).map(str::to_owned);
        let css = obj
            .get("css")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        Some(Self { file, css })
    }

    /// The `file` field, if it ends with `suffix`.
    pub fn file_with_suffix(&self, suffix: &str) -> Option<&str> {
        self.file.as_deref().filter(|f| f.ends_with(suffix))
    }
}

/// A parsed build manifest.
///
/// Entries keep the insertion order of the source JSON object; the scanning
/// phases of resolution depend on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<(String, ManifestEntry)>,
    skipped: Vec<String>,
}

impl Manifest {
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ManifestEntry)>,
        K: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(|(k, e)| (k.into(), e)).collect(),
            skipped: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ManifestEntry> {
        self.entries
            .iter()
            .find_map(|(k, entry)| (k == key).then_some(entry))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ManifestEntry)> {
        self.entries.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys whose values were not JSON objects and were left out.
    pub fn skipped_keys(&self) -> &[String] {
        &self.skipped
    }

    fn from_json(value: Value) -> Result<Self, ManifestError> {
        let Value::Object(map) = value else {
            return Err(ManifestError::NotAnObject(json_type_name(&value)));
        };
        let mut manifest = Self::default();
        for (key, value) in map {
            match ManifestEntry::from_value(&value) {
                Some(entry) => manifest.entries.push((key, entry)),
                None => manifest.skipped.push(key),
            }
        }
        Ok(manifest)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn parse_manifest_str(input: &str) -> Result<Manifest, ManifestError> {
    Manifest::from_json(serde_json::from_str(input)?)
}

pub fn parse_manifest_slice(input: &[u8]) -> Result<Manifest, ManifestError> {
    Manifest::from_json(serde_json::from_slice(input)?)
}

pub fn parse_manifest_file(path: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let content = fs::read(path)?;
    parse_manifest_slice(&content)
}
