use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AliasError {
    #[error("alias path must start with '/': '{0}'")]
    RelativePath(String),
    #[error("alias path must not contain a query string: '{0}'")]
    QueryInPath(String),
    #[error("alias '{0}' has no manifest keys")]
    NoKeys(String),
    #[error("alias '{path}' has an empty manifest key")]
    EmptyKey { path: String },
    #[error("unknown alias preset: '{0}'")]
    UnknownPreset(String),
}

/// What kind of build output an alias asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Js,
    Css,
}

impl AssetKind {
    /// Paths ending in `.css` are stylesheet requests; everything else is script.
    pub fn from_path(path: &str) -> Self {
        if path.ends_with(".css") {
            Self::Css
        } else {
            Self::Js
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Js => ".js",
            Self::Css => ".css",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Js => f.write_str("js"),
            Self::Css => f.write_str("css"),
        }
    }
}

/// A stable public path and the manifest keys it may resolve through,
/// most preferred first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub path: String,
    pub keys: Vec<String>,
}

impl Alias {
    pub fn new(path: &str, keys: &[&str]) -> Self {
        Self {
            path: path.to_owned(),
            keys: keys.iter().map(|k| (*k).to_owned()).collect(),
        }
    }

    pub fn kind(&self) -> AssetKind {
        AssetKind::from_path(&self.path)
    }

    pub fn validate(&self) -> Result<(), AliasError> {
        if !self.path.starts_with('/') {
            return Err(AliasError::RelativePath(self.path.clone()));
        }
        if self.path.contains('?') {
            return Err(AliasError::QueryInPath(self.path.clone()));
        }
        if self.keys.is_empty() {
            return Err(AliasError::NoKeys(self.path.clone()));
        }
        if self.keys.iter().any(String::is_empty) {
            return Err(AliasError::EmptyKey {
                path: self.path.clone(),
            });
        }
        Ok(())
    }
}

/// The set of stable paths a deployment answers from the manifest.
///
/// Paths are unique: inserting an alias for a path that is already present
/// replaces its keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: Vec<Alias>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `aliases`, failing on the first invalid one.
    pub fn from_aliases<I: IntoIterator<Item = Alias>>(aliases: I) -> Result<Self, AliasError> {
        let mut table = Self::new();
        for alias in aliases {
            table.insert(alias)?;
        }
        Ok(table)
    }

    pub fn insert(&mut self, alias: Alias) -> Result<(), AliasError> {
        alias.validate()?;
        if let Some(existing) = self.aliases.iter_mut().find(|a| a.path == alias.path) {
            existing.keys = alias.keys;
        } else {
            self.aliases.push(alias);
        }
        Ok(())
    }

    /// Exact, case-sensitive match on the request path (query excluded).
    pub fn classify(&self, path: &str) -> Option<&Alias> {
        self.aliases.iter().find(|a| a.path == path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Alias> {
        self.aliases.iter()
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
