use crate::{AssetStore, DirStore, HttpStore, StoreError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where built assets (and the manifest) are fetched from.
///
/// Exactly one of `dir` and `url` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OriginConfig {
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
}

impl OriginConfig {
    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(path.into()),
            url: None,
        }
    }

    pub fn url(url: &str) -> Self {
        Self {
            dir: None,
            url: Some(url.to_owned()),
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        match (&self.dir, &self.url) {
            (Some(_), Some(_)) => Err(StoreError::Config(
                "origin.dir and origin.url are mutually exclusive".to_owned(),
            )),
            (None, None) => Err(StoreError::Config(
                "one of origin.dir or origin.url must be set".to_owned(),
            )),
            (None, Some(url)) if !(url.starts_with("http://") || url.starts_with("https://")) => {
                Err(StoreError::Config(format!(
                    "origin.url must be an http(s) URL, got '{url}'"
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn open(&self) -> Result<Box<dyn AssetStore>, StoreError> {
        self.validate()?;
        if let Some(dir) = &self.dir {
            if !dir.is_dir() {
                return Err(StoreError::Config(format!(
                    "origin.dir is not a directory: {}",
                    dir.display()
                )));
            }
            return Ok(Box::new(DirStore::new(dir.clone())));
        }
        let url = self.url.as_deref().unwrap_or_default();
        Ok(Box::new(HttpStore::new(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_origin_required() {
        assert!(OriginConfig::default().validate().is_err());
        let both = OriginConfig {
            dir: Some(PathBuf::from("dist")),
            url: Some("https://a.example".to_owned()),
        };
        assert!(both.validate().is_err());
        assert!(OriginConfig::url("https://a.example").validate().is_ok());
        assert!(OriginConfig::url("ftp://a.example").validate().is_err());
    }

    #[test]
    fn open_dir_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = OriginConfig::dir(dir.path()).open().unwrap();
        assert_eq!(store.name(), "dir");
        assert!(OriginConfig::dir(dir.path().join("missing")).open().is_err());
    }

    #[test]
    fn open_http_store() {
        let store = OriginConfig::url("https://assets.example.com/").open().unwrap();
        assert_eq!(store.name(), "http");
    }
}
