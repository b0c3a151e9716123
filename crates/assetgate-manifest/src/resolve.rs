//! Alias to build-output resolution.
//!
//! Three phases run in order and the first one to produce a path wins:
//!
//! 1. **Preferred key**: the alias's manifest keys in order. A CSS alias
//!    accepts an entry whose `file` ends in `.css` or, failing that, the first
//!    element of its `css` list. A JS alias accepts only a `.js` `file`.
//! 2. **CSS list scan** (CSS only): the first entry with a non-empty `css`
//!    list; within it, the first path mentioning `main`, else the first path.
//! 3. **Fallback scan**: every `file` with the wanted extension (and, for CSS,
//!    every `css` path) is a candidate. The first candidate is taken; a later
//!    one replaces it only if it mentions `main`, so the last `main` wins.
//!
//! "Mentions `main`" is a case-insensitive substring test.

use crate::alias::{Alias, AssetKind};
use crate::manifest::Manifest;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreferredKey,
    CssList,
    Fallback,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreferredKey => "preferred-key",
            Self::CssList => "css-list",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved output path and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Output path as written in the manifest, without a leading `/`.
    pub path: String,
    pub phase: Phase,
    /// Manifest key of the entry that supplied `path`.
    pub key: String,
}

impl Resolution {
    fn new(path: &str, phase: Phase, key: &str) -> Self {
        Self {
            path: path.to_owned(),
            phase,
            key: key.to_owned(),
        }
    }

    /// The path as a site-absolute URL path.
    pub fn location(&self) -> String {
        format!("/{}", self.path)
    }
}

pub fn resolve(manifest: &Manifest, alias: &Alias) -> Option<Resolution> {
    resolve_kind(manifest, alias.kind(), &alias.keys)
}

pub fn resolve_kind(manifest: &Manifest, kind: AssetKind, keys: &[String]) -> Option<Resolution> {
    preferred_key(manifest, kind, keys)
        .or_else(|| match kind {
            AssetKind::Css => css_list(manifest),
            AssetKind::Js => None,
        })
        .or_else(|| fallback(manifest, kind))
}

fn mentions_main(path: &str) -> bool {
    path.to_ascii_lowercase().contains("main")
}

fn preferred_key(manifest: &Manifest, kind: AssetKind, keys: &[String]) -> Option<Resolution> {
    for key in keys {
        let Some(entry) = manifest.get(key) else {
            continue;
        };
        if let Some(file) = entry.file_with_suffix(kind.extension()) {
            return Some(Resolution::new(file, Phase::PreferredKey, key));
        }
        if kind == AssetKind::Css {
            if let Some(first) = entry.css.first() {
                return Some(Resolution::new(first, Phase::PreferredKey, key));
            }
        }
    }
    None
}

fn css_list(manifest: &Manifest) -> Option<Resolution> {
    manifest.entries().find_map(|(key, entry)| {
        let first = entry.css.first()?;
        let chosen = entry
            .css
            .iter()
            .find(|p| mentions_main(p))
            .unwrap_or(first);
        Some(Resolution::new(chosen, Phase::CssList, key))
    })
}

fn fallback(manifest: &Manifest, kind: AssetKind) -> Option<Resolution> {
    let mut chosen: Option<(&str, &str)> = None;
    for (key, entry) in manifest.entries() {
        if let Some(file) = entry.file_with_suffix(kind.extension()) {
            consider(&mut chosen, file, key);
        }
        if kind == AssetKind::Css {
            for path in &entry.css {
                consider(&mut chosen, path, key);
            }
        }
    }
    chosen.map(|(path, key)| Resolution::new(path, Phase::Fallback, key))
}

fn consider<'a>(chosen: &mut Option<(&'a str, &'a str)>, path: &'a str, key: &'a str) {
    if chosen.is_none() || mentions_main(path) {
        *chosen = Some((path, key));
    }
}
