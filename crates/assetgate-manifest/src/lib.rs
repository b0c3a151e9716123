//! Build manifest model and stable-alias resolution for assetgate.
//!
//! This crate is the pure layer of the gateway: parsing a bundler manifest
//! (`Manifest`), the table of public stable paths (`AliasTable`) with its
//! built-in deployment presets, the three-phase lookup that maps an alias to
//! a content-hashed output file (`resolve`), and the content-hash filename
//! test used to decide cache revalidation (`is_content_hashed`).

pub mod alias;
pub mod hash;
pub mod manifest;
pub mod preset;
pub mod resolve;

pub use alias::{Alias, AliasError, AliasTable, AssetKind};
pub use hash::is_content_hashed;
pub use manifest::{
    parse_manifest_file, parse_manifest_slice, parse_manifest_str, Manifest, ManifestEntry,
    ManifestError,
};
pub use preset::{get_preset, list_presets, AliasPreset, BUILTIN_PRESETS, DEFAULT_PRESET};
pub use resolve::{resolve, resolve_kind, Phase, Resolution};
