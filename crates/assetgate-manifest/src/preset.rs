use crate::alias::{Alias, AliasError, AliasTable};

/// A named, built-in alias table for one deployment layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPreset {
    pub name: &'static str,
    pub description: &'static str,
    pub aliases: &'static [(&'static str, &'static [&'static str])],
}

impl AliasPreset {
    pub fn table(&self) -> Result<AliasTable, AliasError> {
        AliasTable::from_aliases(
            self.aliases
                .iter()
                .map(|(path, keys)| Alias::new(path, keys)),
        )
    }
}

pub const DEFAULT_PRESET: &str = "webflow";

pub const BUILTIN_PRESETS: &[AliasPreset] = &[
    AliasPreset {
        name: "webflow",
        description: "Site scripts bundle with slider and parallax add-ons",
        aliases: &[
            (
                "/main.js",
                &["src/js/main.js", "src/scripts/main.js", "js/main.js"],
            ),
            ("/main.css", &["src/styles/main.css", "src/css/main.css"]),
            (
                "/draggable-slider.js",
                &[
                    "js/draggable-infinite-slider-standalone.js",
                    "src/js/draggable-infinite-slider-standalone.js",
                ],
            ),
            (
                "/parallax-image.js",
                &["src/js/parallax-image.js", "js/parallax-image.js"],
            ),
            (
                "/parallax-image.css",
                &["src/styles/parallax-image.css", "styles/parallax-image.css"],
            ),
        ],
    },
    AliasPreset {
        name: "app",
        description: "Single application bundle with one stylesheet",
        aliases: &[
            ("/app.js", &["src/js/app.js", "src/app.js", "src/main.js"]),
            (
                "/styles.css",
                &["src/styles/main.css", "src/css/main.css", "src/styles.css"],
            ),
        ],
    },
    AliasPreset {
        name: "nested",
        description: "Main bundle published under /js and /css",
        aliases: &[
            ("/js/main.js", &["src/js/main.js", "js/main.js"]),
            ("/css/main.css", &["src/styles/main.css", "src/css/main.css"]),
        ],
    },
];

pub fn get_preset(name: &str) -> Option<&'static AliasPreset> {
    BUILTIN_PRESETS.iter().find(|p| p.name == name)
}

pub fn list_presets() -> &'static [AliasPreset] {
    BUILTIN_PRESETS
}

impl AliasTable {
    pub fn from_preset(name: &str) -> Result<Self, AliasError> {
        get_preset(name)
            .ok_or_else(|| AliasError::UnknownPreset(name.to_owned()))?
            .table()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AssetKind;

    #[test]
    fn all_presets_build_complete_tables() {
        for preset in BUILTIN_PRESETS {
            let table = preset.table().unwrap();
            assert_eq!(
                table.len(),
                preset.aliases.len(),
                "preset '{}' lost aliases during validation",
                preset.name
            );
        }
    }

    #[test]
    fn get_preset_by_name() {
        assert!(get_preset(DEFAULT_PRESET).is_some());
        assert!(get_preset("nonexistent").is_none());
        assert!(matches!(
            AliasTable::from_preset("nonexistent"),
            Err(AliasError::UnknownPreset(_))
        ));
    }

    #[test]
    fn all_presets_have_unique_names() {
        let mut names: Vec<&str> = BUILTIN_PRESETS.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), BUILTIN_PRESETS.len());
    }

    #[test]
    fn webflow_preset_keys_are_ordered() {
        let table = AliasTable::from_preset("webflow").unwrap();
        let css = table.classify("/main.css").unwrap();
        assert_eq!(css.kind(), AssetKind::Css);
        assert_eq!(css.keys, vec!["src/styles/main.css", "src/css/main.css"]);
        let js = table.classify("/main.js").unwrap();
        assert_eq!(js.keys[0], "src/js/main.js");
        assert!(table.classify("/app.js").is_none());
    }
}
