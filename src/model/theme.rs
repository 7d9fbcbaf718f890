use serde::Serialize;

/// A selectable color theme. Only the key is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Theme {
    pub key: &'static str,
    pub name: &'static str,
    /// Accent color used for progress bars
    pub accent: &'static str,
}

pub const DEFAULT_THEME: &str = "dark";

pub const THEMES: &[Theme] = &[
    Theme { key: "dark", name: "Dark", accent: "#00d4ff" },
    Theme { key: "cyber", name: "Cyberpunk", accent: "#ff0080" },
    Theme { key: "ocean", name: "Ocean", accent: "#00bcd4" },
    Theme { key: "forest", name: "Forest", accent: "#4caf50" },
    Theme { key: "sunset", name: "Sunset", accent: "#ff7043" },
    Theme { key: "purple", name: "Purple", accent: "#ab47bc" },
    Theme { key: "matrix", name: "Matrix", accent: "#00ff41" },
    Theme { key: "gold", name: "Gold", accent: "#ffd700" },
    Theme { key: "ice", name: "Ice", accent: "#81d4fa" },
    Theme { key: "volcano", name: "Volcano", accent: "#f44336" },
];

/// Look up a theme by key
pub fn find_theme(key: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.key == key)
}

/// Resolve a stored theme key, falling back to the default for unknown values
pub fn resolve_theme(key: &str) -> &'static Theme {
    find_theme(key).unwrap_or(&THEMES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_theme_is_first() {
        assert_eq!(THEMES[0].key, DEFAULT_THEME);
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        assert_eq!(resolve_theme("neon").key, "dark");
        assert_eq!(resolve_theme("ocean").name, "Ocean");
    }

    #[test]
    fn test_theme_keys_are_unique() {
        for (i, a) in THEMES.iter().enumerate() {
            for b in &THEMES[i + 1..] {
                assert_ne!(a.key, b.key);
            }
        }
    }
}
