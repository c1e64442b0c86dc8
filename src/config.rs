use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::escape::Escaper;
use crate::registry::{AnnotationRegistry, Markup, RenderRule};

const HTML_PRESET: &str = include_str!("html.toml");
const TYPST_PRESET: &str = include_str!("typst.toml");

/// Names accepted by [`Config::preset`].
pub const PRESETS: &[&str] = &["html", "typst"];

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Config {
    /// Single character → replacement markup.
    pub escapes: BTreeMap<String, String>,
    /// Annotation kind → open/close markup.
    pub annotations: BTreeMap<String, RuleConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RuleConfig {
    pub open: MarkupConfig,
    pub close: MarkupConfig,
}

/// Either a plain string or `{ template = "..." }`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum MarkupConfig {
    Literal(String),
    Template { template: String },
}

impl Default for MarkupConfig {
    fn default() -> Self {
        MarkupConfig::Literal(String::new())
    }
}

impl From<&MarkupConfig> for Markup {
    fn from(config: &MarkupConfig) -> Self {
        match config {
            MarkupConfig::Literal(markup) => Markup::literal(markup.as_str()),
            MarkupConfig::Template { template } => Markup::template(template.as_str()),
        }
    }
}

impl Config {
    /// The bundled HTML preset.
    pub fn compiled_default() -> Self {
        // Both presets are checked by build.rs
        toml::from_str(HTML_PRESET).expect("bundled html preset must parse")
    }

    /// One of the bundled presets, see [`PRESETS`].
    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        let source = match name {
            "html" => HTML_PRESET,
            "typst" => TYPST_PRESET,
            _ => return Err(ConfigError::UnknownPreset(name.to_string())),
        };
        Self::from_toml(source)
    }

    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Entries from `other` replace entries with the same key in `self`.
    pub fn overlay(mut self, other: Config) -> Self {
        self.escapes.extend(other.escapes);
        self.annotations.extend(other.annotations);
        self
    }

    pub fn escaper(&self) -> Result<Escaper, ConfigError> {
        let mut escaper = Escaper::new();
        for (key, replacement) in &self.escapes {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => escaper.insert(ch, replacement.as_str()),
                _ => return Err(ConfigError::EscapeKey(key.clone())),
            }
        }
        Ok(escaper)
    }

    pub fn registry(&self) -> AnnotationRegistry {
        let mut registry = AnnotationRegistry::new();
        for (kind, rule) in &self.annotations {
            registry.register(
                kind.as_str(),
                RenderRule::new(Markup::from(&rule.open), Markup::from(&rule.close)),
            );
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn presets_parse() {
        for name in PRESETS {
            let config = Config::preset(name).expect("preset");
            assert!(!config.annotations.is_empty(), "{name} has no annotations");
            config.escaper().expect("escapes");
        }
    }

    #[test]
    fn unknown_preset() {
        assert!(matches!(
            Config::preset("rtf"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn html_default_escapes_whitespace_visibly() {
        let escaper = Config::compiled_default().escaper().expect("escapes");
        assert_eq!(escaper.escape('<'), Some("&lt;"));
        assert_eq!(escaper.escape('\n'), Some("<span class=\"ws-newline\">¶</span><br>"));
        assert_eq!(escaper.escape('\t'), Some("<span class=\"ws-tab\">→</span>\t"));
        assert_eq!(escaper.escape('a'), None);
    }

    #[test]
    fn literal_and_template_rules() {
        let config = Config::from_toml(
            r#"
            [annotations.bold]
            open = "<b>"
            close = "</b>"

            [annotations.link]
            open = { template = "<a href=\"{href}\">" }
            close = "</a>"
            "#,
        )
        .expect("config");

        assert_eq!(
            config.annotations["link"].open,
            MarkupConfig::Template {
                template: "<a href=\"{href}\">".to_string()
            }
        );

        let registry = config.registry();
        let link = registry.get("link").expect("link rule");
        assert_eq!(link.open.resolve(&json!({ "href": "/x" })), "<a href=\"/x\">");
        let bold = registry.get("bold").expect("bold rule");
        assert_eq!(bold.close.resolve(&json!(null)), "</b>");
    }

    #[test]
    fn missing_sides_default_to_empty() {
        let config = Config::from_toml("[annotations.mark]\nopen = \"<mark>\"\n").expect("config");
        let registry = config.registry();
        let mark = registry.get("mark").expect("mark rule");
        assert_eq!(mark.close.resolve(&json!(null)), "");
    }

    #[test]
    fn rejects_multi_char_escape_key() {
        let config = Config::from_toml("[escapes]\n\"ab\" = \"x\"\n").expect("config");
        assert!(matches!(config.escaper(), Err(ConfigError::EscapeKey(key)) if key == "ab"));
    }

    #[test]
    fn rejects_bad_toml() {
        assert!(matches!(
            Config::from_toml("[escapes"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn overlay_replaces_entries() {
        let base = Config::compiled_default();
        let custom = Config::from_toml(
            "[escapes]\n\"\\n\" = \"<br>\"\n[annotations.bold]\nopen = \"<b>\"\nclose = \"</b>\"\n",
        )
        .expect("config");
        let merged = base.overlay(custom);

        let escaper = merged.escaper().expect("escapes");
        assert_eq!(escaper.escape('\n'), Some("<br>"));
        assert_eq!(escaper.escape('<'), Some("&lt;"));
        let registry = merged.registry();
        let bold = registry.get("bold").expect("bold rule");
        assert_eq!(bold.open.resolve(&json!(null)), "<b>");
        assert!(registry.contains("italic"));
    }

    #[test]
    fn load_missing_file() {
        let err = Config::load(Path::new("/nonexistent/annomark.toml"));
        assert!(matches!(err, Err(ConfigError::Io { .. })));
    }
}
