use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::Key;

/// Keys shared by every panel.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct UniversalKeys {
    pub quit: String,
    #[serde(rename = "return")]
    pub return_: String,
    pub prev_item: String,
    pub next_item: String,
    pub prev_item_alt: String,
    pub next_item_alt: String,
    pub goto_top: String,
    pub goto_bottom: String,
    pub prev_block: String,
    pub next_block: String,
    pub new: String,
    pub select: String,
    pub confirm: String,
    pub open_file: String,
    pub remove: String,
    pub refresh: String,
}

impl Default for UniversalKeys {
    fn default() -> Self {
        Self {
            quit: "q".into(),
            return_: "<esc>".into(),
            prev_item: "<up>".into(),
            next_item: "<down>".into(),
            prev_item_alt: "k".into(),
            next_item_alt: "j".into(),
            goto_top: "<".into(),
            goto_bottom: ">".into(),
            prev_block: "<left>".into(),
            next_block: "<right>".into(),
            new: "n".into(),
            select: "<space>".into(),
            confirm: "<enter>".into(),
            open_file: "o".into(),
            remove: "d".into(),
            refresh: "R".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StashKeys {
    pub pop_stash: String,
}

impl Default for StashKeys {
    fn default() -> Self {
        Self {
            pop_stash: "g".into(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct KeybindingConfig {
    pub universal: UniversalKeys,
    pub stash: StashKeys,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FocusConfig {
    /// Maximum depth of the return stack; `0` means unbounded.
    pub max_history: usize,
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self { max_history: 100 }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct OsConfig {
    /// Command used to open a directory; `{{dir}}` is substituted.
    pub open_dir: String,
}

impl Default for OsConfig {
    fn default() -> Self {
        Self {
            open_dir: "xdg-open {{dir}}".into(),
        }
    }
}

/// Root configuration file structure
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FocusdeckConfig {
    pub keybinding: KeybindingConfig,
    pub focus: FocusConfig,
    pub os: OsConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid key '{value}' for {field}")]
    InvalidKey { field: String, value: String },
    #[error("no config file found, searched: {searched:?}")]
    NotFound { searched: Vec<PathBuf> },
}

impl FocusdeckConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a string (useful for testing)
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: FocusdeckConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Search for config file in standard locations
    pub fn discover(start_dir: &Path) -> Result<(PathBuf, Self), ConfigError> {
        let names = ["focusdeck.yaml", "focusdeck.yml", ".focusdeck.yaml", ".focusdeck.yml"];
        let mut searched = Vec::new();

        if let Ok(env_path) = std::env::var("FOCUSDECK_CONFIG") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Ok((path.clone(), Self::load(&path)?));
            }
            searched.push(path);
        }

        let mut dir = Some(start_dir);
        while let Some(current) = dir {
            for name in &names {
                let path = current.join(name);
                if path.exists() {
                    return Ok((path.clone(), Self::load(&path)?));
                }
                searched.push(path);
            }
            dir = current.parent();
        }

        Err(ConfigError::NotFound { searched })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in self.key_specs() {
            if Key::parse(value).is_none() {
                return Err(ConfigError::InvalidKey {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    fn key_specs(&self) -> Vec<(&'static str, &str)> {
        let u = &self.keybinding.universal;
        vec![
            ("universal.quit", u.quit.as_str()),
            ("universal.return", u.return_.as_str()),
            ("universal.prev_item", u.prev_item.as_str()),
            ("universal.next_item", u.next_item.as_str()),
            ("universal.prev_item_alt", u.prev_item_alt.as_str()),
            ("universal.next_item_alt", u.next_item_alt.as_str()),
            ("universal.goto_top", u.goto_top.as_str()),
            ("universal.goto_bottom", u.goto_bottom.as_str()),
            ("universal.prev_block", u.prev_block.as_str()),
            ("universal.next_block", u.next_block.as_str()),
            ("universal.new", u.new.as_str()),
            ("universal.select", u.select.as_str()),
            ("universal.confirm", u.confirm.as_str()),
            ("universal.open_file", u.open_file.as_str()),
            ("universal.remove", u.remove.as_str()),
            ("universal.refresh", u.refresh.as_str()),
            ("stash.pop_stash", self.keybinding.stash.pop_stash.as_str()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = FocusdeckConfig::from_str("{}").unwrap();
        assert_eq!(config.keybinding.universal.confirm, "<enter>");
        assert_eq!(config.keybinding.stash.pop_stash, "g");
        assert_eq!(config.focus.max_history, 100);
        assert!(config.os.open_dir.contains("{{dir}}"));
    }

    #[test]
    fn test_partial_override() {
        let yaml = r#"
keybinding:
  universal:
    quit: "<c-q>"
    return: "<backspace>"
focus:
  max_history: 0
"#;
        let config = FocusdeckConfig::from_str(yaml).unwrap();
        assert_eq!(config.keybinding.universal.quit, "<c-q>");
        assert_eq!(config.keybinding.universal.return_, "<backspace>");
        assert_eq!(config.keybinding.universal.new, "n");
        assert_eq!(config.focus.max_history, 0);
    }

    #[test]
    fn test_invalid_key_rejected() {
        let yaml = r#"
keybinding:
  universal:
    remove: "<delete-everything>"
"#;
        let result = FocusdeckConfig::from_str(yaml);
        assert!(matches!(result, Err(ConfigError::InvalidKey { ref field, .. }) if field == "universal.remove"));
    }

    #[test]
    fn test_discover_walks_up_from_start_dir() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.path().join(".focusdeck.yml"), "focus:\n  max_history: 7\n").unwrap();

        let (path, config) = FocusdeckConfig::discover(&nested).unwrap();
        assert_eq!(path, root.path().join(".focusdeck.yml"));
        assert_eq!(config.focus.max_history, 7);
    }
}
