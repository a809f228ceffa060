use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::{manager::ConvertOptions, pack::ParseOptions};

pub const DEFAULT_CONFIG_FILE: &str = "burrito.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config json at {path}: {source}")]
    Json {
        path: Utf8PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to save config to {path}: {source}")]
    Write {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct ConfigManager {
    pub path: Utf8PathBuf,
    pub config: BurritoConfig,
}

impl ConfigManager {
    /// loads the config at `path`. a missing file means default config. nothing is written until [`Self::save_config`].
    /// environment overrides are applied on top, so call [`load_dotenv`] before this.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let mut config = if path.exists() {
            let config_src = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&config_src).map_err(|source| ConfigError::Json {
                path: path.clone(),
                source,
            })?
        } else {
            BurritoConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(Self { path, config })
    }

    pub fn save_config(&self) -> Result<(), ConfigError> {
        let config_string = serde_json::to_string_pretty(&self.config).map_err(|source| ConfigError::Json {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, config_string).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

/// loads `.env` from the current directory or its parents if there is one
pub fn load_dotenv() -> Option<std::path::PathBuf> {
    dotenvy::dotenv().ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BurritoConfig {
    /// extracted packs (`<id>/`) and `.taco` archives live here
    pub packages_dir: Utf8PathBuf,
    pub pack_list: Utf8PathBuf,
    pub log_level: String,
    /// `burrito.log` is written here if set
    pub log_dir: Option<Utf8PathBuf>,
    pub parse: ParseOptions,
    pub pretty_json: bool,
    pub stage_placeholders: bool,
}

impl Default for BurritoConfig {
    fn default() -> Self {
        Self {
            packages_dir: "packages".into(),
            pack_list: "MarkerPacks.json".into(),
            log_level: "info".to_string(),
            log_dir: None,
            parse: ParseOptions::default(),
            pretty_json: true,
            stage_placeholders: true,
        }
    }
}

impl BurritoConfig {
    pub const PACKAGES_DIR_ENV: &'static str = "BURRITO_PACKAGES_DIR";
    pub const PACK_LIST_ENV: &'static str = "BURRITO_PACK_LIST";
    pub const LOG_DIR_ENV: &'static str = "BURRITO_LOG_DIR";

    /// `lookup` gives the value of an environment variable. empty values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());
        if let Some(packages_dir) = lookup(Self::PACKAGES_DIR_ENV) {
            self.packages_dir = packages_dir.into();
        }
        if let Some(pack_list) = lookup(Self::PACK_LIST_ENV) {
            self.pack_list = pack_list.into();
        }
        if let Some(log_dir) = lookup(Self::LOG_DIR_ENV) {
            self.log_dir = Some(log_dir.into());
        }
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            parse: self.parse.clone(),
            pretty_json: self.pretty_json,
            stage_placeholders: self.stage_placeholders,
        }
    }
}

#[cfg(test)]
mod test {
    use camino::Utf8PathBuf;
    use rstest::*;
    use similar_asserts::assert_eq;

    use super::{BurritoConfig, ConfigError, ConfigManager};

    fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("non utf-8 temp dir");
        (dir, root)
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: BurritoConfig = serde_json::from_str(
            r#"{ "packages_dir": "elsewhere", "parse": { "attribute_prefix": "$" }, "pretty_json": false }"#,
        )
        .expect("failed to parse config");
        assert_eq!(config.packages_dir, Utf8PathBuf::from("elsewhere"));
        assert_eq!(config.pack_list, Utf8PathBuf::from("MarkerPacks.json"));
        assert_eq!(config.parse.attribute_prefix, "$");
        assert!(config.parse.coerce_numbers);
        let options = config.convert_options();
        assert!(!options.pretty_json);
        assert!(options.stage_placeholders);
    }

    #[rstest]
    #[case(BurritoConfig::PACKAGES_DIR_ENV, "/srv/packs")]
    #[case(BurritoConfig::PACK_LIST_ENV, "lists/packs.json")]
    #[case(BurritoConfig::LOG_DIR_ENV, "logs")]
    fn environment_overrides(#[case] key: &str, #[case] value: &str) {
        let mut config = BurritoConfig::default();
        config.apply_overrides(|k| (k == key).then(|| value.to_string()));
        let overridden = match key {
            BurritoConfig::PACKAGES_DIR_ENV => config.packages_dir.as_str(),
            BurritoConfig::PACK_LIST_ENV => config.pack_list.as_str(),
            _ => config.log_dir.as_deref().map(|p| p.as_str()).unwrap_or_default(),
        };
        assert_eq!(overridden, value);
    }

    #[test]
    fn empty_override_is_ignored() {
        let mut config = BurritoConfig::default();
        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config, BurritoConfig::default());
    }

    #[test]
    fn missing_file_then_save_and_reload() {
        let (_dir, root) = temp_root();
        let path = root.join("burrito.json");
        let mut manager = ConfigManager::new(path.clone()).expect("missing config should be default");
        assert!(!path.exists());
        manager.config.log_level = "debug".to_string();
        manager.save_config().expect("failed to save config");
        let reloaded = ConfigManager::new(path).expect("failed to reload config");
        assert_eq!(reloaded.config.log_level, "debug");
    }

    #[test]
    fn broken_file_is_an_error() {
        let (_dir, root) = temp_root();
        let path = root.join("burrito.json");
        std::fs::write(&path, "{ nope").expect("write");
        assert!(matches!(ConfigManager::new(path), Err(ConfigError::Json { .. })));
    }
}
