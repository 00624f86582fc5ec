use crate::generation::gemini::{GeminiConfig, DEFAULT_TIMEOUT_SECS, GEMINI_API_URL};
use crate::types::CONTEXT_ELDER;
use crate::voice::{RecognitionConfig, DEFAULT_SPEECH_LANGUAGE};
use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use log::{debug, warn};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_STORE_PATH: &str = "settings_store.json";
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
pub const MODEL_ENV_VAR: &str = "UNGGAH_MODEL";

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// Accepts both the numeric form (1-5) and the string form ("trace", "debug", etc.)
impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct LogLevelVisitor;

        impl<'de> Visitor<'de> for LogLevelVisitor {
            type Value = LogLevel;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a string or integer representing log level")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<LogLevel, E> {
                match value.to_lowercase().as_str() {
                    "trace" => Ok(LogLevel::Trace),
                    "debug" => Ok(LogLevel::Debug),
                    "info" => Ok(LogLevel::Info),
                    "warn" => Ok(LogLevel::Warn),
                    "error" => Ok(LogLevel::Error),
                    _ => Err(E::unknown_variant(
                        value,
                        &["trace", "debug", "info", "warn", "error"],
                    )),
                }
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<LogLevel, E> {
                match value {
                    1 => Ok(LogLevel::Trace),
                    2 => Ok(LogLevel::Debug),
                    3 => Ok(LogLevel::Info),
                    4 => Ok(LogLevel::Warn),
                    5 => Ok(LogLevel::Error),
                    _ => Err(E::invalid_value(de::Unexpected::Unsigned(value), &"1-5")),
                }
            }
        }

        deserializer.deserialize_any(LogLevelVisitor)
    }
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AppSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_speech_language")]
    pub speech_language: String,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "default_context")]
    pub default_context: String,
}

fn default_model() -> String {
    "gemini-3-flash-preview".to_string()
}

fn default_base_url() -> String {
    GEMINI_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_transcription_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_speech_language() -> String {
    DEFAULT_SPEECH_LANGUAGE.to_string()
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_context() -> String {
    CONTEXT_ELDER.to_string()
}

pub fn get_default_settings() -> AppSettings {
    AppSettings {
        api_key: String::new(),
        model: default_model(),
        base_url: default_base_url(),
        request_timeout_secs: default_request_timeout_secs(),
        transcription_model: default_transcription_model(),
        speech_language: default_speech_language(),
        log_level: default_log_level(),
        default_context: default_context(),
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        get_default_settings()
    }
}

impl AppSettings {
    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout_secs: self.request_timeout_secs,
        }
    }

    pub fn recognition_config(&self) -> RecognitionConfig {
        RecognitionConfig {
            language: self.speech_language.clone(),
            ..RecognitionConfig::default()
        }
    }

    /// Applies environment overrides from `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(*name))
            .find(|value| !value.trim().is_empty())
        {
            debug!("Using API key from environment");
            self.api_key = key;
        }
        if let Some(model) = lookup(MODEL_ENV_VAR).filter(|m| !m.trim().is_empty()) {
            debug!("Using model '{}' from environment", model);
            self.model = model;
        }
    }
}

pub fn default_settings_path() -> Result<PathBuf> {
    ProjectDirs::from("id", "unggah", "unggah")
        .map(|dirs| dirs.config_dir().join(SETTINGS_STORE_PATH))
        .context("failed to determine config directory")
}

pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads settings, writing defaults when the file is missing or unreadable.
    pub fn load_or_create(&self) -> Result<AppSettings> {
        if !self.path.exists() {
            let defaults = get_default_settings();
            self.save(&defaults)?;
            return Ok(defaults);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed reading settings file {}", self.path.display()))?;
        match serde_json::from_str::<AppSettings>(&raw) {
            Ok(settings) => {
                debug!("Loaded settings from {}", self.path.display());
                Ok(settings)
            }
            Err(e) => {
                warn!("Failed to parse settings: {}", e);
                let defaults = get_default_settings();
                self.save(&defaults)?;
                Ok(defaults)
            }
        }
    }

    pub fn save(&self, settings: &AppSettings) -> Result<()> {
        let Some(parent) = self.path.parent() else {
            anyhow::bail!("settings path has no parent")
        };
        fs::create_dir_all(parent)?;
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)
            .with_context(|| format!("failed writing settings file {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("unggah-settings-{}-{}", name, std::process::id()))
            .join(SETTINGS_STORE_PATH)
    }

    #[test]
    fn log_level_accepts_names_and_numbers() {
        let level: LogLevel = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(level, LogLevel::Warn);
        let level: LogLevel = serde_json::from_str("2").unwrap();
        assert_eq!(level, LogLevel::Debug);
        assert!(serde_json::from_str::<LogLevel>("9").is_err());
        assert_eq!(serde_json::to_string(&LogLevel::Trace).unwrap(), "\"trace\"");
    }

    #[test]
    fn missing_fields_take_defaults() {
        let settings: AppSettings = serde_json::from_str(r#"{"api_key":"abc"}"#).unwrap();
        assert_eq!(settings.api_key, "abc");
        assert_eq!(settings.model, "gemini-3-flash-preview");
        assert_eq!(settings.speech_language, "id-ID");
        assert_eq!(settings.default_context, CONTEXT_ELDER);
    }

    #[test]
    fn creates_defaults_when_missing() {
        let path = temp_path("missing");
        let _ = fs::remove_file(&path);
        let store = SettingsStore::new(path.clone());

        let settings = store.load_or_create().expect("load defaults");
        assert_eq!(settings, get_default_settings());
        assert!(path.exists());
    }

    #[test]
    fn corrupt_file_is_replaced_by_defaults() {
        let path = temp_path("corrupt");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        let store = SettingsStore::new(path.clone());

        assert_eq!(store.load_or_create().unwrap(), get_default_settings());
        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<AppSettings>(&rewritten).is_ok());
    }

    #[test]
    fn saved_settings_load_back() {
        let store = SettingsStore::new(temp_path("saved"));
        let mut settings = get_default_settings();
        settings.model = "gemini-2.5-flash".to_string();
        settings.log_level = LogLevel::Debug;
        store.save(&settings).unwrap();
        assert_eq!(store.load_or_create().unwrap(), settings);
    }

    #[test]
    fn environment_overrides_key_and_model() {
        let mut settings = get_default_settings();
        settings.apply_env(|name| match name {
            "GEMINI_API_KEY" => Some(" ".to_string()),
            "API_KEY" => Some("from-api-key".to_string()),
            "UNGGAH_MODEL" => Some("gemini-2.0-flash".to_string()),
            _ => None,
        });
        assert_eq!(settings.api_key, "from-api-key");
        assert_eq!(settings.model, "gemini-2.0-flash");
    }
}
