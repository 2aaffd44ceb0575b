//! TOML-based deployment configuration.
//!
//! Stores the fixed-at-deploy settings:
//! - Time limit for one attempt
//! - Minimum student name length
//! - Teacher reset secret
//! - Submission endpoint
//! - Answer key
//!
//! Configuration is stored at `~/.config/quizgate/config.toml`. A few
//! values can be overridden per process through `QUIZGATE_*` variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use super::data_dir;
use crate::attempt::AttemptSettings;
use crate::error::ConfigError;
use crate::grader::AnswerKey;

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/quizgate/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_time_limit_seconds")]
    pub time_limit_seconds: u64,
    #[serde(default = "default_min_name_len")]
    pub min_name_len: usize,
    /// Empty disables the teacher reset entirely.
    #[serde(default)]
    pub teacher_secret: String,
    /// Empty means not configured; submissions fail without a network call.
    #[serde(default)]
    pub submission_endpoint: String,
    /// Kept last: TOML tables must follow plain values.
    #[serde(default)]
    pub answer_key: AnswerKey,
}

/// Marker left in a freshly distributed config until the collector URL is
/// pasted in. An endpoint containing it counts as not configured.
pub const ENDPOINT_PLACEHOLDER: &str = "PASTE_ENDPOINT_HERE";

fn default_time_limit_seconds() -> u64 {
    60 * 60
}
fn default_min_name_len() -> usize {
    5
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_limit_seconds: default_time_limit_seconds(),
            min_name_len: default_min_name_len(),
            teacher_secret: String::new(),
            submission_endpoint: String::new(),
            answer_key: AnswerKey::default(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                // Answer key entries may be added, everything else must exist.
                let new_value = match obj.get(part) {
                    Some(serde_json::Value::Number(_)) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    Some(serde_json::Value::Object(_)) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    Some(_) => serde_json::Value::String(value.into()),
                    None if key.starts_with("answer_key.") => {
                        serde_json::Value::String(value.into())
                    }
                    None => return Err(ConfigError::UnknownKey(key.to_string())),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or write and return defaults, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// if the default config cannot be written, or if a value is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::load_from(&Self::path()?)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from an explicit path without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Apply `QUIZGATE_TIME_LIMIT_SECONDS`, `QUIZGATE_TEACHER_SECRET` and
    /// `QUIZGATE_SUBMISSION_ENDPOINT` when set.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(limit) = lookup("QUIZGATE_TIME_LIMIT_SECONDS") {
            self.time_limit_seconds =
                limit
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: "time_limit_seconds".into(),
                        message: format!("cannot parse '{limit}' as number"),
                    })?;
        }
        if let Some(secret) = lookup("QUIZGATE_TEACHER_SECRET") {
            self.teacher_secret = secret;
        }
        if let Some(endpoint) = lookup("QUIZGATE_SUBMISSION_ENDPOINT") {
            self.submission_endpoint = endpoint;
        }
        Ok(())
    }

    /// Reject values the attempt lifecycle cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.time_limit_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                key: "time_limit_seconds".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.answer_key.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "answer_key".into(),
                message: "must contain at least one question".into(),
            });
        }
        self.endpoint_url()?;
        Ok(())
    }

    /// Parsed submission endpoint, `None` when not configured.
    pub fn endpoint_url(&self) -> Result<Option<Url>, ConfigError> {
        let raw = self.submission_endpoint.trim();
        if raw.is_empty() || raw.contains(ENDPOINT_PLACEHOLDER) {
            return Ok(None);
        }
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
            key: "submission_endpoint".into(),
            message: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(Some(url)),
            other => Err(ConfigError::InvalidValue {
                key: "submission_endpoint".into(),
                message: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    pub fn attempt_settings(&self) -> AttemptSettings {
        AttemptSettings {
            time_limit_secs: self.time_limit_seconds,
            min_name_len: self.min_name_len,
            teacher_secret: self.teacher_secret.clone(),
            answer_key: self.answer_key.clone(),
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving. Returns error if key is
    /// unknown or the result does not validate.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
