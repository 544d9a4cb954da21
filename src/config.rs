use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use thiserror::Error;

/// Connection settings an engine is created from.
///
/// `uri` identifies the database for caching purposes, `info` is the
/// connect string handed to the driver and `options` carries engine options
/// (`echo`, `pool_size`, `pool_timeout`, `pool_recycle`).
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub uri: String,
    pub info: String,
    pub options: EngineOptions,
}

impl ConnectionConfig {
    /// Config whose driver connect string is the URI itself.
    pub fn new(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            info: uri.clone(),
            uri,
            options: EngineOptions::default(),
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }
}

/// Engine options keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineOptions(BTreeMap<String, Value>);

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `echo` flag. `None` when unset; non-boolean values are rejected.
    pub fn echo(&self) -> Result<Option<bool>, ConfigError> {
        match self.0.get("echo") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(ConfigError::InvalidValue(
                "echo".to_string(),
                format!("must be a boolean, got {}", other),
            )),
        }
    }

    pub fn pool_size(&self) -> Result<Option<u32>, ConfigError> {
        self.unsigned("pool_size")?
            .map(|n| {
                u32::try_from(n).map_err(|_| {
                    ConfigError::InvalidValue("pool_size".to_string(), "out of range".to_string())
                })
            })
            .transpose()
    }

    pub fn pool_timeout(&self) -> Result<Option<Duration>, ConfigError> {
        Ok(self.unsigned("pool_timeout")?.map(Duration::from_secs))
    }

    pub fn pool_recycle(&self) -> Result<Option<Duration>, ConfigError> {
        Ok(self.unsigned("pool_recycle")?.map(Duration::from_secs))
    }

    fn unsigned(&self, key: &str) -> Result<Option<u64>, ConfigError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                ConfigError::InvalidValue(
                    key.to_string(),
                    format!("must be a non-negative integer, got {}", value),
                )
            }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Loads a [`ConnectionConfig`] from `DATABASE_*` environment variables.
pub struct DatabaseConfig;

impl DatabaseConfig {
    pub fn from_env() -> Result<ConnectionConfig, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<ConnectionConfig, ConfigError> {
        let uri = env_map
            .get("DATABASE_URI")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_URI".to_string()))?;

        let info = env_map
            .get("DATABASE_INFO")
            .cloned()
            .unwrap_or_else(|| uri.clone());

        let mut options = EngineOptions::new();

        if let Some(raw) = env_map.get("DATABASE_ECHO") {
            let echo = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => {
                    return Err(ConfigError::InvalidValue(
                        "DATABASE_ECHO".to_string(),
                        format!("must be true or false, got {}", other),
                    ))
                }
            };
            options.insert("echo", echo);
        }

        for (var, key) in [
            ("DATABASE_POOL_SIZE", "pool_size"),
            ("DATABASE_POOL_TIMEOUT", "pool_timeout"),
            ("DATABASE_POOL_RECYCLE", "pool_recycle"),
        ] {
            if let Some(raw) = env_map.get(var) {
                let value = raw.trim().parse::<u64>().map_err(|_| {
                    ConfigError::InvalidValue(var.to_string(), "must be a valid u64".to_string())
                })?;
                options.insert(key, value);
            }
        }

        Ok(ConnectionConfig { uri, info, options })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_URI".to_string(), "sqlite::memory:".to_string());
        map
    }

    #[test]
    fn test_missing_database_uri() {
        let result = DatabaseConfig::from_env_map(HashMap::new());
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_URI"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_info_defaults_to_uri() {
        let config = DatabaseConfig::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.uri, "sqlite::memory:");
        assert_eq!(config.info, "sqlite::memory:");
        assert_eq!(config.options.echo().unwrap(), None);
    }

    #[test]
    fn test_explicit_info_and_options() {
        let mut env_map = setup_required_env();
        env_map.insert("DATABASE_INFO".to_string(), "sqlite:app.db?mode=rwc".to_string());
        env_map.insert("DATABASE_ECHO".to_string(), "true".to_string());
        env_map.insert("DATABASE_POOL_SIZE".to_string(), "8".to_string());
        env_map.insert("DATABASE_POOL_TIMEOUT".to_string(), "30".to_string());
        env_map.insert("DATABASE_POOL_RECYCLE".to_string(), "3600".to_string());

        let config = DatabaseConfig::from_env_map(env_map).unwrap();
        assert_eq!(config.info, "sqlite:app.db?mode=rwc");
        assert_eq!(config.options.echo().unwrap(), Some(true));
        assert_eq!(config.options.pool_size().unwrap(), Some(8));
        assert_eq!(
            config.options.pool_timeout().unwrap(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(
            config.options.pool_recycle().unwrap(),
            Some(Duration::from_secs(3600))
        );
    }

    #[test]
    fn test_invalid_echo() {
        let mut env_map = setup_required_env();
        env_map.insert("DATABASE_ECHO".to_string(), "loud".to_string());
        match DatabaseConfig::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DATABASE_ECHO"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_pool_size() {
        let mut env_map = setup_required_env();
        env_map.insert("DATABASE_POOL_SIZE".to_string(), "-1".to_string());
        match DatabaseConfig::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DATABASE_POOL_SIZE"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_non_boolean_echo_option_rejected() {
        let options = EngineOptions::new().with("echo", "yes");
        assert!(options.echo().is_err());
    }
}
