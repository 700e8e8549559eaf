use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_history_samples")]
    pub history_samples: usize,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_procs_ttl_secs")]
    pub procs_ttl_secs: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            interval_secs: default_interval_secs(),
            history_samples: default_history_samples(),
            top_n: default_top_n(),
            procs_ttl_secs: default_procs_ttl_secs(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("config validation failed: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg: Config = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Validation("listen is required".to_string()));
        }
        if SocketAddr::from_str(&self.listen).is_err() {
            return Err(ConfigError::Validation(
                "listen must be a valid host:port address".to_string(),
            ));
        }
        if self.interval_secs < 1 {
            return Err(ConfigError::Validation(
                "interval_secs must be >= 1".to_string(),
            ));
        }
        if self.history_samples < 2 {
            return Err(ConfigError::Validation(
                "history_samples must be >= 2".to_string(),
            ));
        }
        if self.top_n < 1 {
            return Err(ConfigError::Validation("top_n must be >= 1".to_string()));
        }
        if !self.procs_ttl_secs.is_finite() || self.procs_ttl_secs <= 0.0 {
            return Err(ConfigError::Validation(
                "procs_ttl_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

const fn default_interval_secs() -> u64 {
    1
}

const fn default_history_samples() -> usize {
    240
}

const fn default_top_n() -> usize {
    5
}

const fn default_procs_ttl_secs() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        Config::default().validate().expect("default config valid");
    }

    #[test]
    fn example_yaml_parses_and_validates() {
        let cfg: Config = serde_yaml::from_str(Config::example_yaml()).expect("example parses");
        cfg.validate().expect("example valid");
        assert_eq!(cfg.history_samples, 240);
    }

    #[test]
    fn empty_yaml_falls_back_to_defaults() {
        let cfg: Config = serde_yaml::from_str("{}").expect("empty mapping parses");
        assert_eq!(cfg.interval_secs, 1);
        assert_eq!(cfg.top_n, 5);
    }

    #[test]
    fn bad_listen_is_rejected() {
        let cfg = Config {
            listen: "not-an-address".to_string(),
            ..Config::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = Config {
            interval_secs: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tiny_history_is_rejected() {
        let cfg = Config {
            history_samples: 1,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_ttl_is_rejected() {
        let cfg = Config {
            procs_ttl_secs: 0.0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }
}
