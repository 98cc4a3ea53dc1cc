use serde::{Deserialize, Serialize};
use std::{env, fs};
use url::Url;

use crate::error::{ApiError, ConfigError};

/// Environment variable overriding the API base url.
pub const API_URL_VAR: &str = "VOLUNTEER_API_URL";

const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ApiConfig {
    /// Base url every endpoint is resolved against, e.g. `http://127.0.0.1:5000/api`
    pub base_url: Url,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
        }
    }
}

impl ApiConfig {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    pub fn from_env() -> Self {
        match env::var(API_URL_VAR) {
            Ok(raw) => match Url::parse(&raw) {
                Ok(base_url) => Self { base_url },
                Err(e) => {
                    tracing::warn!("ignoring {API_URL_VAR}={raw}: {e}");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Resolve `segment` underneath the base url, keeping any path the base
    /// already carries (`/api` + `profile` => `/api/profile`).
    pub fn endpoint(&self, segment: &str) -> Result<Url, ApiError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(base.join(segment.trim_start_matches('/'))?)
    }

    pub fn profile_url(&self) -> Result<Url, ApiError> {
        self.endpoint("profile")
    }

    pub fn login_url(&self) -> Result<Url, ApiError> {
        self.endpoint("login")
    }
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
}

impl Config {
    pub fn load(config_file: &str) -> Result<Config, ConfigError> {
        let config_string = fs::read_to_string(config_file).map_err(|source| ConfigError::Read {
            path: config_file.to_owned(),
            source,
        })?;
        Self::parse(&config_string)
    }

    /// Parse a config document, substituting `$VAR` references with values
    /// from the environment first.
    pub fn parse(config_string: &str) -> Result<Config, ConfigError> {
        let mut config_string = config_string.to_owned();
        for (k, v) in env::vars() {
            config_string = config_string.replace(&format!("${}", k), &v);
        }
        Ok(toml::from_str(&config_string)?)
    }
}
