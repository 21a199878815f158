use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

impl Config {
    /// Load configuration from file with environment variable overrides
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let config: Config = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("PEERSIFT_").split("_"))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Parse configuration from a TOML string (useful for testing)
    pub fn from_toml_str(toml_str: &str) -> Result<Config, ConfigError> {
        toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
