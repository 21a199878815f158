use regex_lite::Regex;

use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Cookie is non-empty (presence is enforced by serde)
/// - Peer range bounds are ordered
/// - max_complete stays a ratio
/// - Adapter override tokens compile as patterns
/// - At least one worker
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.cookie.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "cookie cannot be empty".to_string(),
        ));
    }

    if let Some(seeders) = &config.policy.seeders {
        if seeders.min > seeders.max {
            return Err(ConfigError::ValidationError(format!(
                "seeders.min ({}) exceeds seeders.max ({})",
                seeders.min, seeders.max
            )));
        }
    }

    if let Some(leechers) = &config.policy.leechers {
        if leechers.min > leechers.max {
            return Err(ConfigError::ValidationError(format!(
                "leechers.min ({}) exceeds leechers.max ({})",
                leechers.min, leechers.max
            )));
        }
        if !(0.0..=1.0).contains(&leechers.max_complete) {
            return Err(ConfigError::ValidationError(format!(
                "leechers.max_complete ({}) must be within [0.0, 1.0]",
                leechers.max_complete
            )));
        }
    }

    // Token overrides are regexes; fail here rather than at match time.
    if let Some(tokens) = &config.adapter {
        for (label, pattern) in tokens.tokens() {
            if let Err(e) = Regex::new(pattern) {
                return Err(ConfigError::ValidationError(format!(
                    "adapter token for {} is not a valid pattern: {}",
                    label, e
                )));
            }
        }
    }

    if config.pipeline.workers == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.workers cannot be 0".to_string(),
        ));
    }

    Ok(())
}
