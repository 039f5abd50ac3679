use std::path::{Path, PathBuf};

use url::Url;

use crate::config::schema::Config;
use crate::error::ConfigError;

pub const ENV_API_URL: &str = "JOBDESK_API_URL";
pub const ENV_API_TOKEN: &str = "JOBDESK_API_TOKEN";

const MAX_DEBOUNCE_MS: u64 = 10_000;

/// `<config dir>/jobdesk/config.yaml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jobdesk").join("config.yaml"))
}

/// Loads a config file and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse(&content)?;
    apply_env_overrides(&mut config);
    validate_config(&config)?;

    log::info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Loads the default config file, falling back to defaults when it does not exist.
pub fn load_default_config() -> Result<Config, ConfigError> {
    match default_config_path() {
        Some(path) if path.exists() => load_config(path),
        _ => {
            log::debug!("No config file found, using defaults");
            let mut config = Config::default();
            apply_env_overrides(&mut config);
            validate_config(&config)?;
            Ok(config)
        }
    }
}

/// Parses and validates YAML. Environment overrides are not applied.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config = parse(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse(content: &str) -> Result<Config, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(url) = std::env::var(ENV_API_URL) {
        if !url.trim().is_empty() {
            log::debug!("API base URL overridden by {}", ENV_API_URL);
            config.api.base_url = url.trim().to_string();
        }
    }
    if let Ok(token) = std::env::var(ENV_API_TOKEN) {
        if !token.trim().is_empty() {
            log::debug!("API token overridden by {}", ENV_API_TOKEN);
            config.api.token = Some(token.trim().to_string());
        }
    }
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let url = Url::parse(&config.api.base_url).map_err(|e| ConfigError::Validation {
        message: format!("Invalid api.base_url '{}': {}", config.api.base_url, e),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            message: format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            ),
        });
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "api.timeout_secs must be greater than 0".to_string(),
        });
    }

    if config.jobs.page_size == 0 {
        return Err(ConfigError::Validation {
            message: "jobs.page_size must be greater than 0".to_string(),
        });
    }

    if config.jobs.search_debounce_ms == 0 || config.jobs.search_debounce_ms > MAX_DEBOUNCE_MS {
        return Err(ConfigError::Validation {
            message: format!(
                "jobs.search_debounce_ms must be between 1 and {}",
                MAX_DEBOUNCE_MS
            ),
        });
    }

    if config.jobs.projects_limit == 0 {
        return Err(ConfigError::Validation {
            message: "jobs.projects_limit must be greater than 0".to_string(),
        });
    }

    if config.jobs.notification_capacity == 0 {
        return Err(ConfigError::Validation {
            message: "jobs.notification_capacity must be greater than 0".to_string(),
        });
    }

    Ok(())
}
