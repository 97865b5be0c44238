//! Configuration types.

use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::submission::model::settings_keys;

/// Service configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path of the local libSQL database file.
    pub db_path: PathBuf,
    /// Port the REST server binds to.
    pub port: u16,
    /// Settings-table user the progress slot belongs to.
    pub user_id: String,
    /// Settings key of the progress slot.
    pub progress_slot: String,
    /// Remote "create submission" endpoint. `None` stores submissions locally.
    pub submission_url: Option<String>,
    /// Bearer token for `submission_url`.
    pub submission_token: Option<SecretString>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./data/innovation-intake.db"),
            port: 8080,
            user_id: settings_keys::DEFAULT_USER.to_string(),
            progress_slot: settings_keys::SUBMISSION_PROGRESS.to_string(),
            submission_url: None,
            submission_token: None,
        }
    }
}

impl AppConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("INTAKE_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "INTAKE_PORT".to_string(),
                message: format!("expected a port number, got {raw:?}"),
            })?,
            None => defaults.port,
        };

        let submission_url = non_empty("INTAKE_SUBMISSION_URL");
        if let Some(ref url) = submission_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    key: "INTAKE_SUBMISSION_URL".to_string(),
                    message: format!("expected an http(s) URL, got {url:?}"),
                });
            }
        }

        Ok(Self {
            db_path: non_empty("INTAKE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            port,
            user_id: non_empty("INTAKE_USER_ID").unwrap_or(defaults.user_id),
            progress_slot: non_empty("INTAKE_PROGRESS_SLOT").unwrap_or(defaults.progress_slot),
            submission_url,
            submission_token: non_empty("INTAKE_SUBMISSION_TOKEN").map(SecretString::from),
        })
    }
}
