use crate::error::ConfigError;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Which document store backs the item service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Memory,
    Firestore,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirestoreConfig {
    pub project_id: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: Backend,
    /// JSON array of items loaded into the memory backend at startup
    pub seed_file: Option<PathBuf>,
    pub firestore: Option<FirestoreConfig>,
    pub http_timeout: Duration,
    pub default_page_size: usize,
    pub log_level: String,
}

/// Load configuration from the environment, honouring a `.env` file.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    build_app_config(|key| std::env::var(key))
}

/// Parse configuration through `lookup`, so tests can use a plain map
pub(crate) fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let parse_positive = |var: &str, default: usize| -> Result<usize, ConfigError> {
        let Some(raw) = optional(var) else {
            return Ok(default);
        };
        match raw.trim().parse::<usize>() {
            Ok(0) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            }),
            Ok(value) => Ok(value),
            Err(e) => Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        }
    };

    let backend = match optional("RENTAL_BACKEND").as_deref() {
        None | Some("memory") => Backend::Memory,
        Some("firestore") => Backend::Firestore,
        Some(other) => {
            return Err(ConfigError::InvalidEnvVar {
                var: "RENTAL_BACKEND".to_string(),
                reason: format!("expected 'memory' or 'firestore', got '{other}'"),
            })
        }
    };

    let firestore = match backend {
        Backend::Firestore => Some(FirestoreConfig {
            project_id: optional("FIRESTORE_PROJECT_ID")
                .ok_or_else(|| ConfigError::MissingEnvVar("FIRESTORE_PROJECT_ID".to_string()))?,
            base_url: optional("FIRESTORE_BASE_URL")
                .unwrap_or_else(|| DEFAULT_FIRESTORE_BASE_URL.to_string()),
            api_key: optional("FIRESTORE_API_KEY"),
            bearer_token: optional("FIRESTORE_BEARER_TOKEN"),
        }),
        Backend::Memory => None,
    };

    Ok(AppConfig {
        backend,
        seed_file: optional("RENTAL_SEED_FILE").map(PathBuf::from),
        firestore,
        http_timeout: Duration::from_secs(parse_positive("RENTAL_HTTP_TIMEOUT_SECS", 30)? as u64),
        default_page_size: parse_positive("RENTAL_DEFAULT_PAGE_SIZE", 20)?,
        log_level: optional("RENTAL_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
