use std::path::PathBuf;

const DEFAULT_DATABASE_URL: &str = "sqlite://espejo.db?mode=rwc";
const DEFAULT_MEDIA_DIR: &str = "media";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8900";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 600;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

/// Service configuration, read from `ESPEJO_*` environment variables. The
/// remote endpoint may be left unset; each import run checks it and aborts
/// with a configuration error before fetching anything.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub remote_endpoint: String,
    pub database_url: String,
    pub media_dir: PathBuf,
    pub bind_addr: String,
    pub sync_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl ImportConfig {
    pub fn from_env() -> Self {
        Self {
            remote_endpoint: env_value("ESPEJO_REMOTE_ENDPOINT").unwrap_or_default(),
            database_url: env_value("ESPEJO_DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            media_dir: PathBuf::from(
                env_value("ESPEJO_MEDIA_DIR").unwrap_or_else(|| DEFAULT_MEDIA_DIR.to_string()),
            ),
            bind_addr: env_value("ESPEJO_BIND_ADDR")
                .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            sync_interval_secs: parse_secs(
                env_value("ESPEJO_SYNC_INTERVAL_SECS"),
                DEFAULT_SYNC_INTERVAL_SECS,
            ),
            request_timeout_secs: parse_secs(
                env_value("ESPEJO_HTTP_TIMEOUT_SECS"),
                DEFAULT_HTTP_TIMEOUT_SECS,
            ),
        }
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_secs(raw: Option<String>, default: u64) -> u64 {
    raw.and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}
