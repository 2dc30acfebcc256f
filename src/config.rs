//! Configuration from environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_PER_PAGE: u64 = 50;
const DEFAULT_CACHE_IDLE_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Drive API root used by client commands (`DRIVE_API_URL`)
    pub api_url: String,
    /// Address the server listens on (`DRIVE_BIND`)
    pub bind_addr: SocketAddr,
    /// Snapshot the server loads (`DRIVE_DATA`)
    pub data_file: PathBuf,
    /// Page size client commands ask for (`DRIVE_PER_PAGE`)
    pub per_page: u64,
    /// Idle retention of cached listings (`DRIVE_CACHE_IDLE_SECS`)
    pub cache_idle: Duration,
    /// Viewer id client commands send (`DRIVE_USER`)
    pub viewer: Option<u64>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str, default: &str| -> String {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let number = |key: &str, default: u64| -> u64 {
            match lookup(key) {
                None => default,
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!(key = key, value = %raw, default = default, "Invalid number, using default");
                    default
                }),
            }
        };

        let bind_raw = parsed("DRIVE_BIND", DEFAULT_BIND);
        let bind_addr = bind_raw.parse().unwrap_or_else(|_| {
            warn!(value = %bind_raw, default = DEFAULT_BIND, "Invalid bind address, using default");
            SocketAddr::from(([127, 0, 0, 1], 8080))
        });

        let data_file = lookup("DRIVE_DATA")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_file);

        Self {
            api_url: parsed("DRIVE_API_URL", DEFAULT_API_URL),
            bind_addr,
            data_file,
            per_page: number("DRIVE_PER_PAGE", DEFAULT_PER_PAGE).max(1),
            cache_idle: Duration::from_secs(number("DRIVE_CACHE_IDLE_SECS", DEFAULT_CACHE_IDLE_SECS)),
            viewer: lookup("DRIVE_USER").and_then(|v| v.trim().parse().ok()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// `<data dir>/drive/snapshot.json`
fn default_data_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("drive")
        .join("snapshot.json")
}
