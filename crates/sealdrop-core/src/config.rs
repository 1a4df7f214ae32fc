use serde::{Deserialize, Serialize};

/// Top-level client configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealdropConfig {
    pub backend: BackendConfig,
    pub transfer: TransferConfig,
    pub share: ShareConfig,
    pub log: LogConfig,
}

impl SealdropConfig {
    /// Origin that share links are built on: `share.origin` when set,
    /// otherwise the backend base URL.
    pub fn share_origin(&self) -> &str {
        self.share
            .origin
            .as_deref()
            .unwrap_or(&self.backend.base_url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the storage backend (serves /api/upload and /api/download)
    pub base_url: String,
    /// Refuse plaintext HTTP backends instead of warning
    pub enforce_tls: bool,
}

/// Network policy for the transfer client.
///
/// There is no overall deadline on a transfer: a 2 GiB upload on a slow
/// link is legitimate. Instead the connection must be established within
/// `connect_timeout_secs` and must not stall for longer than
/// `read_timeout_secs` between reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// TCP/TLS connect timeout in seconds (default: 10)
    pub connect_timeout_secs: u64,
    /// Idle read timeout in seconds (default: 300)
    pub read_timeout_secs: u64,
    /// Times the CLI re-runs a flow that failed with a retryable error (default: 0)
    pub max_retries: u32,
    /// Upload body chunk size in bytes; progress is reported once per chunk
    pub chunk_size: usize,
    /// Largest plaintext accepted for upload, in bytes (default: 2 GiB)
    pub max_file_size: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareConfig {
    /// Origin used for share links (default: backend.base_url)
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            enforce_tls: false,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            read_timeout_secs: 300,
            max_retries: 0,
            chunk_size: 64 * 1024,
            max_file_size: crate::MAX_FILE_SIZE,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[backend]
base_url = "https://drop.example.com"
enforce_tls = true

[transfer]
connect_timeout_secs = 5
read_timeout_secs = 60
max_retries = 2
chunk_size = 131072
max_file_size = 1048576

[share]
origin = "https://share.example.com"

[log]
level = "debug"
format = "json"
"#;
        let config: SealdropConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.backend.base_url, "https://drop.example.com");
        assert!(config.backend.enforce_tls);
        assert_eq!(config.transfer.connect_timeout_secs, 5);
        assert_eq!(config.transfer.read_timeout_secs, 60);
        assert_eq!(config.transfer.max_retries, 2);
        assert_eq!(config.transfer.chunk_size, 131072);
        assert_eq!(config.transfer.max_file_size, 1048576);
        assert_eq!(config.share_origin(), "https://share.example.com");
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config: SealdropConfig = toml::from_str("").unwrap();

        assert_eq!(config.backend.base_url, "http://localhost:3000");
        assert!(!config.backend.enforce_tls);
        assert_eq!(config.transfer.connect_timeout_secs, 10);
        assert_eq!(config.transfer.read_timeout_secs, 300);
        assert_eq!(config.transfer.max_retries, 0);
        assert_eq!(config.transfer.max_file_size, 2 * 1024 * 1024 * 1024);
        assert!(config.share.origin.is_none());
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[backend]
base_url = "http://192.168.1.100:3000"
"#;
        let config: SealdropConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.backend.base_url, "http://192.168.1.100:3000");
        // Share origin follows the backend when unset
        assert_eq!(config.share_origin(), "http://192.168.1.100:3000");
        // Defaults
        assert_eq!(config.transfer.chunk_size, 64 * 1024);
        assert_eq!(config.log.format, "text");
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SealdropConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SealdropConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.backend.base_url, parsed.backend.base_url);
        assert_eq!(config.transfer.max_file_size, parsed.transfer.max_file_size);
        assert_eq!(config.log.level, parsed.log.level);
    }
}
