use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub transport: TransportConfig,
    /// Principals always treated as administrators, in addition to the
    /// admin table.
    pub admin_ids: Vec<i64>,
    /// Base of the shareable redemption link; the token is appended as a
    /// start parameter.
    pub link_base: String,
    /// Maximum uploaded bundle size in bytes
    pub max_bundle_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the live file pool
    pub pool_path: String,
    /// Directory holding backup copies made during handoff
    pub backup_path: String,
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the bot API the transport posts documents to
    pub api_base: String,
    pub token: String,
    /// Upper bound on a single transmission; a timeout counts as a failure
    pub send_timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pool_path: "./files/pool".to_string(),
            backup_path: "./files/backup".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let pool_path =
            std::env::var("POOL_STORAGE_PATH").unwrap_or_else(|_| "./files/pool".to_string());
        let backup_path =
            std::env::var("BACKUP_STORAGE_PATH").unwrap_or_else(|_| "./files/backup".to_string());

        let admin_ids: Vec<i64> = std::env::var("ADMIN_IDS")
            .map(|ids| {
                ids.split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect()
            })
            .unwrap_or_default();

        let link_base = std::env::var("REDEMPTION_LINK_BASE").unwrap_or_default();

        let api_base = std::env::var("TRANSPORT_API_BASE")
            .unwrap_or_else(|_| "https://api.telegram.org".to_string());
        let token = std::env::var("TRANSPORT_TOKEN").unwrap_or_default();

        let send_timeout_secs = std::env::var("SEND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let max_bundle_size = std::env::var("MAX_BUNDLE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50 * 1024 * 1024); // 50MB

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig {
                pool_path,
                backup_path,
            },
            transport: TransportConfig {
                api_base,
                token,
                send_timeout_secs,
            },
            admin_ids,
            link_base,
            max_bundle_size,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.link_base.is_empty() {
            return Err(ConfigError::ValidationError(
                "REDEMPTION_LINK_BASE must be set".to_string(),
            ));
        }

        if self.transport.token.is_empty() {
            return Err(ConfigError::ValidationError(
                "TRANSPORT_TOKEN must be set".to_string(),
            ));
        }

        if self.transport.send_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "SEND_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.admin_ids.is_empty() {
            tracing::warn!(
                "No ADMIN_IDS configured. Until an administrator is added to the \
                 store, no one can issue links or ingest bundles."
            );
        }

        Ok(())
    }
}
