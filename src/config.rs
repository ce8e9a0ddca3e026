use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Process-held secret the room grants are signed with
    pub grant_secret: String,
    pub grant_ttl_seconds: u64,
    /// How long a requester may sit in the waiting pool before eviction
    pub max_queue_wait_seconds: u64,
    /// How long a match may stay unconsumed before it expires
    pub match_claim_seconds: u64,
    /// How long settled (consumed/expired) records are kept around
    pub record_retention_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidPort)?,
            grant_secret: env::var("GRANT_SECRET").map_err(|_| ConfigError::MissingGrantSecret)?,
            grant_ttl_seconds: env::var("GRANT_TTL_SECONDS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            max_queue_wait_seconds: env::var("MAX_QUEUE_WAIT_SECONDS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap_or(120),
            match_claim_seconds: env::var("MATCH_CLAIM_SECONDS")
                .unwrap_or_else(|_| "90".to_string())
                .parse()
                .unwrap_or(90),
            record_retention_seconds: env::var("RECORD_RETENTION_SECONDS")
                .unwrap_or_else(|_| "600".to_string())
                .parse()
                .unwrap_or(600),
            sweep_interval_seconds: env::var("SWEEP_INTERVAL_SECONDS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server port")]
    InvalidPort,
    #[error("GRANT_SECRET environment variable is required")]
    MissingGrantSecret,
}
