use std::{env, time::Duration};

use dotenv::dotenv;
use serde::{Deserialize, Serialize};

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct DatabaseDetails {
    /// Postgres connection string. When omitted `DATABASE_URL` is read from the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_ssl: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,
}

impl DatabaseDetails {
    pub fn connection_string(&self) -> Result<String, env::VarError> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        dotenv().ok();
        env::var("DATABASE_URL")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.unwrap_or(DEFAULT_CONNECT_TIMEOUT_MS))
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_url_wins() {
        let details = DatabaseDetails {
            url: Some("postgres://localhost/explicit".to_string()),
            ..Default::default()
        };

        assert_eq!(details.connection_string().unwrap(), "postgres://localhost/explicit");
    }

    #[test]
    fn test_defaults() {
        let details = DatabaseDetails::default();

        assert_eq!(details.connect_timeout(), Duration::from_millis(5000));
        assert_eq!(details.max_connections(), 10);
    }

    #[test]
    fn test_zero_connections_is_clamped() {
        let details = DatabaseDetails { max_connections: Some(0), ..Default::default() };
        assert_eq!(details.max_connections(), 1);
    }
}
