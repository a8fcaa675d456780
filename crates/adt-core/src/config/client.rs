//! Client configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Default address of the language server socket
pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:9257";

/// Configuration for talking to the local language server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Address the language server listens on
    pub server_address: String,

    /// Executable launched when the server is not running.
    /// `ADT_SERVER_DEBUG` in the environment takes precedence.
    pub server_executable: PathBuf,

    /// How long to wait after launching the server before connecting again
    #[serde(with = "duration_secs")]
    pub settle_interval: Duration,

    /// Upper bound for a connection test
    #[serde(with = "duration_secs")]
    pub test_timeout: Duration,

    /// Directory holding the connection catalog and parked systems
    pub state_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            server_executable: PathBuf::from("abap-ls"),
            settle_interval: Duration::from_secs(1),
            test_timeout: Duration::from_secs(10),
            state_dir: super::default_config_dir().join("state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: ClientConfig = toml::from_str("test_timeout = 3").unwrap();
        assert_eq!(config.test_timeout, Duration::from_secs(3));
        assert_eq!(config.server_address, DEFAULT_SERVER_ADDRESS);
        assert_eq!(config.settle_interval, Duration::from_secs(1));
    }
}
