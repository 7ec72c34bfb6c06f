pub mod toml_config;

#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use toml_config::AppConfig;

/// Command line flags. Anything set here wins over the config file.
#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "shopping-cart")]
#[command(about = "Shopping cart service with background item reservation")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    #[arg(long)]
    pub listen_addr: Option<String>,

    #[arg(long)]
    pub reservation_endpoint: Option<String>,

    #[arg(long)]
    pub reservation_timeout_seconds: Option<u64>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn load(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => AppConfig::from_file(path)?,
            None => AppConfig::default(),
        };

        if let Some(addr) = &self.listen_addr {
            config.server.listen_addr = addr.clone();
        }
        if let Some(endpoint) = &self.reservation_endpoint {
            config.reservation.endpoint = endpoint.clone();
        }
        if let Some(timeout) = self.reservation_timeout_seconds {
            config.reservation.timeout_seconds = timeout;
        }

        Ok(config)
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::core::ConfigProvider;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cli_overrides_config_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[reservation]\nendpoint = \"http://file.test\"\ntimeout_seconds = 10\n")
            .unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();

        let cli = CliConfig::try_parse_from([
            "shopping-cart",
            "--config",
            &path,
            "--reservation-endpoint",
            "http://cli.test",
        ])
        .unwrap();
        let config = cli.load().unwrap();

        assert_eq!(config.reservation_endpoint(), "http://cli.test");
        assert_eq!(config.reservation_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_no_config_file_uses_defaults() {
        let cli = CliConfig::try_parse_from(["shopping-cart", "--listen-addr", "127.0.0.1:3000"])
            .unwrap();
        let config = cli.load().unwrap();

        assert_eq!(config.listen_addr(), "127.0.0.1:3000");
        assert_eq!(config.reservation_timeout(), Duration::from_secs(30));
    }
}
