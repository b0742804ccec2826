use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use log::warn;

const DEFAULT_PORT: u16 = 5004;
const DEFAULT_HOST: &str = "0.0.0.0";

/// Application configuration and constants
#[derive(Debug, Clone)]
pub struct Config {
    /// Working copy of the git repository holding pages and attachments.
    pub repo_dir: PathBuf,
    pub port: u16,
    pub host: String,
    /// Identity used for every commit the wiki makes.
    pub author_name: String,
    pub author_email: String,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self {
            repo_dir: PathBuf::from("wiki"),
            port: DEFAULT_PORT,
            host: DEFAULT_HOST.to_string(),
            author_name: "Git Wiki".to_string(),
            author_email: "wiki@localhost".to_string(),
        }
    }

    /// Build a configuration from `GITWIKI_*` environment variables,
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::new();
        if let Ok(dir) = std::env::var("GITWIKI_REPO") {
            config.repo_dir = PathBuf::from(dir);
        }
        if let Ok(host) = std::env::var("GITWIKI_HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("GITWIKI_PORT") {
            match port.parse::<u16>() {
                Ok(port) => config.port = port,
                Err(_) => warn!("Ignoring invalid GITWIKI_PORT value: '{}'", port),
            }
        }
        if let Ok(name) = std::env::var("GITWIKI_AUTHOR_NAME") {
            config.author_name = name;
        }
        if let Ok(email) = std::env::var("GITWIKI_AUTHOR_EMAIL") {
            config.author_email = email;
        }
        config
    }

    /// Create configuration with custom values
    pub fn with_custom(repo_dir: PathBuf, port: Option<u16>, host: Option<String>) -> Self {
        Self {
            repo_dir,
            port: port.unwrap_or(DEFAULT_PORT),
            host: host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            ..Self::new()
        }
    }

    /// Get the socket address for binding
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = self.host.parse::<IpAddr>().unwrap_or_else(|_| {
            warn!("Invalid host '{}', binding to {}", self.host, DEFAULT_HOST);
            IpAddr::V4(Ipv4Addr::UNSPECIFIED)
        });
        SocketAddr::new(ip, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
