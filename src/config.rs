//! Configuration handling for vpn-router

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "/opt/etc/vpn-router/config.yaml";
pub const DEFAULT_ROUTES_FILE: &str = "/opt/etc/vpn-router/current_routes.txt";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_yaml::Error),
    #[error("Missing required config key: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Tunnel device the VPN client brings up (e.g. `wg0`, `tun0`)
    #[serde(default)]
    pub vpn_interface: String,
    /// Local checkout holding the route files
    #[serde(default)]
    pub repo_dir: PathBuf,
    /// Route files relative to `repo_dir`, in priority order
    #[serde(default)]
    pub files: Vec<String>,
    /// Extra networks in CIDR notation
    #[serde(default)]
    pub ips: Vec<String>,
    /// Where the last computed route list is cached
    #[serde(default = "default_routes_file")]
    pub routes_file: PathBuf,
}

fn default_routes_file() -> PathBuf {
    PathBuf::from(DEFAULT_ROUTES_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vpn_interface: "wg0".to_string(),
            repo_dir: PathBuf::from("/opt/etc/vpn-router/repo"),
            files: vec!["routes.bat".to_string()],
            ips: Vec::new(),
            routes_file: default_routes_file(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// The VPN interface name, required by every action that touches the kernel
    pub fn vpn_interface(&self) -> Result<&str, ConfigError> {
        match self.vpn_interface.trim() {
            "" => Err(ConfigError::MissingField("vpn_interface")),
            name => Ok(name),
        }
    }

    /// Absolute paths of the configured route files
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| self.repo_dir.join(f)).collect()
    }
}
