//! Linux policy routing via iproute2

use super::{PlatformError, RoutingManager};
use crate::routes::NetworkPrefix;
use nix::ifaddrs::getifaddrs;
use nix::net::if_::InterfaceFlags;
use std::process::Command;
use tracing::debug;

pub struct LinuxRoutingManager;

impl LinuxRoutingManager {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LinuxRoutingManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `ip <args>`, returning stdout on success and stderr on failure
fn run_ip(args: &[&str]) -> Result<String, String> {
    debug!("ip {}", args.join(" "));
    let output = Command::new("ip")
        .args(args)
        .output()
        .map_err(|e| e.to_string())?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(stderr.trim().to_string());
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// iproute2 reports misaligned prefixes and bad values as invalid arguments
fn is_invalid_argument(stderr: &str) -> bool {
    let lower = stderr.to_ascii_lowercase();
    lower.contains("invalid argument") || lower.contains("invalid prefix")
}

impl RoutingManager for LinuxRoutingManager {
    fn flush_table(&self, table: u32) -> Result<(), PlatformError> {
        let table = table.to_string();
        run_ip(&["route", "flush", "table", &table]).map_err(PlatformError::FlushError)?;
        Ok(())
    }

    fn rule_exists(&self, priority: u32) -> Result<bool, PlatformError> {
        let priority = priority.to_string();
        let stdout = run_ip(&["rule", "show", "priority", &priority])
            .map_err(PlatformError::QueryError)?;
        Ok(!stdout.trim().is_empty())
    }

    fn add_rule(&self, table: u32, priority: u32) -> Result<(), PlatformError> {
        let (table, priority) = (table.to_string(), priority.to_string());
        run_ip(&[
            "rule", "add", "from", "all", "lookup", &table, "priority", &priority,
        ])
        .map_err(PlatformError::AddRuleError)?;
        Ok(())
    }

    fn remove_rule(&self, priority: u32) -> Result<(), PlatformError> {
        let priority = priority.to_string();
        run_ip(&["rule", "del", "priority", &priority]).map_err(PlatformError::DeleteRuleError)?;
        Ok(())
    }

    fn add_route(
        &self,
        table: u32,
        destination: &NetworkPrefix,
        device: &str,
    ) -> Result<(), PlatformError> {
        let (table, cidr) = (table.to_string(), destination.to_string());
        run_ip(&["route", "add", &cidr, "dev", device, "table", &table]).map_err(|message| {
            if is_invalid_argument(&message) {
                PlatformError::InvalidArgument {
                    destination: cidr.clone(),
                    message,
                }
            } else {
                PlatformError::AddRouteError(format!("{}: {}", cidr, message))
            }
        })?;
        Ok(())
    }

    fn interface_is_up(&self, name: &str) -> bool {
        match getifaddrs() {
            Ok(addrs) => addrs
                .filter(|ifaddr| ifaddr.interface_name == name)
                .any(|ifaddr| ifaddr.flags.contains(InterfaceFlags::IFF_UP)),
            Err(e) => {
                debug!("getifaddrs failed: {}", e);
                false
            }
        }
    }

    fn list_rules(&self) -> Result<String, PlatformError> {
        run_ip(&["rule", "show"]).map_err(PlatformError::QueryError)
    }

    fn list_routes(&self, table: u32) -> Result<String, PlatformError> {
        let table = table.to_string();
        run_ip(&["route", "show", "table", &table]).map_err(PlatformError::QueryError)
    }
}
