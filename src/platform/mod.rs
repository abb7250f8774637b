//! Platform-specific policy routing
//!
//! Only Linux has the policy-routing primitives (`ip rule`, numbered tables)
//! this tool relies on.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(test)]
pub(crate) mod mock;

use crate::routes::NetworkPrefix;
use thiserror::Error;

/// Dedicated routing table holding the VPN routes
pub const ROUTE_TABLE: u32 = 1000;

/// Priority of the `from all lookup ROUTE_TABLE` rule
pub const RULE_PRIORITY: u32 = 1995;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Failed to flush table: {0}")]
    FlushError(String),
    #[error("Failed to query rules: {0}")]
    QueryError(String),
    #[error("Failed to add rule: {0}")]
    AddRuleError(String),
    #[error("Failed to delete rule: {0}")]
    DeleteRuleError(String),
    #[error("Failed to add route: {0}")]
    AddRouteError(String),
    #[error("Kernel rejected {destination}: {message}")]
    InvalidArgument { destination: String, message: String },
    #[error("Unsupported platform")]
    UnsupportedPlatform,
}

/// Policy-routing primitives the reconciler drives
///
/// Failures are reported but never retried here; the caller decides which
/// ones matter.
pub trait RoutingManager {
    fn flush_table(&self, table: u32) -> Result<(), PlatformError>;
    fn rule_exists(&self, priority: u32) -> Result<bool, PlatformError>;
    fn add_rule(&self, table: u32, priority: u32) -> Result<(), PlatformError>;
    fn remove_rule(&self, priority: u32) -> Result<(), PlatformError>;
    fn add_route(
        &self,
        table: u32,
        destination: &NetworkPrefix,
        device: &str,
    ) -> Result<(), PlatformError>;
    fn interface_is_up(&self, name: &str) -> bool;

    /// Human-readable dump of the policy rules
    fn list_rules(&self) -> Result<String, PlatformError>;
    /// Human-readable dump of the routes in `table`
    fn list_routes(&self, table: u32) -> Result<String, PlatformError>;
}

/// Get the appropriate routing manager for the current platform
pub fn get_routing_manager() -> Result<Box<dyn RoutingManager>, PlatformError> {
    #[cfg(target_os = "linux")]
    {
        Ok(Box::new(linux::LinuxRoutingManager::new()))
    }

    #[cfg(not(target_os = "linux"))]
    {
        Err(PlatformError::UnsupportedPlatform)
    }
}
