//! Route reconciliation
//!
//! Every action is a single pass:
//!
//! 1. `update`: parse route files + configured networks → save → apply
//! 2. `start`: load saved routes → apply
//! 3. `stop`: flush the table and drop the policy rule
//! 4. `status`: report rule and table contents without changing anything
//!
//! Applying always flushes the table and re-adds every route; kernel state is
//! never diffed. If the VPN interface is down, `update` still saves the new
//! route list and returns [`UpdateOutcome::Degraded`], while `start` fails.

use crate::config::{Config, ConfigError};
use crate::platform::{PlatformError, ROUTE_TABLE, RULE_PRIORITY, RoutingManager};
use crate::routes::{NetworkPrefix, PrefixSet, PrefixSetBuilder};
use crate::source::{SourceSync, SyncError};
use crate::state::{RouteStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Routes store error: {0}")]
    StoreError(#[from] StoreError),
    #[error("Source sync failed: {0}")]
    SyncError(#[from] SyncError),
    #[error("VPN interface {0} is down")]
    InterfaceDown(String),
    #[error("Could not install policy rule: {0}")]
    RuleInstallError(PlatformError),
    #[error("Could not inspect routing state: {0}")]
    InspectError(PlatformError),
}

/// Route add tally for one apply pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub applied: usize,
    pub failed: usize,
    /// /23 networks retried as two /24 halves
    pub split: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Applied(ApplyReport),
    /// Routes were saved but the interface is down, so nothing was pushed
    Degraded { stored: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub interface: Option<String>,
    pub interface_up: bool,
    pub table: u32,
    pub priority: u32,
    pub rule_present: bool,
    /// `None` when the routes file can't be loaded
    pub stored_routes: Option<usize>,
    pub rules: String,
    pub routes: String,
}

pub struct Reconciler<'a> {
    config: &'a Config,
    manager: &'a dyn RoutingManager,
    store: RouteStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a Config, manager: &'a dyn RoutingManager) -> Self {
        Self {
            config,
            manager,
            store: RouteStore::new(&config.routes_file),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &RouteStore {
        &self.store
    }

    /// Recompute the route list from sources, save it, and apply it
    pub fn update(&self) -> Result<UpdateOutcome, ReconcileError> {
        let device = self.config.vpn_interface()?;

        self.recompute()?;
        let set = self.store.load()?;

        if !self.manager.interface_is_up(device) {
            warn!(
                "{} is down: {} routes saved, not applied until the next start",
                device,
                set.len()
            );
            return Ok(UpdateOutcome::Degraded { stored: set.len() });
        }

        let report = self.apply(&set, device)?;
        Ok(UpdateOutcome::Applied(report))
    }

    /// Apply the saved route list without reparsing sources
    pub fn start(&self) -> Result<ApplyReport, ReconcileError> {
        let device = self.config.vpn_interface()?;
        let set = self.store.load()?;

        if !self.manager.interface_is_up(device) {
            return Err(ReconcileError::InterfaceDown(device.to_string()));
        }

        self.apply(&set, device)
    }

    /// Remove the VPN routes from the kernel; the routes file is kept
    pub fn stop(&self) {
        if let Err(e) = self.manager.flush_table(ROUTE_TABLE) {
            warn!("{} (continuing)", e);
        }
        self.remove_rule_if_present();
        info!("Table {} flushed, rule {} removed", ROUTE_TABLE, RULE_PRIORITY);
    }

    pub fn restart(&self) -> Result<ApplyReport, ReconcileError> {
        self.stop();
        self.start()
    }

    /// Pull the route sources, then run `update`
    ///
    /// A failed pull leaves both the routes file and the kernel untouched.
    pub fn update_repo(&self, sync: &dyn SourceSync) -> Result<UpdateOutcome, ReconcileError> {
        sync.sync(&self.config.repo_dir)?;
        self.update()
    }

    pub fn status(&self) -> Result<StatusReport, ReconcileError> {
        let interface = self.config.vpn_interface().ok().map(str::to_string);
        let interface_up = interface
            .as_deref()
            .is_some_and(|name| self.manager.interface_is_up(name));

        let rule_present = self
            .manager
            .rule_exists(RULE_PRIORITY)
            .map_err(ReconcileError::InspectError)?;
        let rules = self
            .manager
            .list_rules()
            .map_err(ReconcileError::InspectError)?;
        let routes = self
            .manager
            .list_routes(ROUTE_TABLE)
            .map_err(ReconcileError::InspectError)?;

        let stored_routes = match self.store.load() {
            Ok(set) => Some(set.len()),
            Err(e) => {
                debug!("{}", e);
                None
            }
        };

        Ok(StatusReport {
            interface,
            interface_up,
            table: ROUTE_TABLE,
            priority: RULE_PRIORITY,
            rule_present,
            stored_routes,
            rules,
            routes,
        })
    }

    /// Build the prefix set and persist it
    ///
    /// An empty result doesn't overwrite an existing routes file: it almost
    /// always means the sources are broken, not that nothing should be routed.
    fn recompute(&self) -> Result<(), ReconcileError> {
        let builder = PrefixSetBuilder::new(self.config.source_paths(), self.config.ips.clone());
        let set = builder.build();

        if set.is_empty() && self.store.exists() {
            warn!(
                "No routes parsed, keeping previous {}",
                self.store.path().display()
            );
            return Ok(());
        }

        self.store.save(&set)?;
        info!("Saved {} routes to {}", set.len(), self.store.path().display());
        Ok(())
    }

    /// Flush the table, reinstall the rule, then add every prefix
    fn apply(&self, set: &PrefixSet, device: &str) -> Result<ApplyReport, ReconcileError> {
        if let Err(e) = self.manager.flush_table(ROUTE_TABLE) {
            warn!("{} (continuing)", e);
        }

        self.remove_rule_if_present();
        self.manager
            .add_rule(ROUTE_TABLE, RULE_PRIORITY)
            .map_err(ReconcileError::RuleInstallError)?;
        debug!("Rule {}: from all lookup {}", RULE_PRIORITY, ROUTE_TABLE);

        let mut report = ApplyReport::default();
        for prefix in set {
            self.add_prefix(prefix, device, &mut report);
        }

        info!(
            "Applied {} routes via {} ({} failed, {} split)",
            report.applied, device, report.failed, report.split
        );
        Ok(report)
    }

    fn add_prefix(&self, prefix: &NetworkPrefix, device: &str, report: &mut ApplyReport) {
        match self.manager.add_route(ROUTE_TABLE, prefix, device) {
            Ok(()) => report.applied += 1,
            Err(e @ PlatformError::InvalidArgument { .. }) => match prefix.split_slash23() {
                Some((low, high)) => {
                    info!("{}; retrying as {} and {}", e, low, high);
                    report.split += 1;
                    for half in [low, high] {
                        match self.manager.add_route(ROUTE_TABLE, &half, device) {
                            Ok(()) => report.applied += 1,
                            Err(e) => {
                                warn!("{}", e);
                                report.failed += 1;
                            }
                        }
                    }
                }
                None => {
                    warn!("{}", e);
                    report.failed += 1;
                }
            },
            Err(e) => {
                warn!("{}", e);
                report.failed += 1;
            }
        }
    }

    fn remove_rule_if_present(&self) {
        let present = match self.manager.rule_exists(RULE_PRIORITY) {
            Ok(present) => present,
            Err(e) => {
                error!("{}; attempting removal anyway", e);
                true
            }
        };

        if !present {
            debug!("No rule at priority {}", RULE_PRIORITY);
            return;
        }

        if let Err(e) = self.manager.remove_rule(RULE_PRIORITY) {
            warn!("{} (continuing)", e);
        }
    }
}
