//! Recording routing manager for tests

use super::{PlatformError, RoutingManager};
use crate::routes::NetworkPrefix;
use std::cell::RefCell;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FlushTable(u32),
    RuleExists(u32),
    AddRule(u32, u32),
    RemoveRule(u32),
    AddRoute(u32, String, String),
}

#[derive(Default)]
pub struct MockRoutingManager {
    pub calls: RefCell<Vec<Call>>,
    pub up_interfaces: HashSet<String>,
    pub rule_present: RefCell<bool>,
    pub fail_flush: bool,
    pub fail_add_rule: bool,
    pub fail_remove_rule: bool,
    pub fail_query: bool,
    /// Routes the kernel rejects as an invalid argument
    pub invalid_routes: HashSet<String>,
    /// Routes that fail for any other reason
    pub failing_routes: HashSet<String>,
}

impl MockRoutingManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface_up(mut self, name: &str) -> Self {
        self.up_interfaces.insert(name.to_string());
        self
    }

    pub fn with_rule_present(self) -> Self {
        *self.rule_present.borrow_mut() = true;
        self
    }

    pub fn rejecting_invalid(mut self, cidr: &str) -> Self {
        self.invalid_routes.insert(cidr.to_string());
        self
    }

    pub fn failing_route(mut self, cidr: &str) -> Self {
        self.failing_routes.insert(cidr.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Destinations of every `add_route` attempt, in order
    pub fn route_attempts(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::AddRoute(_, cidr, _) => Some(cidr.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl RoutingManager for MockRoutingManager {
    fn flush_table(&self, table: u32) -> Result<(), PlatformError> {
        self.record(Call::FlushTable(table));
        if self.fail_flush {
            return Err(PlatformError::FlushError("mock flush failure".to_string()));
        }
        Ok(())
    }

    fn rule_exists(&self, priority: u32) -> Result<bool, PlatformError> {
        self.record(Call::RuleExists(priority));
        if self.fail_query {
            return Err(PlatformError::QueryError("mock query failure".to_string()));
        }
        Ok(*self.rule_present.borrow())
    }

    fn add_rule(&self, table: u32, priority: u32) -> Result<(), PlatformError> {
        self.record(Call::AddRule(table, priority));
        if self.fail_add_rule {
            return Err(PlatformError::AddRuleError("mock rule failure".to_string()));
        }
        *self.rule_present.borrow_mut() = true;
        Ok(())
    }

    fn remove_rule(&self, priority: u32) -> Result<(), PlatformError> {
        self.record(Call::RemoveRule(priority));
        if self.fail_remove_rule {
            return Err(PlatformError::DeleteRuleError("mock delete failure".to_string()));
        }
        *self.rule_present.borrow_mut() = false;
        Ok(())
    }

    fn add_route(
        &self,
        table: u32,
        destination: &NetworkPrefix,
        device: &str,
    ) -> Result<(), PlatformError> {
        let cidr = destination.to_string();
        self.record(Call::AddRoute(table, cidr.clone(), device.to_string()));
        if self.invalid_routes.contains(&cidr) {
            return Err(PlatformError::InvalidArgument {
                destination: cidr,
                message: "Invalid argument".to_string(),
            });
        }
        if self.failing_routes.contains(&cidr) {
            return Err(PlatformError::AddRouteError(format!("{}: File exists", cidr)));
        }
        Ok(())
    }

    fn interface_is_up(&self, name: &str) -> bool {
        self.up_interfaces.contains(name)
    }

    fn list_rules(&self) -> Result<String, PlatformError> {
        if self.fail_query {
            return Err(PlatformError::QueryError("mock query failure".to_string()));
        }
        let mut out = String::from("0:\tfrom all lookup local\n");
        if *self.rule_present.borrow() {
            out.push_str("1995:\tfrom all lookup 1000\n");
        }
        Ok(out)
    }

    fn list_routes(&self, _table: u32) -> Result<String, PlatformError> {
        if self.fail_query {
            return Err(PlatformError::QueryError("mock query failure".to_string()));
        }
        Ok(String::new())
    }
}
