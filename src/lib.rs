//! vpn-router - Policy routing of selected networks through a VPN interface
//!
//! Networks are collected from route files kept in a git checkout (legacy
//! `route ADD <ip> MASK <mask>` batch lines) plus CIDRs listed in the config,
//! and installed into a dedicated kernel routing table that a policy rule
//! consults before the main table.
//!
//! # Architecture
//!
//! - `config`: Configuration file handling (YAML)
//! - `routes`: Route line parsing and prefix set building
//! - `state`: Cached route list between `update` and `start`
//! - `platform`: Policy-routing primitives (Linux `ip rule` / `ip route`)
//! - `source`: Route file checkout sync (git)
//! - `reconciler`: The update/start/stop/status actions
//!
//! # Usage
//!
//! ```bash
//! vpn-router update-repo   # git pull, reparse, apply
//! vpn-router start         # apply the cached route list
//! vpn-router stop          # flush table and remove the rule
//! ```

pub mod config;
pub mod platform;
pub mod reconciler;
pub mod routes;
pub mod source;
pub mod state;

pub use config::Config;
pub use reconciler::{ApplyReport, ReconcileError, Reconciler, StatusReport, UpdateOutcome};
pub use routes::{NetworkPrefix, PrefixSet};
pub use state::RouteStore;
