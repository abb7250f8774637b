//! Network prefixes and the ordered prefix set routed through the VPN
//!
//! Prefixes come from two places: legacy `route ADD ... MASK ...` lines in the
//! mirrored route files, and CIDR literals listed in the configuration.

pub mod builder;
pub mod parser;

pub use builder::PrefixSetBuilder;
pub use parser::{ParseError, convert_mask_pair, parse_cidr, parse_route_line};

use ipnetwork::Ipv4Network;
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv4Addr;

/// An IPv4 network in `address/length` form
///
/// The address is kept exactly as it was given; host bits are not masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkPrefix(Ipv4Network);

impl NetworkPrefix {
    /// Returns `None` when `length` is larger than 32
    pub fn new(address: Ipv4Addr, length: u8) -> Option<Self> {
        Ipv4Network::new(address, length).ok().map(Self)
    }

    pub fn address(&self) -> Ipv4Addr {
        self.0.ip()
    }

    pub fn length(&self) -> u8 {
        self.0.prefix()
    }

    /// Split a /23 into the two /24 networks it is made of
    ///
    /// The first half keeps the address as written, the second is the same
    /// address advanced by 256 (third octet plus one, carrying into the second
    /// octet). Returns `None` for any other length, or when the second half
    /// would run past 255.255.255.255.
    pub fn split_slash23(&self) -> Option<(NetworkPrefix, NetworkPrefix)> {
        if self.length() != 23 {
            return None;
        }
        let next = u32::from(self.address()).checked_add(256)?;
        Some((
            Self::new(self.address(), 24)?,
            Self::new(Ipv4Addr::from(next), 24)?,
        ))
    }
}

impl fmt::Display for NetworkPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ordered, duplicate-free collection of prefixes
///
/// The first occurrence of a prefix decides its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixSet {
    prefixes: Vec<NetworkPrefix>,
}

impl PrefixSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.prefixes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    /// CIDR strings in set order
    pub fn to_strings(&self) -> Vec<String> {
        self.prefixes.iter().map(ToString::to_string).collect()
    }
}

impl FromIterator<NetworkPrefix> for PrefixSet {
    fn from_iter<I: IntoIterator<Item = NetworkPrefix>>(iter: I) -> Self {
        let mut seen = HashSet::new();
        let prefixes = iter.into_iter().filter(|p| seen.insert(*p)).collect();
        Self { prefixes }
    }
}

impl<'a> IntoIterator for &'a PrefixSet {
    type Item = &'a NetworkPrefix;
    type IntoIter = std::slice::Iter<'a, NetworkPrefix>;

    fn into_iter(self) -> Self::IntoIter {
        self.prefixes.iter()
    }
}
