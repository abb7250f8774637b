//! Builds the prefix set from route files and configured CIDRs

use super::parser::{convert_mask_pair, parse_cidr, parse_route_line};
use super::{NetworkPrefix, PrefixSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub struct PrefixSetBuilder {
    sources: Vec<PathBuf>,
    extra_cidrs: Vec<String>,
}

impl PrefixSetBuilder {
    pub fn new(sources: Vec<PathBuf>, extra_cidrs: Vec<String>) -> Self {
        Self {
            sources,
            extra_cidrs,
        }
    }

    /// Collect prefixes from every source file, then from the extra CIDRs
    ///
    /// Unreadable files and unparsable entries are logged and skipped, so the
    /// result may be empty but building never fails.
    pub fn build(&self) -> PrefixSet {
        let mut prefixes: Vec<NetworkPrefix> = Vec::new();

        for path in &self.sources {
            match read_source(path) {
                Ok(found) => {
                    info!("Parsed {} routes from {}", found.len(), path.display());
                    prefixes.extend(found);
                }
                Err(e) => {
                    warn!("Skipping route file {}: {}", path.display(), e);
                }
            }
        }

        for cidr in &self.extra_cidrs {
            match parse_cidr(cidr) {
                Ok(prefix) => prefixes.push(prefix),
                Err(e) => warn!("Skipping configured network: {}", e),
            }
        }

        let set: PrefixSet = prefixes.into_iter().collect();
        debug!("Prefix set built with {} unique entries", set.len());
        set
    }
}

fn read_source(path: &Path) -> std::io::Result<Vec<NetworkPrefix>> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(parse_route_text(&content, path))
}

fn parse_route_text(content: &str, path: &Path) -> Vec<NetworkPrefix> {
    content
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let (ip, mask) = parse_route_line(line.trim())?;
            match convert_mask_pair(ip, mask) {
                Ok(prefix) => Some(prefix),
                Err(e) => {
                    warn!("{}:{}: {}", path.display(), idx + 1, e);
                    None
                }
            }
        })
        .collect()
}
