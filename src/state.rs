//! Cached route list shared between `update` and `start`
//!
//! The file holds one CIDR per line with a trailing newline. It is rewritten
//! after every successful recompute and never removed, so `start` can apply
//! the last known routes without reparsing the route files.

use crate::routes::{PrefixSet, parse_cidr};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Routes file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to read routes file {path}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },
    #[error("Failed to write routes file {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },
}

pub struct RouteStore {
    path: PathBuf,
}

impl RouteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Overwrite the file with `set`, one CIDR per line
    ///
    /// An empty set still produces an (empty) file.
    pub fn save(&self, set: &PrefixSet) -> Result<(), StoreError> {
        let mut content = String::new();
        for prefix in set {
            content.push_str(&prefix.to_string());
            content.push('\n');
        }

        fs::write(&self.path, content).map_err(|source| StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved {} routes to {}", set.len(), self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<PrefixSet, StoreError> {
        let content = fs::read_to_string(&self.path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                StoreError::NotFound(self.path.clone())
            } else {
                StoreError::Unreadable {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;

        let set: PrefixSet = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter_map(|line| match parse_cidr(line) {
                Ok(prefix) => Some(prefix),
                Err(e) => {
                    warn!("Ignoring entry in {}: {}", self.path.display(), e);
                    None
                }
            })
            .collect();

        debug!("Loaded {} routes from {}", set.len(), self.path.display());
        Ok(set)
    }
}
