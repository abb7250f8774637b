//! Synchronization of the route-file checkout

use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to run git: {0}")]
    SpawnError(#[from] std::io::Error),
    #[error("git pull failed in {dir}: {message}")]
    PullFailed { dir: String, message: String },
}

pub trait SourceSync {
    fn sync(&self, repo_dir: &Path) -> Result<(), SyncError>;
}

/// Fast-forwards the checkout with `git pull`
pub struct GitSync;

impl SourceSync for GitSync {
    fn sync(&self, repo_dir: &Path) -> Result<(), SyncError> {
        info!("Pulling route files in {}", repo_dir.display());
        let output = Command::new("git")
            .arg("-C")
            .arg(repo_dir)
            .arg("pull")
            .output()?;

        if !output.status.success() {
            let mut message = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if message.is_empty() {
                message = String::from_utf8_lossy(&output.stdout).trim().to_string();
            }
            return Err(SyncError::PullFailed {
                dir: repo_dir.display().to_string(),
                message,
            });
        }

        info!("git: {}", String::from_utf8_lossy(&output.stdout).trim());
        Ok(())
    }
}
