//! Model file lookup.
//!
//! # Search Order
//! 1. Local models directory
//! 2. Shared model directory (user cache by default)
//! 3. `models/` under each ancestor of the base directory, up to a fixed depth
//!
//! Lookups are read-only `is_file` checks, safe to run concurrently.

use std::path::PathBuf;

use crate::config::ModelsConfig;

/// Finds model files on disk.
#[derive(Debug, Clone)]
pub struct ModelLocator {
    local_dir: PathBuf,
    shared_dir: Option<PathBuf>,
    base_dir: PathBuf,
    ancestor_depth: usize,
}

impl ModelLocator {
    pub fn new(
        local_dir: impl Into<PathBuf>,
        shared_dir: Option<PathBuf>,
        base_dir: impl Into<PathBuf>,
        ancestor_depth: usize,
    ) -> Self {
        Self {
            local_dir: local_dir.into(),
            shared_dir,
            base_dir: base_dir.into(),
            ancestor_depth,
        }
    }

    /// Build a locator from configuration, resolving the default shared directory.
    pub fn from_config(config: &ModelsConfig) -> Self {
        let shared_dir = config
            .shared_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|dir| dir.join("imgops").join("models")));

        Self::new(
            config.local_dir.clone(),
            shared_dir,
            config.base_dir.clone(),
            config.ancestor_depth,
        )
    }

    /// Candidate paths for `filename`, in search order.
    pub fn candidates(&self, filename: &str) -> Vec<PathBuf> {
        let mut paths = vec![self.local_dir.join(filename)];

        if let Some(shared) = &self.shared_dir {
            paths.push(shared.join(filename));
        }

        paths.extend(
            self.base_dir
                .ancestors()
                .skip(1)
                .take(self.ancestor_depth)
                .map(|dir| dir.join("models").join(filename)),
        );

        paths
    }

    /// Locate `filename`, returning the first existing candidate.
    pub fn locate(&self, filename: &str) -> Option<PathBuf> {
        let found = self.candidates(filename).into_iter().find(|p| p.is_file());

        match &found {
            Some(path) => {
                tracing::debug!(model = filename, path = %path.display(), "Model located")
            }
            None => tracing::debug!(model = filename, "Model not found in any search location"),
        }

        found
    }
}
