//! Holder of the current zone snapshot.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::{LoadOptions, Snapshot, ZoneError, load};

/// Configuration for a [`ZoneStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneStoreConfig {
    /// Zone table location (`http(s)://` URL, `file://` URL or path).
    pub source_url: String,
    /// Upper bound on one fetch attempt.
    pub timeout: Duration,
    /// Retries for transient HTTP failures.
    pub max_retries: u32,
}

impl ZoneStoreConfig {
    /// Creates a configuration with the default timeout and retry count.
    #[must_use]
    pub fn new(source_url: impl Into<String>) -> Self {
        let defaults = LoadOptions::default();
        Self {
            source_url: source_url.into(),
            timeout: defaults.timeout,
            max_retries: defaults.max_retries,
        }
    }

    /// Options for a single load against this source.
    #[must_use]
    pub const fn load_options(&self) -> LoadOptions {
        LoadOptions {
            timeout: self.timeout,
            max_retries: self.max_retries,
        }
    }
}

/// Owns the most recent successfully loaded [`Snapshot`].
///
/// Readers get a shared handle to a complete snapshot. A reload builds the
/// replacement off to the side and only then swaps the handle, so readers
/// observe either the old or the new snapshot, never a mix. A failed reload
/// leaves the previous snapshot in place.
#[derive(Debug)]
pub struct ZoneStore {
    config: ZoneStoreConfig,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl ZoneStore {
    /// Creates an empty store. Call [`Self::reload`] before reading.
    #[must_use]
    pub const fn new(config: ZoneStoreConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
        }
    }

    /// The store's configuration.
    #[must_use]
    pub const fn config(&self) -> &ZoneStoreConfig {
        &self.config
    }

    /// Returns the most recently loaded snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ZoneError::NotLoaded`] if no load has succeeded yet.
    pub fn current(&self) -> Result<Arc<Snapshot>, ZoneError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ZoneError::NotLoaded)
    }

    /// Loads the configured source and makes it the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns the load error; the previous snapshot, if any, stays current.
    pub async fn reload(&self) -> Result<Arc<Snapshot>, ZoneError> {
        let snapshot = match load(&self.config.source_url, &self.config.load_options()).await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                if self.has_snapshot() {
                    log::error!("Zone reload failed, keeping previous snapshot: {e}");
                } else {
                    log::error!("Initial zone load failed: {e}");
                }
                return Err(e);
            }
        };

        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&snapshot));

        match previous {
            Some(previous) => log::info!(
                "Replaced zone snapshot ({} -> {} zones)",
                previous.len(),
                snapshot.len()
            ),
            None => log::info!("Installed first zone snapshot ({} zones)", snapshot.len()),
        }

        Ok(snapshot)
    }

    fn has_snapshot(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
