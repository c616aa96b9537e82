// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use arc_swap::ArcSwap;
use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::vite::Manifest;

/// Failed to load a Vite manifest
#[derive(Debug, Error)]
pub enum LoadError {
    /// There is no file at the manifest path
    #[error("could not find the Vite manifest at {path:?}")]
    NotFound {
        /// The path which was tried
        path: Utf8PathBuf,
    },

    /// The file exists but could not be read
    #[error("failed to read the Vite manifest at {path:?}")]
    Read {
        /// The path which was tried
        path: Utf8PathBuf,

        /// The underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid Vite manifest
    #[error("invalid Vite manifest at {path:?}")]
    Parse {
        /// The path of the manifest
        path: Utf8PathBuf,

        /// The underlying error
        #[source]
        source: serde_json::Error,
    },
}

/// Somewhere manifests can be loaded from, keyed by their path
pub trait ManifestStore: std::fmt::Debug + Send + Sync {
    /// Load the manifest at the given path
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest is missing or invalid
    fn load(&self, path: &Utf8Path) -> Result<Arc<Manifest>, LoadError>;

    /// Forget any cached copy of the manifest at the given path, so that the
    /// next [`ManifestStore::load`] reads it again
    fn invalidate(&self, path: &Utf8Path);
}

/// A [`ManifestStore`] reading manifests from the filesystem.
///
/// Each manifest is read once and cached until it is invalidated. Concurrent
/// first loads of the same path may both read the file, in which case the
/// last one to finish wins. Only fully parsed manifests end up in the cache.
///
/// A load which was already reading when [`ManifestStore::invalidate`] was
/// called returns what it read but does not cache it, so the next load reads
/// the file again.
#[derive(Debug)]
pub struct FsManifestStore {
    cache: ArcSwap<HashMap<Utf8PathBuf, Arc<Manifest>>>,

    /// Bumped on every invalidation
    generation: AtomicU64,
}

impl Default for FsManifestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FsManifestStore {
    /// Create a store with an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: ArcSwap::from_pointee(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn read(path: &Utf8Path) -> Result<Manifest, LoadError> {
        let raw = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LoadError::NotFound {
                    path: path.to_owned(),
                }
            } else {
                LoadError::Read {
                    path: path.to_owned(),
                    source,
                }
            }
        })?;

        Manifest::from_slice(&raw).map_err(|source| LoadError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Cache a manifest read while the store was at the given generation,
    /// unless an invalidation happened since
    fn publish(&self, path: &Utf8Path, manifest: &Arc<Manifest>, generation: u64) {
        self.cache.rcu(|cache| {
            let mut cache = HashMap::clone(cache);
            if self.generation.load(Ordering::Acquire) == generation {
                cache.insert(path.to_owned(), Arc::clone(manifest));
            } else {
                debug!("Store was invalidated during the load, not caching the manifest");
            }
            cache
        });
    }
}

impl ManifestStore for FsManifestStore {
    #[tracing::instrument(name = "manifest.load", skip_all, fields(%path))]
    fn load(&self, path: &Utf8Path) -> Result<Arc<Manifest>, LoadError> {
        if let Some(manifest) = self.cache.load().get(path) {
            return Ok(Arc::clone(manifest));
        }

        let generation = self.generation.load(Ordering::Acquire);
        let manifest = Arc::new(Self::read(path)?);
        debug!(chunks = manifest.len(), "Loaded Vite manifest from disk");

        self.publish(path, &manifest, generation);
        Ok(manifest)
    }

    #[tracing::instrument(name = "manifest.invalidate", skip_all, fields(%path))]
    fn invalidate(&self, path: &Utf8Path) {
        // Bumped before removing, so that loads in flight don't cache what
        // they read
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.cache.rcu(|cache| {
            let mut cache = HashMap::clone(cache);
            cache.remove(path);
            cache
        });
    }
}

/// A [`ManifestStore`] serving manifests from memory.
///
/// Useful when the manifest is embedded in the binary, and in tests. It also
/// counts how many times it was asked for a manifest.
#[derive(Debug, Default)]
pub struct StaticManifestStore {
    manifests: HashMap<Utf8PathBuf, Arc<Manifest>>,
    loads: AtomicUsize,
}

impl StaticManifestStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve the given manifest at the given path
    #[must_use]
    pub fn with_manifest(mut self, path: impl Into<Utf8PathBuf>, manifest: Manifest) -> Self {
        self.manifests.insert(path.into(), Arc::new(manifest));
        self
    }

    /// How many times [`ManifestStore::load`] was called on this store
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl ManifestStore for StaticManifestStore {
    fn load(&self, path: &Utf8Path) -> Result<Arc<Manifest>, LoadError> {
        self.loads.fetch_add(1, Ordering::Relaxed);
        self.manifests
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: path.to_owned(),
            })
    }

    fn invalidate(&self, _path: &Utf8Path) {}
}
