//! Storage
//!
//! Owns the registered pools and routes every path-based operation to the
//! pool serving the path's protocol.
//!
//! ## Responsibilities
//! - Keep protocol strings unique
//! - Resolve `protocol://remainder` to a pool (linear scan, pools are few)
//! - Forward filesystem-style operations with the protocol stripped
//! - Open streams bound to the resolved pool

use tracing::{debug, error};

use crate::config::{Config, PoolConfig};
use crate::error::{MelonError, Result};
use crate::stream::Stream;

use super::filesystem::FilesystemBackend;
use super::memory::MemoryBackend;
use super::void::VoidBackend;
use super::{split_path_into_parts, ObjectType, StoragePool, StreamFlags};

/// A set of pools keyed by protocol
#[derive(Debug, Default)]
pub struct Storage {
    /// Registered pools, in registration order
    pools: Vec<StoragePool>,
}

impl Storage {
    /// Create a storage with no pools
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a storage with every pool named in `config`
    ///
    /// Fails with `Config` if two pools share a protocol.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut storage = Self::new();

        for pool_config in &config.pools {
            let pool = match pool_config {
                PoolConfig::Filesystem {
                    protocol,
                    base_dir,
                    read_only,
                } => StoragePool::new(
                    protocol.clone(),
                    FilesystemBackend::new(base_dir, *read_only),
                ),
                PoolConfig::Void { protocol } => {
                    StoragePool::new(protocol.clone(), VoidBackend::new())
                }
                PoolConfig::Memory { protocol } => {
                    StoragePool::new(protocol.clone(), MemoryBackend::new())
                }
            };

            storage.add_pool(pool).map_err(|e| match e {
                MelonError::AlreadyExists(_) => MelonError::Config(format!(
                    "protocol '{}' configured more than once",
                    pool_config.protocol()
                )),
                other => other,
            })?;
        }

        Ok(storage)
    }

    // =========================================================================
    // Pool Management
    // =========================================================================

    /// Register `pool`; the storage takes ownership of it
    ///
    /// Fails with `AlreadyExists` if the protocol is taken. On failure the
    /// registered pools are unchanged.
    pub fn add_pool(&mut self, pool: StoragePool) -> Result<()> {
        if self.has_pool(pool.protocol()) {
            return Err(MelonError::AlreadyExists(format!(
                "pool for protocol '{}'",
                pool.protocol()
            )));
        }

        if let Err(e) = self.pools.try_reserve(1) {
            error!(protocol = pool.protocol(), "Allocation failed adding pool: {}", e);
            return Err(MelonError::AllocationFailed(format!(
                "pool list growth: {}",
                e
            )));
        }

        debug!(
            protocol = pool.protocol(),
            backend = pool.backend().kind(),
            "Registered storage pool"
        );
        self.pools.push(pool);

        Ok(())
    }

    /// Unregister the pool for `protocol` and hand it back
    pub fn remove_pool(&mut self, protocol: &str) -> Result<StoragePool> {
        let index = self.pool_index(protocol)?;
        let pool = self.pools.remove(index);
        debug!(protocol, "Removed storage pool");
        Ok(pool)
    }

    /// Get the pool registered for `protocol`
    pub fn get_pool(&self, protocol: &str) -> Result<&StoragePool> {
        let index = self.pool_index(protocol)?;
        Ok(&self.pools[index])
    }

    /// Check whether a pool is registered for `protocol`
    pub fn has_pool(&self, protocol: &str) -> bool {
        self.pools.iter().any(|pool| pool.protocol() == protocol)
    }

    /// Change the protocol a pool is reached by
    pub fn rename_pool(&mut self, old_protocol: &str, new_protocol: &str) -> Result<()> {
        let index = self.pool_index(old_protocol)?;

        if old_protocol != new_protocol && self.has_pool(new_protocol) {
            return Err(MelonError::AlreadyExists(format!(
                "pool for protocol '{}'",
                new_protocol
            )));
        }

        self.pools[index].set_protocol(new_protocol.to_string());
        debug!(from = old_protocol, to = new_protocol, "Renamed storage pool");

        Ok(())
    }

    /// Number of registered pools
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    /// Iterate pools in registration order
    pub fn pools(&self) -> impl Iterator<Item = &StoragePool> {
        self.pools.iter()
    }

    /// Get the pool serving `path`
    ///
    /// Fails with `InvalidPath` for a path without a protocol and with
    /// `NotFound` when no pool serves the protocol.
    pub fn pool_from_path(&self, path: &str) -> Result<&StoragePool> {
        self.resolve_path(path).map(|(pool, _)| pool)
    }

    // =========================================================================
    // Filesystem Operations
    // =========================================================================

    /// Delete the file (or empty folder) at `path`
    pub fn delete(&self, path: &str) -> Result<()> {
        let (pool, remainder) = self.resolve_path(path)?;
        pool.backend().delete(remainder)
    }

    /// Move `old_path` to `new_path`
    ///
    /// Both paths must use the same protocol; moving between pools fails with
    /// `NotSupported`.
    pub fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        let (old_protocol, _) = split_path_into_parts(old_path)?;
        let (new_protocol, new_remainder) = split_path_into_parts(new_path)?;

        if old_protocol != new_protocol {
            return Err(MelonError::NotSupported(format!(
                "rename across pools ('{}' -> '{}')",
                old_protocol, new_protocol
            )));
        }

        let (pool, old_remainder) = self.resolve_path(old_path)?;
        pool.backend().rename(old_remainder, new_remainder)
    }

    /// Create (or truncate) an empty file at `path`
    pub fn create_file(&self, path: &str) -> Result<()> {
        let (pool, remainder) = self.resolve_path(path)?;
        pool.backend().create_file(remainder)
    }

    /// Create a folder (and any parents) at `path`
    pub fn create_folder(&self, path: &str) -> Result<()> {
        let (pool, remainder) = self.resolve_path(path)?;
        pool.backend().create_folder(remainder)
    }

    /// Report what exists at `path`
    pub fn object_type(&self, path: &str) -> Result<ObjectType> {
        let (pool, remainder) = self.resolve_path(path)?;
        pool.backend().object_type(remainder)
    }

    /// Open a stream at `path`
    pub fn open(&self, path: &str, flags: StreamFlags) -> Result<Stream<'_>> {
        Stream::open(self, path, flags)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Resolve `path` to its pool and the protocol-free remainder
    pub(crate) fn resolve_path<'p>(&self, path: &'p str) -> Result<(&StoragePool, &'p str)> {
        let (protocol, remainder) = split_path_into_parts(path)?;
        let pool = self.get_pool(protocol)?;
        Ok((pool, remainder))
    }

    fn pool_index(&self, protocol: &str) -> Result<usize> {
        self.pools
            .iter()
            .position(|pool| pool.protocol() == protocol)
            .ok_or_else(|| MelonError::NotFound(format!("pool for protocol '{}'", protocol)))
    }
}
