//! Configuration for Melon
//!
//! Describes which storage pools to mount and the limits the binary codec
//! enforces while decoding.

use std::path::PathBuf;

use crate::serialise::FORMAT_VERSION;

/// Main configuration for a Melon storage setup
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Pools registered by `Storage::from_config`, in order
    pub pools: Vec<PoolConfig>,

    // -------------------------------------------------------------------------
    // Codec Configuration
    // -------------------------------------------------------------------------
    /// Deepest table/array nesting the decoder accepts
    pub max_nesting_depth: usize,

    /// Longest string (in bytes) the decoder accepts
    pub max_string_length: u64,

    /// Version tag written into serialised files (major, minor)
    pub format_version: (u16, u16),
}

/// One pool to mount, keyed by its protocol
#[derive(Debug, Clone)]
pub enum PoolConfig {
    /// Files under a directory on the native filesystem
    Filesystem {
        protocol: String,
        base_dir: PathBuf,
        read_only: bool,
    },

    /// Accepts every operation and does nothing
    Void { protocol: String },

    /// Byte buffers held in process memory
    Memory { protocol: String },
}

impl PoolConfig {
    /// Protocol string this pool is reached by
    pub fn protocol(&self) -> &str {
        match self {
            PoolConfig::Filesystem { protocol, .. } => protocol,
            PoolConfig::Void { protocol } => protocol,
            PoolConfig::Memory { protocol } => protocol,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pools: Vec::new(),
            max_nesting_depth: 64,
            max_string_length: 16 * 1024 * 1024, // 16 MB
            format_version: FORMAT_VERSION,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Mount a filesystem pool rooted at `base_dir`
    pub fn filesystem_pool(mut self, protocol: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        self.config.pools.push(PoolConfig::Filesystem {
            protocol: protocol.into(),
            base_dir: base_dir.into(),
            read_only: false,
        });
        self
    }

    /// Mount a filesystem pool that rejects every mutation
    pub fn read_only_filesystem_pool(
        mut self,
        protocol: impl Into<String>,
        base_dir: impl Into<PathBuf>,
    ) -> Self {
        self.config.pools.push(PoolConfig::Filesystem {
            protocol: protocol.into(),
            base_dir: base_dir.into(),
            read_only: true,
        });
        self
    }

    /// Mount a void pool
    pub fn void_pool(mut self, protocol: impl Into<String>) -> Self {
        self.config.pools.push(PoolConfig::Void {
            protocol: protocol.into(),
        });
        self
    }

    /// Mount an in-memory pool
    pub fn memory_pool(mut self, protocol: impl Into<String>) -> Self {
        self.config.pools.push(PoolConfig::Memory {
            protocol: protocol.into(),
        });
        self
    }

    /// Set the decoder nesting limit
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.config.max_nesting_depth = depth;
        self
    }

    /// Set the decoder string length limit (in bytes)
    pub fn max_string_length(mut self, length: u64) -> Self {
        self.config.max_string_length = length;
        self
    }

    /// Set the version tag written into serialised files
    pub fn format_version(mut self, major: u16, minor: u16) -> Self {
        self.config.format_version = (major, minor);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
