//! Storage pools and the backend capability traits.

use std::fmt;

use crate::error::Result;

use super::{ObjectType, SeekBase, StreamFlags};

/// Capability set every pool backend implements
///
/// Paths handed to a backend have the protocol already removed
/// (`"fs://a/b.txt"` arrives as `"a/b.txt"`). The backend owns whatever
/// configuration it needs (base directory, buffers, ...).
pub trait PoolBackend: Send + Sync {
    /// Short name of the backend class, for logs
    fn kind(&self) -> &'static str;

    /// Create (or truncate) an empty file, creating parent folders as needed
    fn create_file(&self, path: &str) -> Result<()>;

    /// Create a folder and any missing parents; existing folders are fine
    fn create_folder(&self, path: &str) -> Result<()>;

    /// Report what exists at `path`
    fn object_type(&self, path: &str) -> Result<ObjectType>;

    /// Move `old_path` to `new_path`, overwriting the destination
    fn rename(&self, old_path: &str, new_path: &str) -> Result<()>;

    /// Delete the file (or empty folder) at `path`
    fn delete(&self, path: &str) -> Result<()>;

    /// Open a stream context for `path`
    fn open(&self, path: &str, flags: StreamFlags) -> Result<Box<dyn StreamContext>>;
}

/// Backend-specific state of one open stream
pub trait StreamContext: Send {
    /// Fill `buffer` completely or fail
    fn read(&mut self, buffer: &mut [u8]) -> Result<()>;

    /// Write all of `data` or fail
    fn write(&mut self, data: &[u8]) -> Result<()>;

    fn position(&mut self) -> Result<u64>;

    fn set_position(&mut self, position: u64) -> Result<()>;

    fn seek(&mut self, base: SeekBase, offset: i64) -> Result<()>;

    /// Release the context; called exactly once per opened stream
    fn close(self: Box<Self>) -> Result<()>;
}

/// A backend registered under a protocol string
pub struct StoragePool {
    protocol: String,
    backend: Box<dyn PoolBackend>,
}

impl StoragePool {
    /// Wrap `backend` so it can be reached as `protocol://...`
    pub fn new(protocol: impl Into<String>, backend: impl PoolBackend + 'static) -> Self {
        Self {
            protocol: protocol.into(),
            backend: Box::new(backend),
        }
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn backend(&self) -> &dyn PoolBackend {
        self.backend.as_ref()
    }

    pub(super) fn set_protocol(&mut self, protocol: String) {
        self.protocol = protocol;
    }
}

impl fmt::Debug for StoragePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoragePool")
            .field("protocol", &self.protocol)
            .field("backend", &self.backend.kind())
            .finish()
    }
}
