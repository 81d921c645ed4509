//! Void backend
//!
//! Accepts every operation and does nothing. Reads leave the caller's buffer
//! untouched, writes vanish, and every path reports `ObjectType::Remote`
//! since the backend cannot know what would be there.

use tracing::trace;

use crate::error::Result;

use super::{ObjectType, PoolBackend, SeekBase, StoragePool, StreamContext, StreamFlags};

/// Create a void pool
pub fn create_pool(protocol: impl Into<String>) -> StoragePool {
    StoragePool::new(protocol, VoidBackend::new())
}

#[derive(Debug, Default, Clone, Copy)]
pub struct VoidBackend;

impl VoidBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PoolBackend for VoidBackend {
    fn kind(&self) -> &'static str {
        "void"
    }

    fn create_file(&self, path: &str) -> Result<()> {
        trace!(path, "void: create file");
        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        trace!(path, "void: create folder");
        Ok(())
    }

    fn object_type(&self, path: &str) -> Result<ObjectType> {
        trace!(path, "void: object type");
        Ok(ObjectType::Remote)
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        trace!(from = old_path, to = new_path, "void: rename");
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        trace!(path, "void: delete");
        Ok(())
    }

    fn open(&self, path: &str, flags: StreamFlags) -> Result<Box<dyn StreamContext>> {
        trace!(path, ?flags, "void: open");
        Ok(Box::new(VoidContext))
    }
}

struct VoidContext;

impl StreamContext for VoidContext {
    fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
        trace!(bytes = buffer.len(), "void: read");
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        trace!(bytes = data.len(), "void: write");
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        trace!("void: position");
        Ok(0)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        trace!(position, "void: set position");
        Ok(())
    }

    fn seek(&mut self, base: SeekBase, offset: i64) -> Result<()> {
        trace!(?base, offset, "void: seek");
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        trace!("void: close");
        Ok(())
    }
}
