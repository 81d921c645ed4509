//! In-memory backend
//!
//! Files are named byte buffers kept in process memory; folders are a set of
//! names. Nothing survives the backend being dropped. Paths are normalised by
//! trimming leading and trailing `/`, and the empty path is the root folder.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::{MelonError, Result};

use super::{ObjectType, PoolBackend, SeekBase, StoragePool, StreamContext, StreamFlags};

/// Create an in-memory pool
pub fn create_pool(protocol: impl Into<String>) -> StoragePool {
    StoragePool::new(protocol, MemoryBackend::new())
}

type FileData = Arc<Mutex<Vec<u8>>>;

/// Byte buffers held in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    files: BTreeMap<String, FileData>,
    folders: BTreeSet<String>,
}

impl MemoryState {
    /// Register every ancestor folder of `path`
    ///
    /// Fails without changing anything when an ancestor is already a file.
    fn add_parents(&mut self, path: &str) -> Result<()> {
        let ancestors: Vec<&str> = path
            .match_indices('/')
            .map(|(end, _)| &path[..end])
            .collect();

        if let Some(file) = ancestors.iter().find(|a| self.files.contains_key(**a)) {
            return Err(MelonError::AlreadyExists(format!(
                "'{}' is a file, cannot hold '{}'",
                file, path
            )));
        }

        for ancestor in ancestors {
            self.folders.insert(ancestor.to_string());
        }
        Ok(())
    }

    fn object_type(&self, path: &str) -> ObjectType {
        if self.files.contains_key(path) {
            ObjectType::File
        } else if path.is_empty() || self.folders.contains(path) {
            ObjectType::Folder
        } else {
            ObjectType::None
        }
    }

    fn folder_has_children(&self, folder: &str) -> bool {
        let prefix = format!("{}/", folder);
        self.files.keys().any(|name| name.starts_with(&prefix))
            || self.folders.iter().any(|name| name.starts_with(&prefix))
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the bytes stored at `path`, if it is a file
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock();
        state
            .files
            .get(normalise(path))
            .map(|data| data.lock().clone())
    }

    /// Number of files held
    pub fn file_count(&self) -> usize {
        self.state.lock().files.len()
    }
}

fn normalise(path: &str) -> &str {
    path.trim_matches('/')
}

impl PoolBackend for MemoryBackend {
    fn kind(&self) -> &'static str {
        "memory"
    }

    fn create_file(&self, path: &str) -> Result<()> {
        let path = normalise(path);
        let mut state = self.state.lock();

        if state.object_type(path) == ObjectType::Folder {
            return Err(MelonError::AlreadyExists(format!("'{}' is a folder", path)));
        }

        state.add_parents(path)?;
        match state.files.get(path) {
            Some(data) => data.lock().clear(),
            None => {
                state.files.insert(path.to_string(), FileData::default());
            }
        }
        trace!(path, "Created memory file");

        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        let path = normalise(path);
        let mut state = self.state.lock();

        if state.object_type(path) == ObjectType::File {
            return Err(MelonError::AlreadyExists(format!("'{}' is a file", path)));
        }

        state.add_parents(path)?;
        if !path.is_empty() {
            state.folders.insert(path.to_string());
        }
        trace!(path, "Created memory folder");

        Ok(())
    }

    fn object_type(&self, path: &str) -> Result<ObjectType> {
        Ok(self.state.lock().object_type(normalise(path)))
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        let old_path = normalise(old_path);
        let new_path = normalise(new_path);
        let mut state = self.state.lock();

        match state.object_type(old_path) {
            ObjectType::File => {}
            ObjectType::None => return Err(MelonError::NotFound(format!("'{}'", old_path))),
            _ => {
                return Err(MelonError::NotSupported(format!(
                    "renaming folder '{}'",
                    old_path
                )))
            }
        }
        if state.object_type(new_path) == ObjectType::Folder {
            return Err(MelonError::AlreadyExists(format!("'{}' is a folder", new_path)));
        }

        state.add_parents(new_path)?;
        if let Some(data) = state.files.remove(old_path) {
            state.files.insert(new_path.to_string(), data);
        }
        trace!(from = old_path, to = new_path, "Renamed memory file");

        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let path = normalise(path);
        let mut state = self.state.lock();

        match state.object_type(path) {
            ObjectType::File => {
                state.files.remove(path);
            }
            ObjectType::Folder if path.is_empty() => {
                return Err(MelonError::NotSupported("deleting the root folder".to_string()))
            }
            ObjectType::Folder => {
                if state.folder_has_children(path) {
                    return Err(MelonError::NotSupported(format!(
                        "deleting non-empty folder '{}'",
                        path
                    )));
                }
                state.folders.remove(path);
            }
            _ => return Err(MelonError::NotFound(format!("'{}'", path))),
        }
        trace!(path, "Deleted memory object");

        Ok(())
    }

    fn open(&self, path: &str, flags: StreamFlags) -> Result<Box<dyn StreamContext>> {
        let path = normalise(path);
        let read = flags.contains(StreamFlags::READ);
        let write = flags.contains(StreamFlags::WRITE);
        let append = flags.contains(StreamFlags::APPEND);

        if !(read || write || append) {
            return Err(MelonError::NotSupported(format!(
                "open '{}' with flags {:?}",
                path, flags
            )));
        }

        let mut state = self.state.lock();

        if state.object_type(path) == ObjectType::Folder {
            return Err(MelonError::NotSupported(format!("'{}' is a folder", path)));
        }

        let data = match state.files.get(path) {
            Some(data) => {
                if write && !read && !append {
                    data.lock().clear();
                }
                Arc::clone(data)
            }
            None if write || append => {
                state.add_parents(path)?;
                let data = FileData::default();
                state.files.insert(path.to_string(), Arc::clone(&data));
                data
            }
            None => return Err(MelonError::NotFound(format!("'{}'", path))),
        };

        let position = if flags.contains(StreamFlags::START_AT_END) {
            data.lock().len() as u64
        } else {
            0
        };

        trace!(path, ?flags, "Opened memory file");

        Ok(Box::new(MemoryContext {
            data,
            position,
            readable: read,
            writable: write || append,
            append,
        }))
    }
}

// =============================================================================
// Stream Context
// =============================================================================

/// Cursor over one in-memory file
struct MemoryContext {
    data: FileData,
    position: u64,
    readable: bool,
    writable: bool,
    append: bool,
}

impl StreamContext for MemoryContext {
    fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
        if !self.readable {
            return Err(MelonError::NotSupported(
                "read from a stream opened without READ".to_string(),
            ));
        }

        let data = self.data.lock();
        let start = usize::try_from(self.position).unwrap_or(usize::MAX);
        let end = start.saturating_add(buffer.len());

        if end > data.len() {
            return Err(MelonError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("read of {} bytes at {} past end {}", buffer.len(), start, data.len()),
            )));
        }

        buffer.copy_from_slice(&data[start..end]);
        self.position = end as u64;

        Ok(())
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(MelonError::NotSupported(
                "write to a stream opened without WRITE".to_string(),
            ));
        }

        let mut data = self.data.lock();
        if self.append {
            self.position = data.len() as u64;
        }

        let span = usize::try_from(self.position)
            .ok()
            .and_then(|start| start.checked_add(bytes.len()).map(|end| (start, end)));
        let (start, end) = span.ok_or_else(|| {
            MelonError::OutOfRange(format!(
                "write of {} bytes at {}",
                bytes.len(),
                self.position
            ))
        })?;

        if end > data.len() {
            let len = data.len();
            data.try_reserve(end - len).map_err(|e| {
                MelonError::AllocationFailed(format!("growing memory file to {}: {}", end, e))
            })?;
            data.resize(end, 0);
        }
        data[start..end].copy_from_slice(bytes);
        self.position = end as u64;

        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.position)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.position = position;
        Ok(())
    }

    fn seek(&mut self, base: SeekBase, offset: i64) -> Result<()> {
        let origin = match base {
            SeekBase::Relative => self.position as i128,
            SeekBase::Start => 0,
            SeekBase::End => self.data.lock().len() as i128,
        };

        let target = origin + offset as i128;
        if target < 0 || target > u64::MAX as i128 {
            return Err(MelonError::OutOfRange(format!(
                "seek {:?} {} lands at {}",
                base, offset, target
            )));
        }

        self.position = target as u64;
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
