//! Filesystem backend
//!
//! Maps `protocol://remainder` onto `{base_dir}/remainder` on the native
//! filesystem. Streams are plain `std::fs::File` handles opened in binary mode.
//!
//! ## Open modes
//! | Flags             | Behaviour                                  |
//! |-------------------|--------------------------------------------|
//! | READ              | existing file only                         |
//! | WRITE             | create, truncate                           |
//! | READ \| WRITE     | create if missing, keep contents           |
//! | APPEND (+ READ)   | create if missing, every write at the end  |
//! | none of the above | `NotSupported`                             |

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use tracing::trace;

use crate::error::{MelonError, Result};

use super::{ObjectType, PoolBackend, SeekBase, StoragePool, StreamContext, StreamFlags};

/// Create a filesystem pool rooted at `base_dir`
pub fn create_pool(protocol: impl Into<String>, base_dir: impl Into<PathBuf>) -> StoragePool {
    StoragePool::new(protocol, FilesystemBackend::new(base_dir, false))
}

/// Create a filesystem pool rooted at `base_dir` that rejects every mutation
pub fn create_read_only_pool(
    protocol: impl Into<String>,
    base_dir: impl Into<PathBuf>,
) -> StoragePool {
    StoragePool::new(protocol, FilesystemBackend::new(base_dir, true))
}

/// Files below a base directory
#[derive(Debug, Clone)]
pub struct FilesystemBackend {
    /// Directory every abstract path is resolved against
    base_dir: PathBuf,
    /// Reject writes, creation, renames and deletes
    read_only: bool,
}

impl FilesystemBackend {
    pub fn new(base_dir: impl Into<PathBuf>, read_only: bool) -> Self {
        Self {
            base_dir: base_dir.into(),
            read_only,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Native path for an abstract remainder
    ///
    /// Absolute paths and `..` components are rejected so a pool can never
    /// reach outside its base directory.
    fn real_path(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);

        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                _ => {
                    return Err(MelonError::InvalidPath(format!(
                        "'{}' escapes the pool base directory",
                        path
                    )))
                }
            }
        }

        Ok(self.base_dir.join(relative))
    }

    /// Native path for a remainder that must name something below the base
    ///
    /// Mutations never target the base directory itself.
    fn object_path(&self, path: &str) -> Result<PathBuf> {
        let real = self.real_path(path)?;

        let names_object = Path::new(path)
            .components()
            .any(|component| matches!(component, Component::Normal(_)));
        if !names_object {
            return Err(MelonError::InvalidPath(format!(
                "'{}' names the pool base directory",
                path
            )));
        }

        Ok(real)
    }

    fn ensure_writable(&self, operation: &str, path: &str) -> Result<()> {
        if self.read_only {
            return Err(MelonError::ReadOnly(format!("{} '{}'", operation, path)));
        }
        Ok(())
    }
}

impl PoolBackend for FilesystemBackend {
    fn kind(&self) -> &'static str {
        "filesystem"
    }

    fn create_file(&self, path: &str) -> Result<()> {
        self.ensure_writable("create file", path)?;
        let real = self.object_path(path)?;

        if real.is_dir() {
            return Err(MelonError::AlreadyExists(format!(
                "'{}' is a folder",
                path
            )));
        }

        create_parent_dirs(&real)?;
        File::create(&real)?;
        trace!(path = %real.display(), "Created file");

        Ok(())
    }

    fn create_folder(&self, path: &str) -> Result<()> {
        self.ensure_writable("create folder", path)?;
        let real = self.object_path(path)?;

        if real.is_file() {
            return Err(MelonError::AlreadyExists(format!("'{}' is a file", path)));
        }

        fs::create_dir_all(&real)?;
        trace!(path = %real.display(), "Created folder");

        Ok(())
    }

    fn object_type(&self, path: &str) -> Result<ObjectType> {
        let real = self.real_path(path)?;

        let metadata = match fs::symlink_metadata(&real) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ObjectType::None),
            Err(e) => return Err(e.into()),
        };

        let file_type = metadata.file_type();
        let object_type = if file_type.is_symlink() {
            ObjectType::Link
        } else if file_type.is_dir() {
            ObjectType::Folder
        } else if file_type.is_file() {
            ObjectType::File
        } else {
            ObjectType::Other
        };

        Ok(object_type)
    }

    fn rename(&self, old_path: &str, new_path: &str) -> Result<()> {
        self.ensure_writable("rename", old_path)?;
        let old_real = self.object_path(old_path)?;
        let new_real = self.object_path(new_path)?;

        create_parent_dirs(&new_real)?;
        fs::rename(&old_real, &new_real).map_err(|e| not_found_or_io(e, old_path))?;
        trace!(from = %old_real.display(), to = %new_real.display(), "Renamed");

        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.ensure_writable("delete", path)?;
        let real = self.object_path(path)?;

        let metadata = fs::symlink_metadata(&real).map_err(|e| not_found_or_io(e, path))?;
        if metadata.is_dir() {
            fs::remove_dir(&real)?;
        } else {
            fs::remove_file(&real)?;
        }
        trace!(path = %real.display(), "Deleted");

        Ok(())
    }

    fn open(&self, path: &str, flags: StreamFlags) -> Result<Box<dyn StreamContext>> {
        let read = flags.contains(StreamFlags::READ);
        let write = flags.contains(StreamFlags::WRITE);
        let append = flags.contains(StreamFlags::APPEND);

        if !(read || write || append) {
            return Err(MelonError::NotSupported(format!(
                "open '{}' with flags {:?}",
                path, flags
            )));
        }
        if write || append {
            self.ensure_writable("open for writing", path)?;
        }

        let real = self.object_path(path)?;

        let mut options = OpenOptions::new();
        options.read(read);
        if append {
            options.append(true).create(true);
        } else if write {
            // READ | WRITE keeps existing contents
            options.write(true).create(true).truncate(!read);
        }

        trace!(path = %real.display(), ?flags, "Opening file");

        let mut file = options.open(&real).map_err(|e| not_found_or_io(e, path))?;

        if flags.contains(StreamFlags::START_AT_END) {
            file.seek(SeekFrom::End(0))?;
        }

        Ok(Box::new(FileContext {
            file,
            writable: write || append,
        }))
    }
}

// =============================================================================
// Stream Context
// =============================================================================

/// An open native file
struct FileContext {
    file: File,
    writable: bool,
}

impl StreamContext for FileContext {
    fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
        self.file.read_exact(buffer)?;
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file.write_all(data)?;
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.file.stream_position()?)
    }

    fn set_position(&mut self, position: u64) -> Result<()> {
        self.file.seek(SeekFrom::Start(position))?;
        Ok(())
    }

    fn seek(&mut self, base: SeekBase, offset: i64) -> Result<()> {
        let target = match base {
            SeekBase::Relative => SeekFrom::Current(offset),
            SeekBase::End => SeekFrom::End(offset),
            SeekBase::Start => {
                if offset < 0 {
                    return Err(MelonError::OutOfRange(format!(
                        "seek to {} from start",
                        offset
                    )));
                }
                SeekFrom::Start(offset as u64)
            }
        };

        match self.file.seek(target) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Err(MelonError::OutOfRange(
                format!("seek {:?} {}: {}", base, offset, e),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        if self.writable {
            self.file.sync_all()?;
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn not_found_or_io(e: io::Error, path: &str) -> MelonError {
    if e.kind() == io::ErrorKind::NotFound {
        MelonError::NotFound(format!("'{}'", path))
    } else {
        MelonError::Io(e)
    }
}
