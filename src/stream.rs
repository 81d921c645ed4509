//! Stream Module
//!
//! An open handle to a byte resource inside one pool.
//!
//! ## State machine
//! ```text
//!   Stream::open ──► Open ──close()──► Closed
//!                     │                   │
//!          read/write/seek/...      any operation ──► InvalidState
//!                     │
//!                  drop ──► implicit close (failure logged)
//! ```
//!
//! The stream borrows its `Storage`, so no pool can be removed while a
//! stream into it is alive.

use tracing::{debug, trace, warn};

use crate::error::{MelonError, Result};
use crate::storage::{SeekBase, Storage, StoragePool, StreamContext, StreamFlags};

/// Generates little-endian `write_*` / `read_*` pairs for fixed-width types
macro_rules! typed_io {
    ($($write:ident, $read:ident => $ty:ty;)*) => {
        $(
            #[doc = concat!("Write a little-endian `", stringify!($ty), "`")]
            pub fn $write(&mut self, value: $ty) -> Result<()> {
                self.write(&value.to_le_bytes())
            }

            #[doc = concat!("Read a little-endian `", stringify!($ty), "`")]
            pub fn $read(&mut self) -> Result<$ty> {
                let mut buffer = [0u8; std::mem::size_of::<$ty>()];
                self.read(&mut buffer)?;
                Ok(<$ty>::from_le_bytes(buffer))
            }
        )*
    };
}

/// Handle to an open (or closed) resource
pub struct Stream<'s> {
    storage: &'s Storage,
    pool: &'s StoragePool,
    path: String,
    /// `None` once closed
    context: Option<Box<dyn StreamContext>>,
}

impl<'s> Stream<'s> {
    /// Open `path` in `storage`
    ///
    /// Resolves the pool from the path's protocol and asks its backend for a
    /// stream context.
    pub fn open(storage: &'s Storage, path: &str, flags: StreamFlags) -> Result<Self> {
        let (pool, remainder) = storage.resolve_path(path)?;
        let context = pool.backend().open(remainder, flags)?;

        debug!(path, ?flags, backend = pool.backend().kind(), "Opened stream");

        Ok(Self {
            storage,
            pool,
            path: path.to_string(),
            context: Some(context),
        })
    }

    pub fn is_open(&self) -> bool {
        self.context.is_some()
    }

    /// Close the stream
    ///
    /// The backend context is released exactly once; closing again fails
    /// with `InvalidState`.
    pub fn close(&mut self) -> Result<()> {
        let context = self.context.take().ok_or_else(|| {
            MelonError::InvalidState(format!("stream '{}' is already closed", self.path))
        })?;

        debug!(path = %self.path, "Closing stream");
        context.close()
    }

    // =========================================================================
    // Primitives
    // =========================================================================

    /// Fill `buffer` completely
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<()> {
        trace!(path = %self.path, len = buffer.len(), "read");
        self.context()?.read(buffer)
    }

    /// Write all of `data`
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        trace!(path = %self.path, len = data.len(), "write");
        self.context()?.write(data)
    }

    pub fn position(&mut self) -> Result<u64> {
        trace!(path = %self.path, "position");
        self.context()?.position()
    }

    pub fn set_position(&mut self, position: u64) -> Result<()> {
        trace!(path = %self.path, position, "set_position");
        self.context()?.set_position(position)
    }

    pub fn seek(&mut self, base: SeekBase, offset: i64) -> Result<()> {
        trace!(path = %self.path, ?base, offset, "seek");
        self.context()?.seek(base, offset)
    }

    // =========================================================================
    // Derived Operations
    // =========================================================================

    /// Total length of the resource in bytes
    ///
    /// The current position is restored afterwards. Errors from any step are
    /// returned rather than reported as a zero length.
    pub fn length(&mut self) -> Result<u64> {
        let saved = self.position()?;
        self.seek(SeekBase::End, 0)?;
        let length = self.position()?;
        self.set_position(saved)?;
        Ok(length)
    }

    /// Read everything from the current position to the end
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let length = self.length()?;
        let position = self.position()?;
        let remaining = length.saturating_sub(position);

        let remaining = usize::try_from(remaining).map_err(|_| {
            MelonError::AllocationFailed(format!("{} bytes do not fit in memory", remaining))
        })?;

        let mut buffer = Vec::new();
        buffer.try_reserve_exact(remaining).map_err(|e| {
            MelonError::AllocationFailed(format!("read buffer of {} bytes: {}", remaining, e))
        })?;
        buffer.resize(remaining, 0);

        self.read(&mut buffer)?;
        Ok(buffer)
    }

    /// Write the bytes of `text` (no length, no terminator)
    pub fn write_str(&mut self, text: &str) -> Result<()> {
        self.write(text.as_bytes())
    }

    typed_io! {
        write_u8, read_u8 => u8;
        write_i8, read_i8 => i8;
        write_u16, read_u16 => u16;
        write_i16, read_i16 => i16;
        write_u32, read_u32 => u32;
        write_i32, read_i32 => i32;
        write_u64, read_u64 => u64;
        write_i64, read_i64 => i64;
        write_f32, read_f32 => f32;
        write_f64, read_f64 => f64;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn storage(&self) -> &'s Storage {
        self.storage
    }

    /// Pool the stream was resolved to
    pub fn pool(&self) -> &'s StoragePool {
        self.pool
    }

    /// Full path the stream was opened with, protocol included
    pub fn path(&self) -> &str {
        &self.path
    }

    fn context(&mut self) -> Result<&mut Box<dyn StreamContext>> {
        let path = &self.path;
        self.context
            .as_mut()
            .ok_or_else(|| MelonError::InvalidState(format!("stream '{}' is closed", path)))
    }
}

impl Drop for Stream<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            debug!(path = %self.path, "Closing stream on drop");
            if let Err(e) = context.close() {
                warn!(path = %self.path, "Failed to close stream on drop: {}", e);
            }
        }
    }
}

impl std::fmt::Debug for Stream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stream")
            .field("path", &self.path)
            .field("pool", &self.pool.protocol())
            .field("open", &self.is_open())
            .finish()
    }
}
