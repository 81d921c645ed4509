//! Storage Module
//!
//! Protocol-addressed storage: a `Storage` holds named pools, each backed by
//! an implementation of the `PoolBackend` capability set.
//!
//! ## Responsibilities
//! - Register pools under unique protocol strings
//! - Resolve `protocol://remainder` paths to the pool serving them
//! - Dispatch filesystem-style operations to the resolved pool's backend
//! - Open streams through the backend's `open` capability
//!
//! ## Dispatch
//! ```text
//!   "fs://save/slot1.bin"
//!          │
//!          ▼
//!   split_path_into_parts ──► ("fs", "save/slot1.bin")
//!          │
//!          ▼
//!   Storage.pools ── linear scan by protocol ──► StoragePool "fs"
//!                                                     │
//!                                                     ▼
//!                                    backend.open / delete / rename / ...
//!                                         (remainder only, no protocol)
//! ```
//!
//! ## Backends
//! - `filesystem`: files below a base directory
//! - `void`: accepts everything, does nothing
//! - `memory`: byte buffers held in process memory

mod default;
mod manager;
mod path;
mod pool;

pub mod filesystem;
pub mod memory;
pub mod void;

use bitflags::bitflags;

pub use default::{default_storage, default_storage_mut, resolve, set_default, StorageRef};
pub use manager::Storage;
pub use path::{split_path_into_parts, PROTOCOL_SEPARATOR};
pub use pool::{PoolBackend, StoragePool, StreamContext};

// =============================================================================
// Shared Types (used by every backend)
// =============================================================================

/// Kind of object found at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Nothing exists at the path
    None,
    File,
    Folder,
    /// Symbolic link to a file or folder
    Link,
    /// The backend does not know; the object lives elsewhere
    Remote,
    /// Anything else (devices, sockets, ...)
    Other,
}

/// Origin of a seek offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekBase {
    /// From the current position
    Relative,
    /// From the start of the stream
    Start,
    /// From the end of the stream
    End,
}

bitflags! {
    /// How a stream is opened
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StreamFlags: u32 {
        /// Allow reads
        const READ = 1 << 0;
        /// Allow writes; truncates unless combined with READ
        const WRITE = 1 << 1;
        /// Every write goes to the end of the stream
        const APPEND = 1 << 2;
        /// Start positioned at the end instead of the beginning
        const START_AT_END = 1 << 3;
    }
}
