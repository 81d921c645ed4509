//! # Melon
//!
//! Dynamically-typed values, an insertion-ordered table keyed by them, and a
//! protocol-addressed storage layer the tables serialise through:
//! - `Value`: tagged datum (integers, floats, strings, arrays, tables, ...)
//! - `Table`: hash-indexed map that iterates in first-insertion order
//! - `Storage`: pools reached as `protocol://path` (filesystem, void, memory)
//! - `Stream`: open handle into one pool, closed exactly once
//! - `serialise`: little-endian binary format for value trees
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Value / Table                               │
//! │           (owned tree of dynamic values)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ encode / decode
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     serialise                                │
//! │          (magic + version header, tagged values)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ write_root / read_root
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Stream                                  │
//! │             (Open ──close──► Closed)                         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ "protocol://remainder"
//!                       ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Storage                                 │
//! │   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐    │
//! │   │  filesystem  │   │     void     │   │    memory    │    │
//! │   └──────────────┘   └──────────────┘   └──────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod serialise;
pub mod storage;
pub mod stream;
pub mod table;
pub mod value;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::{Config, PoolConfig};
pub use error::{MelonError, Result};
pub use storage::{ObjectType, SeekBase, Storage, StoragePool, StreamFlags};
pub use stream::Stream;
pub use table::Table;
pub use value::{Value, ValueType};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Melon
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
