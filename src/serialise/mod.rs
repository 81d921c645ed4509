//! Serialise Module
//!
//! Binary encoding of `Value` trees and the root file format built on it.
//!
//! ## File Format
//! ```text
//! ┌──────────────┬─────────────┬─────────────┬──────────────────────┐
//! │ Magic (4)    │ Major (2)   │ Minor (2)   │ Root value           │
//! │ 0xFC991E51   │             │             │                      │
//! └──────────────┴─────────────┴─────────────┴──────────────────────┘
//! ```
//!
//! ## Value Format
//! ```text
//! ┌──────────┬──────────────────────────────────────────────┐
//! │ Tag (2)  │ Payload                                      │
//! └──────────┴──────────────────────────────────────────────┘
//! ```
//! - Nil: empty
//! - Bool / Int8 / UInt8: 1 byte
//! - Int16 / UInt16: 2 bytes
//! - Int32 / UInt32 / Float32: 4 bytes
//! - Int64 / UInt64 / Float64: 8 bytes
//! - String: byte length (8) + UTF-8 bytes
//! - Array: count (8) + count values
//! - Table: count (8) + count (key value) pairs
//!
//! Every integer is little-endian. Static strings are written as strings and
//! pointers as nil, so tags 9 and 13 never appear in a file.

mod codec;
mod file;

pub use codec::{decode_value, encode_value, DecodeLimits};
pub use file::{decode_root, encode_root, read_root, write_root, write_value};

/// First four bytes of every serialised file
pub const MAGIC: u32 = 0xFC99_1E51;

/// Version written when the config does not say otherwise (major, minor)
pub const FORMAT_VERSION: (u16, u16) = (1, 0);

/// Size of the magic + version header
pub const HEADER_SIZE: usize = 8;
