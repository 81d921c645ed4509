//! Root files: header + one value, read and written through streams

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::config::Config;
use crate::error::{MelonError, Result};
use crate::storage::{resolve, Storage, StreamFlags};
use crate::stream::Stream;
use crate::value::Value;

use super::codec::{decode_value, encode_value, DecodeLimits};
use super::{HEADER_SIZE, MAGIC};

/// Encode `value` and write it at the stream's current position
pub fn write_value(stream: &mut Stream<'_>, value: &Value) -> Result<()> {
    let mut buf = BytesMut::new();
    encode_value(value, &mut buf);
    stream.write(&buf)
}

/// Header plus encoded `value`, as stored in a root file
pub fn encode_root(value: &Value, config: &Config) -> BytesMut {
    let (major, minor) = config.format_version;

    let mut buf = BytesMut::with_capacity(HEADER_SIZE);
    buf.put_u32_le(MAGIC);
    buf.put_u16_le(major);
    buf.put_u16_le(minor);
    encode_value(value, &mut buf);

    buf
}

/// Parse a complete root file
///
/// Fails with `Serialization` on a bad magic number, a major version other
/// than the config's, a malformed value, or bytes left after the value.
pub fn decode_root(mut bytes: Bytes, config: &Config) -> Result<Value> {
    if bytes.remaining() < HEADER_SIZE {
        return Err(MelonError::Serialization(format!(
            "file of {} bytes is shorter than the header",
            bytes.remaining()
        )));
    }

    let magic = bytes.get_u32_le();
    if magic != MAGIC {
        return Err(MelonError::Serialization(format!(
            "bad magic number {:#010x}",
            magic
        )));
    }

    let major = bytes.get_u16_le();
    let minor = bytes.get_u16_le();
    if major != config.format_version.0 {
        return Err(MelonError::Serialization(format!(
            "unsupported format version {}.{} (expected major {})",
            major, minor, config.format_version.0
        )));
    }

    let value = decode_value(&mut bytes, &DecodeLimits::from(config))?;

    if bytes.has_remaining() {
        return Err(MelonError::Serialization(format!(
            "{} trailing bytes after root value",
            bytes.remaining()
        )));
    }

    Ok(value)
}

/// Write `value` as a root file at `path`
///
/// `storage` falls back to the process-wide default when `None`. The stream
/// is closed on every path; a write error is reported ahead of a close error.
pub fn write_root(
    storage: Option<&Storage>,
    path: &str,
    value: &Value,
    config: &Config,
) -> Result<()> {
    let storage = resolve(storage);
    let mut stream = storage.open(path, StreamFlags::WRITE)?;

    let buf = encode_root(value, config);
    let written = stream.write(&buf);
    let closed = stream.close();

    written?;
    closed?;

    debug!(path, bytes = buf.len(), "Wrote root file");
    Ok(())
}

/// Read the root file at `path`
///
/// `storage` falls back to the process-wide default when `None`.
pub fn read_root(storage: Option<&Storage>, path: &str, config: &Config) -> Result<Value> {
    let storage = resolve(storage);
    let mut stream = storage.open(path, StreamFlags::READ)?;

    let read = stream.read_to_end();
    let closed = stream.close();

    let contents = read?;
    closed?;

    debug!(path, bytes = contents.len(), "Read root file");
    decode_root(Bytes::from(contents), config)
}
