//! Value codec
//!
//! Encoding never fails. Decoding checks every length against the bytes
//! actually left in the buffer before allocating or reading.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::config::Config;
use crate::error::{MelonError, Result};
use crate::table::Table;
use crate::value::{Value, ValueType};

/// Size of a type tag on the wire
const TAG_SIZE: usize = 2;

/// Bounds the decoder enforces on untrusted input
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    /// Deepest array/table nesting accepted
    pub max_depth: usize,
    /// Longest string accepted, in bytes
    pub max_string_length: u64,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DecodeLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_depth: config.max_nesting_depth,
            max_string_length: config.max_string_length,
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Append the encoding of `value` to `buf`
pub fn encode_value(value: &Value, buf: &mut BytesMut) {
    match value {
        Value::Nil | Value::Pointer(_) => buf.put_u16_le(ValueType::Nil.tag()),
        Value::Bool(v) => {
            buf.put_u16_le(ValueType::Bool.tag());
            buf.put_u8(*v as u8);
        }
        Value::Int8(v) => {
            buf.put_u16_le(ValueType::Int8.tag());
            buf.put_i8(*v);
        }
        Value::UInt8(v) => {
            buf.put_u16_le(ValueType::UInt8.tag());
            buf.put_u8(*v);
        }
        Value::Int16(v) => {
            buf.put_u16_le(ValueType::Int16.tag());
            buf.put_i16_le(*v);
        }
        Value::UInt16(v) => {
            buf.put_u16_le(ValueType::UInt16.tag());
            buf.put_u16_le(*v);
        }
        Value::Int32(v) => {
            buf.put_u16_le(ValueType::Int32.tag());
            buf.put_i32_le(*v);
        }
        Value::UInt32(v) => {
            buf.put_u16_le(ValueType::UInt32.tag());
            buf.put_u32_le(*v);
        }
        Value::Int64(v) => {
            buf.put_u16_le(ValueType::Int64.tag());
            buf.put_i64_le(*v);
        }
        Value::UInt64(v) => {
            buf.put_u16_le(ValueType::UInt64.tag());
            buf.put_u64_le(*v);
        }
        Value::Float32(v) => {
            buf.put_u16_le(ValueType::Float32.tag());
            buf.put_f32_le(*v);
        }
        Value::Float64(v) => {
            buf.put_u16_le(ValueType::Float64.tag());
            buf.put_f64_le(*v);
        }
        Value::String(text) => encode_string(text, buf),
        Value::StaticString(text) => encode_string(text, buf),
        Value::Array(items) => {
            buf.put_u16_le(ValueType::Array.tag());
            buf.put_u64_le(items.len() as u64);
            for item in items {
                encode_value(item, buf);
            }
        }
        Value::Table(table) => {
            buf.put_u16_le(ValueType::Table.tag());
            buf.put_u64_le(table.len() as u64);
            for (key, value) in table.iter() {
                encode_value(key, buf);
                encode_value(value, buf);
            }
        }
    }
}

fn encode_string(text: &str, buf: &mut BytesMut) {
    buf.put_u16_le(ValueType::String.tag());
    buf.put_u64_le(text.len() as u64);
    buf.put_slice(text.as_bytes());
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode one value from the front of `buf`, advancing past it
pub fn decode_value(buf: &mut Bytes, limits: &DecodeLimits) -> Result<Value> {
    decode_at_depth(buf, limits, 0)
}

fn decode_at_depth(buf: &mut Bytes, limits: &DecodeLimits, depth: usize) -> Result<Value> {
    ensure_remaining(buf, TAG_SIZE, "type tag")?;
    let tag = buf.get_u16_le();

    let ty = ValueType::from_tag(tag)
        .ok_or_else(|| MelonError::Serialization(format!("unknown type tag {}", tag)))?;

    let value = match ty {
        ValueType::Nil => Value::Nil,
        ValueType::Bool => {
            ensure_remaining(buf, 1, "bool")?;
            match buf.get_u8() {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => {
                    return Err(MelonError::Serialization(format!(
                        "invalid bool byte {}",
                        other
                    )))
                }
            }
        }
        ValueType::Int8 => {
            ensure_remaining(buf, 1, "int8")?;
            Value::Int8(buf.get_i8())
        }
        ValueType::UInt8 => {
            ensure_remaining(buf, 1, "uint8")?;
            Value::UInt8(buf.get_u8())
        }
        ValueType::Int16 => {
            ensure_remaining(buf, 2, "int16")?;
            Value::Int16(buf.get_i16_le())
        }
        ValueType::UInt16 => {
            ensure_remaining(buf, 2, "uint16")?;
            Value::UInt16(buf.get_u16_le())
        }
        ValueType::Int32 => {
            ensure_remaining(buf, 4, "int32")?;
            Value::Int32(buf.get_i32_le())
        }
        ValueType::UInt32 => {
            ensure_remaining(buf, 4, "uint32")?;
            Value::UInt32(buf.get_u32_le())
        }
        ValueType::Int64 => {
            ensure_remaining(buf, 8, "int64")?;
            Value::Int64(buf.get_i64_le())
        }
        ValueType::UInt64 => {
            ensure_remaining(buf, 8, "uint64")?;
            Value::UInt64(buf.get_u64_le())
        }
        ValueType::Float32 => {
            ensure_remaining(buf, 4, "float32")?;
            Value::Float32(buf.get_f32_le())
        }
        ValueType::Float64 => {
            ensure_remaining(buf, 8, "float64")?;
            Value::Float64(buf.get_f64_le())
        }
        ValueType::String => decode_string(buf, limits)?,
        ValueType::Array => {
            let depth = enter_container(depth, limits)?;
            let count = decode_count(buf, TAG_SIZE, "array")?;

            let mut items = Vec::new();
            items.try_reserve_exact(count).map_err(|e| {
                MelonError::AllocationFailed(format!("array of {} values: {}", count, e))
            })?;
            for _ in 0..count {
                items.push(decode_at_depth(buf, limits, depth)?);
            }
            Value::Array(items)
        }
        ValueType::Table => {
            let depth = enter_container(depth, limits)?;
            let count = decode_count(buf, 2 * TAG_SIZE, "table")?;

            let mut table = Table::new();
            for _ in 0..count {
                let key = decode_at_depth(buf, limits, depth)?;
                let value = decode_at_depth(buf, limits, depth)?;
                insert_decoded(&mut table, key, value)?;
            }
            Value::table(table)
        }
        ValueType::Pointer | ValueType::StaticString => {
            return Err(MelonError::Serialization(format!(
                "type tag {} ({:?}) is never written",
                tag, ty
            )))
        }
    };

    Ok(value)
}

fn decode_string(buf: &mut Bytes, limits: &DecodeLimits) -> Result<Value> {
    ensure_remaining(buf, 8, "string length")?;
    let length = buf.get_u64_le();

    if length > limits.max_string_length {
        return Err(MelonError::Serialization(format!(
            "string of {} bytes exceeds limit of {}",
            length, limits.max_string_length
        )));
    }
    let length = usize::try_from(length)
        .map_err(|_| MelonError::Serialization(format!("string length {} too large", length)))?;
    ensure_remaining(buf, length, "string bytes")?;

    let bytes = buf.split_to(length);
    let text = std::str::from_utf8(&bytes)
        .map_err(|e| MelonError::Serialization(format!("string is not UTF-8: {}", e)))?;

    Value::string(text)
}

/// Read an element count and reject counts the remaining bytes cannot hold
fn decode_count(buf: &mut Bytes, min_element_size: usize, what: &str) -> Result<usize> {
    ensure_remaining(buf, 8, "element count")?;
    let count = buf.get_u64_le();

    let max_possible = (buf.remaining() / min_element_size) as u64;
    if count > max_possible {
        return Err(MelonError::Serialization(format!(
            "{} claims {} elements but only {} bytes remain",
            what,
            count,
            buf.remaining()
        )));
    }

    Ok(count as usize)
}

fn enter_container(depth: usize, limits: &DecodeLimits) -> Result<usize> {
    let depth = depth + 1;
    if depth > limits.max_depth {
        return Err(MelonError::Serialization(format!(
            "nesting deeper than {} levels",
            limits.max_depth
        )));
    }
    Ok(depth)
}

fn insert_decoded(table: &mut Table, key: Value, value: Value) -> Result<()> {
    match table.contains_key(&key) {
        Ok(false) => table.set(key, value),
        Ok(true) => Err(MelonError::Serialization(format!(
            "duplicate table key {:?}",
            key
        ))),
        Err(_) => Err(MelonError::Serialization(format!(
            "table key of type {:?} cannot be hashed",
            key.get_type()
        ))),
    }
}

fn ensure_remaining(buf: &Bytes, needed: usize, what: &str) -> Result<()> {
    if buf.remaining() < needed {
        return Err(MelonError::Serialization(format!(
            "truncated {}: need {} bytes, {} remain",
            what,
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}
