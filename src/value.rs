//! Value Module
//!
//! A dynamically-typed datum: one of a fixed set of primitive and compound
//! types, owning or borrowing its payload depending on the variant.
//!
//! ## Ownership
//! - `String`: owns a heap copy of the text
//! - `StaticString`: borrows text that lives for the whole program
//! - `Array` / `Table`: own their elements, released recursively on drop
//! - `Pointer`: an opaque address, never dereferenced or released
//!
//! Releasing a value is `Drop`; ownership makes a double release impossible.

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::error::{MelonError, Result};
use crate::table::Table;

// =============================================================================
// Type Tags
// =============================================================================

/// Discriminant of a `Value`, carrying its 16-bit wire tag
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Nil = 0,
    Int8 = 1,
    UInt8 = 2,
    Int16 = 3,
    UInt16 = 4,
    Int32 = 5,
    UInt32 = 6,
    Int64 = 7,
    UInt64 = 8,
    Pointer = 9,
    Array = 10,
    Table = 11,
    String = 12,
    StaticString = 13,
    Float32 = 15,
    Float64 = 16,
    Bool = 17,
}

impl ValueType {
    /// Wire tag for this type
    pub fn tag(self) -> u16 {
        self as u16
    }

    /// Map a wire tag back to a type
    pub fn from_tag(tag: u16) -> Option<Self> {
        let ty = match tag {
            0 => ValueType::Nil,
            1 => ValueType::Int8,
            2 => ValueType::UInt8,
            3 => ValueType::Int16,
            4 => ValueType::UInt16,
            5 => ValueType::Int32,
            6 => ValueType::UInt32,
            7 => ValueType::Int64,
            8 => ValueType::UInt64,
            9 => ValueType::Pointer,
            10 => ValueType::Array,
            11 => ValueType::Table,
            12 => ValueType::String,
            13 => ValueType::StaticString,
            15 => ValueType::Float32,
            16 => ValueType::Float64,
            17 => ValueType::Bool,
            _ => return None,
        };
        Some(ty)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A tagged dynamically-typed value
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    /// Opaque address; the value never owns the referent
    Pointer(usize),
    /// Owned copy of the text
    String(String),
    /// Borrowed text, never released by the value
    StaticString(&'static str),
    Array(Vec<Value>),
    Table(Box<Table>),
}

impl Value {
    // -------------------------------------------------------------------------
    // Constructors
    // -------------------------------------------------------------------------

    pub fn nil() -> Self {
        Value::Nil
    }

    /// Create an owned string value holding a duplicate of `text`
    ///
    /// Fails with `AllocationFailed` if the duplicate cannot be allocated.
    pub fn string(text: &str) -> Result<Self> {
        let mut owned = String::new();
        owned.try_reserve_exact(text.len()).map_err(|e| {
            MelonError::AllocationFailed(format!(
                "string of {} bytes: {}",
                text.len(),
                e
            ))
        })?;
        owned.push_str(text);
        Ok(Value::String(owned))
    }

    /// Create a string value borrowing `text` without copying it
    pub fn static_string(text: &'static str) -> Self {
        Value::StaticString(text)
    }

    pub fn pointer(address: usize) -> Self {
        Value::Pointer(address)
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(items)
    }

    pub fn table(table: Table) -> Self {
        Value::Table(Box::new(table))
    }

    // -------------------------------------------------------------------------
    // Type Inspection
    // -------------------------------------------------------------------------

    /// Get the discriminant of this value
    pub fn get_type(&self) -> ValueType {
        match self {
            Value::Nil => ValueType::Nil,
            Value::Bool(_) => ValueType::Bool,
            Value::Int8(_) => ValueType::Int8,
            Value::UInt8(_) => ValueType::UInt8,
            Value::Int16(_) => ValueType::Int16,
            Value::UInt16(_) => ValueType::UInt16,
            Value::Int32(_) => ValueType::Int32,
            Value::UInt32(_) => ValueType::UInt32,
            Value::Int64(_) => ValueType::Int64,
            Value::UInt64(_) => ValueType::UInt64,
            Value::Float32(_) => ValueType::Float32,
            Value::Float64(_) => ValueType::Float64,
            Value::Pointer(_) => ValueType::Pointer,
            Value::String(_) => ValueType::String,
            Value::StaticString(_) => ValueType::StaticString,
            Value::Array(_) => ValueType::Array,
            Value::Table(_) => ValueType::Table,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// True when the value borrows its text instead of owning it
    pub fn is_static_string(&self) -> bool {
        matches!(self, Value::StaticString(_))
    }

    // -------------------------------------------------------------------------
    // Equality and Hashing
    // -------------------------------------------------------------------------

    /// Key equality
    ///
    /// - Different discriminants are never equal, except that `String` and
    ///   `StaticString` compare by content.
    /// - Integers, floats, bools and pointers compare bit-for-bit, so
    ///   `Int8(1)` and `UInt8(1)` differ and `NaN` equals an identical `NaN`.
    /// - Comparing two arrays or two tables fails with `NotImplemented`.
    pub fn equal(&self, other: &Value) -> Result<bool> {
        let equal = match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int8(a), Value::Int8(b)) => a == b,
            (Value::UInt8(a), Value::UInt8(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::UInt16(a), Value::UInt16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::UInt32(a), Value::UInt32(b)) => a == b,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::UInt64(a), Value::UInt64(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            (Value::Pointer(a), Value::Pointer(b)) => a == b,
            (Value::Array(_), Value::Array(_)) => {
                return Err(MelonError::NotImplemented(
                    "equality of array values".to_string(),
                ))
            }
            (Value::Table(_), Value::Table(_)) => {
                return Err(MelonError::NotImplemented(
                    "equality of table values".to_string(),
                ))
            }
            _ => match (self.as_str(), other.as_str()) {
                (Some(a), Some(b)) => a.as_bytes() == b.as_bytes(),
                _ => false,
            },
        };
        Ok(equal)
    }

    /// Stable hash of the payload
    ///
    /// Integers hash to themselves (sign-extended), floats to their bit
    /// pattern, strings to their DJB2 hash. Values equal under `equal` always
    /// hash the same. Arrays and tables fail with `NotImplemented`.
    pub fn hash_value(&self) -> Result<u64> {
        let hash = match self {
            Value::Nil => 0,
            Value::Bool(v) => *v as u64,
            Value::Int8(v) => *v as i64 as u64,
            Value::UInt8(v) => *v as u64,
            Value::Int16(v) => *v as i64 as u64,
            Value::UInt16(v) => *v as u64,
            Value::Int32(v) => *v as i64 as u64,
            Value::UInt32(v) => *v as u64,
            Value::Int64(v) => *v as u64,
            Value::UInt64(v) => *v,
            Value::Float32(v) => v.to_bits() as u64,
            Value::Float64(v) => v.to_bits(),
            Value::Pointer(v) => *v as u64,
            Value::String(v) => djb2(v.as_bytes()) as u64,
            Value::StaticString(v) => djb2(v.as_bytes()) as u64,
            Value::Array(_) => {
                return Err(MelonError::NotImplemented(
                    "hashing of array values".to_string(),
                ))
            }
            Value::Table(_) => {
                return Err(MelonError::NotImplemented(
                    "hashing of table values".to_string(),
                ))
            }
        };
        Ok(hash)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<i8> {
        match self {
            Value::Int8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            Value::UInt8(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<i16> {
        match self {
            Value::Int16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::UInt16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Int32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::UInt32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Float32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<usize> {
        match self {
            Value::Pointer(v) => Some(*v),
            _ => None,
        }
    }

    /// Text of either string variant
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v.as_str()),
            Value::StaticString(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(v) => Some(v.as_slice()),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Value::Table(v) => Some(v),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Nil
    }
}

// =============================================================================
// Conversions
// =============================================================================

macro_rules! impl_from_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

impl_from_scalar! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    &'static str => StaticString,
    Vec<Value> => Array,
}

impl From<Table> for Value {
    fn from(table: Table) -> Self {
        Value::table(table)
    }
}

// =============================================================================
// Serde Export
// =============================================================================

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            // Addresses mean nothing outside this process
            Value::Nil | Value::Pointer(_) => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int8(v) => serializer.serialize_i8(*v),
            Value::UInt8(v) => serializer.serialize_u8(*v),
            Value::Int16(v) => serializer.serialize_i16(*v),
            Value::UInt16(v) => serializer.serialize_u16(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::UInt32(v) => serializer.serialize_u32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::UInt64(v) => serializer.serialize_u64(*v),
            Value::Float32(v) => serializer.serialize_f32(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::StaticString(v) => serializer.serialize_str(v),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Table(table) => table.serialize(serializer),
        }
    }
}

// =============================================================================
// Hash Functions
// =============================================================================

/// DJB2 string hash: start at 5381, then `hash * 33 + byte` for every byte
pub fn djb2(bytes: &[u8]) -> u32 {
    bytes.iter().fold(5381u32, |hash, &b| {
        hash.wrapping_shl(5).wrapping_add(hash).wrapping_add(b as u32)
    })
}
