//! Tests for Value
//!
//! These tests verify:
//! - Constructors and type tags
//! - Equality across discriminants (String vs StaticString)
//! - Hashing consistency with equality
//! - Ownership: cloned and dropped values stay independent

use melon::value::djb2;
use melon::{MelonError, Table, Value, ValueType};

// =============================================================================
// Helper Functions
// =============================================================================

fn one_of_each() -> Vec<Value> {
    vec![
        Value::nil(),
        Value::from(true),
        Value::from(-3i8),
        Value::from(3u8),
        Value::from(-300i16),
        Value::from(300u16),
        Value::from(-70_000i32),
        Value::from(70_000u32),
        Value::from(-5_000_000_000i64),
        Value::from(5_000_000_000u64),
        Value::from(1.5f32),
        Value::from(2.25f64),
        Value::pointer(0x1000),
        Value::string("owned").unwrap(),
        Value::static_string("borrowed"),
    ]
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_get_type_matches_constructor() {
    let types: Vec<ValueType> = one_of_each().iter().map(Value::get_type).collect();

    assert_eq!(
        types,
        vec![
            ValueType::Nil,
            ValueType::Bool,
            ValueType::Int8,
            ValueType::UInt8,
            ValueType::Int16,
            ValueType::UInt16,
            ValueType::Int32,
            ValueType::UInt32,
            ValueType::Int64,
            ValueType::UInt64,
            ValueType::Float32,
            ValueType::Float64,
            ValueType::Pointer,
            ValueType::String,
            ValueType::StaticString,
        ]
    );
}

#[test]
fn test_wire_tags() {
    assert_eq!(ValueType::Nil.tag(), 0);
    assert_eq!(ValueType::Pointer.tag(), 9);
    assert_eq!(ValueType::Table.tag(), 11);
    assert_eq!(ValueType::String.tag(), 12);
    assert_eq!(ValueType::Float32.tag(), 15);
    assert_eq!(ValueType::Bool.tag(), 17);

    assert_eq!(ValueType::from_tag(16), Some(ValueType::Float64));
    assert_eq!(ValueType::from_tag(14), None);
    assert_eq!(ValueType::from_tag(18), None);
}

#[test]
fn test_string_duplicates_input() {
    let mut source = String::from("canyon");
    let value = Value::string(&source).unwrap();

    source.push_str("-changed");

    assert_eq!(value.as_str(), Some("canyon"));
    assert!(!value.is_static_string());
}

#[test]
fn test_static_string_borrows() {
    static TEXT: &str = "stage";
    let value = Value::static_string(TEXT);

    assert!(value.is_static_string());
    assert!(std::ptr::eq(value.as_str().unwrap(), TEXT));
}

#[test]
fn test_from_conversions() {
    assert_eq!(Value::from(7i32).as_i32(), Some(7));
    assert_eq!(Value::from(String::from("x")).get_type(), ValueType::String);
    assert_eq!(Value::from("x").get_type(), ValueType::StaticString);
    assert_eq!(Value::default().get_type(), ValueType::Nil);

    let array = Value::from(vec![Value::from(1u8), Value::from(2u8)]);
    assert_eq!(array.as_array().map(|items| items.len()), Some(2));

    let table = Value::from(Table::new());
    assert!(table.as_table().unwrap().is_empty());
}

#[test]
fn test_accessors_reject_other_types() {
    let value = Value::from(1u32);

    assert_eq!(value.as_u32(), Some(1));
    assert_eq!(value.as_i32(), None);
    assert_eq!(value.as_str(), None);
    assert!(value.as_table().is_none());
}

// =============================================================================
// Equality Tests
// =============================================================================

#[test]
fn test_different_discriminants_never_equal() {
    let values = one_of_each();

    for (i, a) in values.iter().enumerate() {
        for (j, b) in values.iter().enumerate() {
            let same_kind = i == j || (a.as_str().is_some() && b.as_str().is_some());
            if !same_kind {
                assert!(!a.equal(b).unwrap(), "{:?} should differ from {:?}", a, b);
            }
        }
    }
}

#[test]
fn test_every_value_equals_itself() {
    for value in one_of_each() {
        assert!(value.equal(&value.clone()).unwrap(), "{:?}", value);
    }
}

#[test]
fn test_same_number_different_width_differs() {
    assert!(!Value::from(1i8).equal(&Value::from(1u8)).unwrap());
    assert!(!Value::from(1i32).equal(&Value::from(1i64)).unwrap());
}

#[test]
fn test_owned_and_static_strings_compare_by_content() {
    let owned = Value::string("assets").unwrap();
    let borrowed = Value::static_string("assets");

    assert!(owned.equal(&borrowed).unwrap());
    assert!(borrowed.equal(&owned).unwrap());
    assert!(!owned.equal(&Value::static_string("asset")).unwrap());
}

#[test]
fn test_float_equality_is_bitwise() {
    let nan = Value::from(f64::NAN);
    assert!(nan.equal(&nan.clone()).unwrap());

    assert!(!Value::from(0.0f32).equal(&Value::from(-0.0f32)).unwrap());
}

#[test]
fn test_container_equality_not_implemented() {
    let a = Value::array(vec![]);
    let b = Value::array(vec![]);
    assert!(matches!(a.equal(&b), Err(MelonError::NotImplemented(_))));

    let t1 = Value::table(Table::new());
    let t2 = Value::table(Table::new());
    assert!(matches!(t1.equal(&t2), Err(MelonError::NotImplemented(_))));

    // Different discriminants are decided without looking inside
    assert!(!a.equal(&t1).unwrap());
}

// =============================================================================
// Hash Tests
// =============================================================================

#[test]
fn test_djb2_known_values() {
    assert_eq!(djb2(b""), 5381);
    assert_eq!(djb2(b"a"), 5381 * 33 + 97);
}

#[test]
fn test_integer_hash_is_identity() {
    assert_eq!(Value::from(42u32).hash_value().unwrap(), 42);
    assert_eq!(Value::from(-1i64).hash_value().unwrap(), u64::MAX);
    assert_eq!(Value::from(-1i8).hash_value().unwrap(), u64::MAX);
}

#[test]
fn test_equal_strings_hash_equal() {
    let owned = Value::string("stage/canyon.xml").unwrap();
    let borrowed = Value::static_string("stage/canyon.xml");

    assert_eq!(owned.hash_value().unwrap(), borrowed.hash_value().unwrap());
    assert_eq!(owned.hash_value().unwrap(), djb2(b"stage/canyon.xml") as u64);
}

#[test]
fn test_container_hash_not_implemented() {
    assert!(matches!(
        Value::array(vec![]).hash_value(),
        Err(MelonError::NotImplemented(_))
    ));
    assert!(matches!(
        Value::table(Table::new()).hash_value(),
        Err(MelonError::NotImplemented(_))
    ));
}

// =============================================================================
// Ownership Tests
// =============================================================================

#[test]
fn test_clone_is_independent() {
    let mut inner = Table::new();
    inner.set(Value::from("k"), Value::from(1i32)).unwrap();
    let original = Value::table(inner);

    let mut copy = original.clone();
    copy.as_table_mut()
        .unwrap()
        .set(Value::from("k"), Value::from(2i32))
        .unwrap();
    drop(copy);

    let table = original.as_table().unwrap();
    assert_eq!(table.get(Value::from("k")).unwrap().as_i32(), Some(1));
}

#[test]
fn test_rebuild_after_drop() {
    for _ in 0..100 {
        let value = Value::string("scratch").unwrap();
        drop(value);
    }
    assert_eq!(Value::string("scratch").unwrap().as_str(), Some("scratch"));
}
