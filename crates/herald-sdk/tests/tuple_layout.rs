//! Integration tests for dynamic tuple layout

use herald_sdk::{align_up, DynamicTuple, Mut, Name, TypeRegistry};
use proptest::prelude::*;

#[derive(Debug, Clone, PartialEq)]
enum Packed {
    Bool(bool),
    Byte(u8),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
}

impl Packed {
    fn layout(&self) -> (usize, usize) {
        match self {
            Packed::Bool(_) => (1, 1),
            Packed::Byte(_) => (1, 1),
            Packed::Int(_) => (4, 4),
            Packed::Long(_) => (8, 8),
            Packed::Float(_) => (4, 4),
            Packed::Double(_) => (8, 8),
            Packed::Str(_) => (
                std::mem::size_of::<String>(),
                std::mem::align_of::<String>(),
            ),
        }
    }

    fn push(&self, tuple: &mut DynamicTuple) {
        match self {
            Packed::Bool(v) => tuple.push(v),
            Packed::Byte(v) => tuple.push(v),
            Packed::Int(v) => tuple.push(v),
            Packed::Long(v) => tuple.push(v),
            Packed::Float(v) => tuple.push(v),
            Packed::Double(v) => tuple.push(v),
            Packed::Str(v) => tuple.push(v),
        }
    }

    fn read(&self, tuple: &DynamicTuple, index: usize) -> Option<Packed> {
        match self {
            Packed::Bool(_) => tuple.get::<bool>(index).copied().map(Packed::Bool),
            Packed::Byte(_) => tuple.get::<u8>(index).copied().map(Packed::Byte),
            Packed::Int(_) => tuple.get::<i32>(index).copied().map(Packed::Int),
            Packed::Long(_) => tuple.get::<i64>(index).copied().map(Packed::Long),
            Packed::Float(_) => tuple.get::<f32>(index).copied().map(Packed::Float),
            Packed::Double(_) => tuple.get::<f64>(index).copied().map(Packed::Double),
            Packed::Str(_) => tuple.get::<String>(index).cloned().map(Packed::Str),
        }
    }
}

fn value_strategy() -> impl Strategy<Value = Packed> {
    prop_oneof![
        any::<bool>().prop_map(Packed::Bool),
        any::<u8>().prop_map(Packed::Byte),
        any::<i32>().prop_map(Packed::Int),
        any::<i64>().prop_map(Packed::Long),
        (-1.0e6f32..1.0e6f32).prop_map(Packed::Float),
        (-1.0e12f64..1.0e12f64).prop_map(Packed::Double),
        "[a-z]{0,16}".prop_map(Packed::Str),
    ]
}

proptest! {
    #[test]
    fn test_offsets_follow_alignment_law(values in prop::collection::vec(value_strategy(), 0..24)) {
        let mut tuple = DynamicTuple::new();
        for value in &values {
            value.push(&mut tuple);
        }

        let mut end = 0;
        for (index, value) in values.iter().enumerate() {
            let (size, align) = value.layout();
            let expected = align_up(end, align);
            prop_assert_eq!(tuple.offset(index), Some(expected));
            end = expected + size;
        }
        prop_assert_eq!(tuple.byte_len(), end);
    }

    #[test]
    fn test_values_read_back(values in prop::collection::vec(value_strategy(), 0..24)) {
        let mut tuple = DynamicTuple::new();
        for value in &values {
            value.push(&mut tuple);
        }
        for (index, value) in values.iter().enumerate() {
            prop_assert_eq!(value.read(&tuple, index), Some(value.clone()));
        }

        tuple.clear();
        prop_assert!(tuple.is_empty());
        prop_assert_eq!(tuple.byte_len(), 0);
    }
}

#[test]
fn test_mixed_argument_pack() {
    let types = TypeRegistry::new();
    let args = (
        true,
        Mut::new(false),
        String::from("name"),
        Mut::new(String::from("ref")),
        vec![1.0f32, 2.0],
        Name::new("Tag"),
    );
    let tuple = DynamicTuple::pack(&args, &types);

    assert_eq!(tuple.len(), 6);
    assert_eq!(
        tuple.signature().name(),
        "bool, bool, String, String, Vec<f32>, Name"
    );
    assert_eq!(tuple.offset(1), Some(1));
    assert_eq!(tuple.offset(2), Some(8));
    assert_eq!(tuple.value::<Mut<String>>(3).map(|v| v.get()), Some("ref".to_string()));
    assert_eq!(tuple.value::<Name>(5), Some(Name::new("Tag")));
}

#[test]
fn test_reuse_after_clear() {
    let mut tuple = DynamicTuple::new();
    tuple.push(&1.5f64);
    tuple.push(&String::from("a"));
    tuple.clear();

    tuple.push(&true);
    tuple.push(&9i32);
    assert_eq!(tuple.offset(1), Some(4));
    assert_eq!(tuple.get::<i32>(1), Some(&9));
    assert_eq!(tuple.signature().name(), "bool, i32");
}
