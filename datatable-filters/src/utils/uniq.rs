//! Order-preserving set algebra over structurally compared values.
//!
//! `uniq` buckets values by a structural xxh3 hash and only runs the full
//! deep comparison inside a bucket, so it stays near-linear on large datasets
//! while remaining exact when two different values collide.

use std::collections::HashMap;
use std::hash::Hasher;

use serde_json::Value;
use xxhash_rust::xxh3::Xxh3;

use crate::types::ColumnOption;

/// Structural equality plus a hash consistent with it.
///
/// Two values that are `deep_eq` must feed identical bytes to the hasher.
pub trait DeepEq {
    fn deep_eq(&self, other: &Self) -> bool;
    fn deep_hash<H: Hasher>(&self, state: &mut H);
}

/// `===`-style equality: primitives by value, compound values by identity.
pub trait StrictEq {
    fn strict_eq(&self, other: &Self) -> bool;
}

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_NUMBER: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_ARRAY: u8 = 4;
const TAG_OBJECT: u8 = 5;

fn hash_f64<H: Hasher>(n: f64, state: &mut H) {
    state.write_u8(TAG_NUMBER);
    // 0.0 and -0.0 compare equal, and every NaN is treated as the same value
    let bits = if n == 0.0 {
        0.0f64.to_bits()
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    };
    state.write_u64(bits);
}

fn hash_str<H: Hasher>(s: &str, state: &mut H) {
    state.write_u8(TAG_STRING);
    state.write_usize(s.len());
    state.write(s.as_bytes());
}

fn f64_deep_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

impl DeepEq for Value {
    fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => f64_deep_eq(a, b),
                _ => a == b,
            },
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.deep_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.deep_eq(other)))
            }
            _ => false,
        }
    }

    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => state.write_u8(TAG_NULL),
            Value::Bool(b) => {
                state.write_u8(TAG_BOOL);
                state.write_u8(*b as u8);
            }
            Value::Number(n) => hash_f64(n.as_f64().unwrap_or(f64::NAN), state),
            Value::String(s) => hash_str(s, state),
            Value::Array(items) => {
                state.write_u8(TAG_ARRAY);
                state.write_usize(items.len());
                for item in items {
                    item.deep_hash(state);
                }
            }
            Value::Object(map) => {
                // Key order must not matter, whatever order the map iterates in
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                state.write_u8(TAG_OBJECT);
                state.write_usize(keys.len());
                for key in keys {
                    hash_str(key, state);
                    map[key].deep_hash(state);
                }
            }
        }
    }
}

impl DeepEq for String {
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        hash_str(self, state);
    }
}

impl DeepEq for f64 {
    fn deep_eq(&self, other: &Self) -> bool {
        f64_deep_eq(*self, *other)
    }

    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        hash_f64(*self, state);
    }
}

impl DeepEq for ColumnOption {
    fn deep_eq(&self, other: &Self) -> bool {
        self == other
    }

    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        self.to_value().deep_hash(state);
    }
}

impl<T: DeepEq> DeepEq for Vec<T> {
    fn deep_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.deep_eq(b))
    }

    fn deep_hash<H: Hasher>(&self, state: &mut H) {
        state.write_u8(TAG_ARRAY);
        state.write_usize(self.len());
        for item in self {
            item.deep_hash(state);
        }
    }
}

impl StrictEq for Value {
    fn strict_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => a == b,
            },
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(_), Value::Array(_)) | (Value::Object(_), Value::Object(_)) => {
                std::ptr::eq(self, other)
            }
            _ => false,
        }
    }
}

impl StrictEq for String {
    fn strict_eq(&self, other: &Self) -> bool {
        self == other
    }
}

/// Structural hash of a single value.
pub fn deep_hash<T: DeepEq + ?Sized>(value: &T) -> u64 {
    let mut hasher = Xxh3::new();
    value.deep_hash(&mut hasher);
    hasher.finish()
}

/// Distinct-by-deep-equality elements of `values`, in first-seen order.
pub fn uniq<T: DeepEq + Clone>(values: &[T]) -> Vec<T> {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::with_capacity(values.len());
    let mut out: Vec<T> = Vec::with_capacity(values.len());

    for value in values {
        let bucket = buckets.entry(deep_hash(value)).or_default();
        if bucket.iter().any(|&idx| out[idx].deep_eq(value)) {
            continue;
        }
        bucket.push(out.len());
        out.push(value.clone());
    }

    out
}

/// `uniq` of `values` followed by `additions`.
pub fn add_uniq<T: DeepEq + Clone>(values: &[T], additions: &[T]) -> Vec<T> {
    let mut combined = Vec::with_capacity(values.len() + additions.len());
    combined.extend_from_slice(values);
    combined.extend_from_slice(additions);
    uniq(&combined)
}

/// `values` without any element strictly equal to one of `removals`.
///
/// Unlike [`uniq`] and [`add_uniq`] this compares arrays and objects by
/// identity, so a structurally equal but distinct object is *not* removed.
pub fn remove_uniq<T: StrictEq + Clone>(values: &[T], removals: &[T]) -> Vec<T> {
    values
        .iter()
        .filter(|v| !removals.iter().any(|r| v.strict_eq(r)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn uniq_preserves_first_seen_order() {
        let values = vec![json!("b"), json!("a"), json!("b"), json!("c"), json!("a")];
        assert_eq!(uniq(&values), vec![json!("b"), json!("a"), json!("c")]);
    }

    #[test]
    fn uniq_compares_objects_structurally() {
        let values = vec![
            json!({"value": "a", "label": "A"}),
            json!({"label": "A", "value": "a"}),
            json!({"value": "a", "label": "Other"}),
        ];
        let out = uniq(&values);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], json!({"value": "a", "label": "A"}));
    }

    #[test]
    fn uniq_treats_integer_and_float_forms_as_equal() {
        let values = vec![json!(1), json!(1.0), json!(2)];
        assert_eq!(uniq(&values).len(), 2);
    }

    #[test]
    fn uniq_distinguishes_types() {
        let values = vec![json!(1), json!("1"), json!(true), json!(null), json!([1])];
        assert_eq!(uniq(&values).len(), 5);
    }

    #[test]
    fn uniq_on_nested_arrays() {
        let values = vec![json!([1, [2, 3]]), json!([1, [2, 3]]), json!([[2, 3], 1])];
        assert_eq!(uniq(&values).len(), 2);
    }

    #[test]
    fn add_uniq_appends_only_new_values() {
        let out = add_uniq(&[json!("a"), json!("b")], &[json!("b"), json!("c")]);
        assert_eq!(out, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[test]
    fn remove_uniq_removes_primitives_by_value() {
        let out = remove_uniq(&[json!("a"), json!(2), json!("b")], &[json!("a"), json!(2.0)]);
        assert_eq!(out, vec![json!("b")]);
    }

    /// `remove_uniq` uses identity for compound values while `uniq` uses
    /// structure. Unifying the two would change which filter values can be
    /// removed, so the difference is pinned here.
    #[test]
    fn remove_uniq_keeps_structurally_equal_objects() {
        let values = vec![json!({"value": "a"}), json!("b")];
        let removals = vec![json!({"value": "a"})];

        let out = remove_uniq(&values, &removals);
        assert_eq!(out, values);

        // Whereas deep equality treats them as the same element
        assert_eq!(add_uniq(&values, &removals).len(), 2);
    }

    #[test]
    fn strict_eq_matches_identical_compound_reference() {
        let obj = json!({"value": "a"});
        assert!(obj.strict_eq(&obj));
        assert!(!obj.strict_eq(&obj.clone()));
    }

    #[test]
    fn deep_hash_ignores_key_order_and_zero_sign() {
        let a: Value = serde_json::from_str(r#"{"x": 1, "y": [true, null]}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"y": [true, null], "x": 1}"#).unwrap();
        assert_eq!(deep_hash(&a), deep_hash(&b));
        assert_eq!(deep_hash(&0.0f64), deep_hash(&-0.0f64));
    }

    /// Every value lands in the same hash bucket.
    #[derive(Debug, Clone, PartialEq)]
    struct Colliding(i32);

    impl DeepEq for Colliding {
        fn deep_eq(&self, other: &Self) -> bool {
            self.0 == other.0
        }

        fn deep_hash<H: Hasher>(&self, state: &mut H) {
            state.write_u8(7);
        }
    }

    #[test]
    fn uniq_keeps_distinct_values_that_share_a_hash() {
        assert_eq!(deep_hash(&Colliding(1)), deep_hash(&Colliding(2)));

        let values = [Colliding(1), Colliding(2), Colliding(1), Colliding(3)];
        assert_eq!(uniq(&values), vec![Colliding(1), Colliding(2), Colliding(3)]);

        let added = add_uniq(&[Colliding(3)], &[Colliding(4), Colliding(3)]);
        assert_eq!(added, vec![Colliding(3), Colliding(4)]);
    }

    #[test]
    fn uniq_on_column_options() {
        let opts = vec![
            ColumnOption::new("a", "A"),
            ColumnOption::new("a", "A"),
            ColumnOption::new("a", "A").with_icon("x"),
        ];
        assert_eq!(uniq(&opts).len(), 2);
    }

    fn small_value() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            (0i64..5).prop_map(|n| json!(n)),
            "[ab]{0,2}".prop_map(Value::String),
        ];
        leaf.prop_recursive(2, 8, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Value::Array),
                prop::collection::btree_map("[xy]", inner, 0..3)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    proptest! {
        #[test]
        fn uniq_is_idempotent(values in prop::collection::vec(small_value(), 0..20)) {
            let once = uniq(&values);
            let twice = uniq(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn uniq_keeps_exactly_the_distinct_elements(
            values in prop::collection::vec(small_value(), 0..20)
        ) {
            let out = uniq(&values);
            // No two outputs are deep-equal
            for (i, a) in out.iter().enumerate() {
                for b in &out[i + 1..] {
                    prop_assert!(!a.deep_eq(b));
                }
            }
            // Every input is represented
            for v in &values {
                prop_assert!(out.iter().any(|o| o.deep_eq(v)));
            }
            // Outputs appear in first-seen order
            let positions: Vec<usize> = out
                .iter()
                .map(|o| values.iter().position(|v| v.deep_eq(o)).unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
