// Copyright (c) Microsoft Corporation. All rights reserved.
// Licensed under the MIT License.

use std::fmt::Write;

use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

/// A single component of a [`PartitionKey`].
#[derive(Clone, Debug, PartialEq)]
pub enum PartitionKeyValue {
    String(String),
    Number(Number),
    Bool(bool),
    Null,
}

impl From<&str> for PartitionKeyValue {
    fn from(value: &str) -> Self {
        PartitionKeyValue::String(value.to_owned())
    }
}

impl From<String> for PartitionKeyValue {
    fn from(value: String) -> Self {
        PartitionKeyValue::String(value)
    }
}

impl From<&String> for PartitionKeyValue {
    fn from(value: &String) -> Self {
        PartitionKeyValue::String(value.clone())
    }
}

impl From<bool> for PartitionKeyValue {
    fn from(value: bool) -> Self {
        PartitionKeyValue::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(impl From<$t> for PartitionKeyValue {
            fn from(value: $t) -> Self {
                PartitionKeyValue::Number(Number::from(value))
            }
        })*
    };
}

impl_from_integer!(i32, i64, u32, u64);

impl From<f64> for PartitionKeyValue {
    /// Non-finite values have no JSON representation and become [`PartitionKeyValue::Null`].
    fn from(value: f64) -> Self {
        Number::from_f64(value)
            .map(PartitionKeyValue::Number)
            .unwrap_or(PartitionKeyValue::Null)
    }
}

impl From<PartitionKeyValue> for Value {
    fn from(value: PartitionKeyValue) -> Self {
        match value {
            PartitionKeyValue::String(s) => Value::String(s),
            PartitionKeyValue::Number(n) => Value::Number(n),
            PartitionKeyValue::Bool(b) => Value::Bool(b),
            PartitionKeyValue::Null => Value::Null,
        }
    }
}

impl Serialize for PartitionKeyValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PartitionKeyValue::String(s) => serializer.serialize_str(s),
            PartitionKeyValue::Number(n) => n.serialize(serializer),
            PartitionKeyValue::Bool(b) => serializer.serialize_bool(*b),
            PartitionKeyValue::Null => serializer.serialize_unit(),
        }
    }
}

/// The partition key of an item.
///
/// A partition key is an ordered list of values. Containers with hierarchical partition keys
/// take one value per level.
///
/// ```rust
/// use azure_data_cosmos_rest::PartitionKey;
///
/// let single = PartitionKey::from("test-docs");
/// assert_eq!(single.to_header_value().as_deref(), Some(r#"["test-docs"]"#));
///
/// let hierarchical = PartitionKey::from(("tenant", 42));
/// assert_eq!(hierarchical.to_header_value().as_deref(), Some(r#"["tenant",42]"#));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PartitionKey(Vec<PartitionKeyValue>);

impl PartitionKey {
    /// A partition key with no values. Queries issued with it run cross-partition.
    pub const EMPTY: PartitionKey = PartitionKey(Vec::new());

    pub fn values(&self) -> &[PartitionKeyValue] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Encodes the key as the JSON array sent in `x-ms-documentdb-partitionkey`.
    ///
    /// Returns `None` for an empty key. Non-ASCII characters are escaped as `\uXXXX` since
    /// header values must be ASCII.
    pub fn to_header_value(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }

        let mut encoded = String::with_capacity(16 * self.0.len());
        encoded.push('[');
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                encoded.push(',');
            }
            match value {
                PartitionKeyValue::String(s) => write_ascii_json_string(&mut encoded, s),
                PartitionKeyValue::Number(n) => encoded.push_str(&n.to_string()),
                PartitionKeyValue::Bool(b) => encoded.push_str(if *b { "true" } else { "false" }),
                PartitionKeyValue::Null => encoded.push_str("null"),
            }
        }
        encoded.push(']');
        Some(encoded)
    }
}

fn write_ascii_json_string(out: &mut String, value: &str) {
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            c => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{:04x}", unit);
                }
            }
        }
    }
    out.push('"');
}

impl<T: Into<PartitionKeyValue>> From<T> for PartitionKey {
    fn from(value: T) -> Self {
        PartitionKey(vec![value.into()])
    }
}

impl From<Vec<PartitionKeyValue>> for PartitionKey {
    fn from(values: Vec<PartitionKeyValue>) -> Self {
        PartitionKey(values)
    }
}

impl<A, B> From<(A, B)> for PartitionKey
where
    A: Into<PartitionKeyValue>,
    B: Into<PartitionKeyValue>,
{
    fn from((a, b): (A, B)) -> Self {
        PartitionKey(vec![a.into(), b.into()])
    }
}

impl<A, B, C> From<(A, B, C)> for PartitionKey
where
    A: Into<PartitionKeyValue>,
    B: Into<PartitionKeyValue>,
    C: Into<PartitionKeyValue>,
{
    fn from((a, b, c): (A, B, C)) -> Self {
        PartitionKey(vec![a.into(), b.into(), c.into()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_string_key() {
        let key = PartitionKey::from("test-docs");
        assert_eq!(key.to_header_value().unwrap(), r#"["test-docs"]"#);
    }

    #[test]
    fn hierarchical_key_keeps_order_and_types() {
        let key = PartitionKey::from(("tenant", 7_i64, true));
        assert_eq!(key.values().len(), 3);
        assert_eq!(key.to_header_value().unwrap(), r#"["tenant",7,true]"#);
    }

    #[test]
    fn empty_key_has_no_header() {
        assert!(PartitionKey::EMPTY.is_empty());
        assert_eq!(PartitionKey::default().to_header_value(), None);
    }

    #[test]
    fn non_ascii_and_quotes_are_escaped() {
        let key = PartitionKey::from("caf\u{e9} \"x\" \u{1F600}");
        assert_eq!(
            key.to_header_value().unwrap(),
            r#"["caf\u00e9 \"x\" \ud83d\ude00"]"#
        );
    }

    #[test]
    fn non_finite_number_becomes_null() {
        let key = PartitionKey::from(vec![
            PartitionKeyValue::from(f64::NAN),
            PartitionKeyValue::from(1.5),
        ]);
        assert_eq!(key.to_header_value().unwrap(), "[null,1.5]");
    }

    #[test]
    fn serializes_as_array() {
        let key = PartitionKey::from(("a", 1));
        assert_eq!(serde_json::to_string(&key).unwrap(), r#"["a",1]"#);
    }
}
