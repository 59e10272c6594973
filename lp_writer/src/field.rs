use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The value of a single field of a [`Point`](crate::Point).
///
/// Decoding from JSON picks the variant from the JSON type: strings, booleans, numbers that fit
/// an `i64` and fractional numbers map to their own variants; everything else (arrays, objects,
/// `null`, integers beyond `i64`) is kept as [`FieldValue::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    /// Written with its plain string conversion, neither quoted nor suffixed.
    Other(Value),
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => Self::String(s),
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Self::Integer(i),
                (None, Some(f)) if n.is_f64() => Self::Float(f),
                _ => Self::Other(Value::Number(n)),
            },
            other => Self::Other(other),
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::String(s) => Self::String(s),
            FieldValue::Integer(i) => Self::from(i),
            // non-finite floats have no JSON form and become null
            FieldValue::Float(f) => Self::from(f),
            FieldValue::Boolean(b) => Self::Bool(b),
            FieldValue::Other(v) => v,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_variants_from_json() {
        let decoded: Vec<FieldValue> =
            serde_json::from_value(json!(["on", 7, -7, 1.5, true, null, [1, 2], {"a": 1}]))
                .unwrap();

        assert_eq!(
            decoded,
            vec![
                FieldValue::String("on".into()),
                FieldValue::Integer(7),
                FieldValue::Integer(-7),
                FieldValue::Float(1.5),
                FieldValue::Boolean(true),
                FieldValue::Other(Value::Null),
                FieldValue::Other(json!([1, 2])),
                FieldValue::Other(json!({"a": 1})),
            ]
        );
    }

    #[test]
    fn integers_beyond_i64_are_kept_as_other() {
        let decoded: FieldValue = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(decoded, FieldValue::Other(json!(u64::MAX)));
    }

    #[test]
    fn float_with_integral_value_stays_float() {
        let decoded: FieldValue = serde_json::from_str("3.0").unwrap();
        assert_eq!(decoded, FieldValue::Float(3.0));
    }

    #[test]
    fn encode_back_to_json() {
        let values = vec![
            FieldValue::from("x"),
            FieldValue::from(1),
            FieldValue::from(2.5),
            FieldValue::from(false),
            FieldValue::Other(json!([1])),
        ];
        assert_eq!(
            serde_json::to_value(values).unwrap(),
            json!(["x", 1, 2.5, false, [1]])
        );
    }
}
