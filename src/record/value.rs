//! Record and value types.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::error_handling::WriterError;

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    fn from_json(field: &str, value: JsonValue) -> Result<Self, WriterError> {
        match value {
            JsonValue::Null => Ok(Scalar::Null),
            JsonValue::Bool(b) => Ok(Scalar::Bool(b)),
            JsonValue::String(s) => Ok(Scalar::Text(s)),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Scalar::Integer(i))
                } else if let Some(f) = n.as_f64().filter(|_| n.is_f64()) {
                    Ok(Scalar::Float(f))
                } else {
                    // unsigned integers above i64::MAX
                    Err(WriterError::InvalidRecord(format!(
                        "field '{}' holds an out-of-range number: {}",
                        field, n
                    )))
                }
            }
            other => Err(WriterError::InvalidRecord(format!(
                "field '{}' holds a nested value: {}",
                field, other
            ))),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Float(x) => write!(f, "{}", x),
            Scalar::Text(s) => write!(f, "{:?}", s),
        }
    }
}

macro_rules! scalar_from {
    ($($t:ty => $variant:ident($conv:expr)),* $(,)?) => {
        $(
            impl From<$t> for Scalar {
                fn from(v: $t) -> Self {
                    Scalar::$variant($conv(v))
                }
            }

            impl From<$t> for FieldValue {
                fn from(v: $t) -> Self {
                    FieldValue::Scalar(Scalar::from(v))
                }
            }

            impl From<Vec<$t>> for FieldValue {
                fn from(values: Vec<$t>) -> Self {
                    FieldValue::Many(values.into_iter().map(Scalar::from).collect())
                }
            }
        )*
    };
}

scalar_from! {
    &str => Text(str::to_string),
    String => Text(std::convert::identity),
    i32 => Integer(i64::from),
    i64 => Integer(std::convert::identity),
    f64 => Float(std::convert::identity),
    bool => Bool(std::convert::identity),
}

/// The value stored under a record field: one scalar or a sequence of them.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Scalar(Scalar),
    Many(Vec<Scalar>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar(s) => write!(f, "{}", s),
            FieldValue::Many(values) => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<Scalar> for FieldValue {
    fn from(value: Scalar) -> Self {
        FieldValue::Scalar(value)
    }
}

impl From<Vec<Scalar>> for FieldValue {
    fn from(values: Vec<Scalar>) -> Self {
        FieldValue::Many(values)
    }
}

/// An ordered mapping from field name to value, produced upstream.
///
/// Fields keep insertion order; setting an existing field replaces its value
/// in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`, returning the record for chaining.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Builds a record from a JSON object.
    ///
    /// Arrays become multi-valued fields; nested objects and arrays of arrays
    /// are rejected.
    pub fn from_json(value: JsonValue) -> Result<Self, WriterError> {
        let JsonValue::Object(map) = value else {
            return Err(WriterError::InvalidRecord(
                "expected a JSON object".to_string(),
            ));
        };

        let mut record = Record::new();
        for (name, value) in map {
            let field = match value {
                JsonValue::Array(items) => FieldValue::Many(
                    items
                        .into_iter()
                        .map(|item| Scalar::from_json(&name, item))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                other => FieldValue::Scalar(Scalar::from_json(&name, other)?),
            };
            record.fields.push((name, field));
        }
        Ok(record)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}: {}", name, value)?;
        }
        f.write_str("}")
    }
}
