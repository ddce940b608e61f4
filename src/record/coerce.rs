//! Collapsing record fields into single column values.
//!
//! Upstream records may hold several values per field; a relational column
//! holds one. Multi-valued string fields are joined with the configured
//! delimiter, everything else must already be single-valued.

use crate::error_handling::WriterError;

use super::value::{FieldValue, Record, Scalar};

/// Converts one field value into a column value.
///
/// - empty sequence -> `Null`
/// - one-element sequence -> that element
/// - several strings -> joined with `delimiter`
/// - several values with any non-string -> `UnsupportedMultiValue`
pub fn coerce(field: &str, value: &FieldValue, delimiter: &str) -> Result<Scalar, WriterError> {
    match value {
        FieldValue::Scalar(s) => Ok(s.clone()),
        FieldValue::Many(values) => match values.as_slice() {
            [] => Ok(Scalar::Null),
            [single] => Ok(single.clone()),
            many => {
                let texts: Option<Vec<&str>> = many.iter().map(Scalar::as_text).collect();
                match texts {
                    Some(texts) => Ok(Scalar::Text(texts.join(delimiter))),
                    None => Err(WriterError::UnsupportedMultiValue {
                        field: field.to_string(),
                        values: value.to_string(),
                    }),
                }
            }
        },
    }
}

/// Builds the column-ordered row for `record`. Absent fields become `Null`.
pub fn record_to_row(
    record: &Record,
    columns: &[String],
    delimiter: &str,
) -> Result<Vec<Scalar>, WriterError> {
    columns
        .iter()
        .map(|column| match record.get(column) {
            Some(value) => coerce(column, value, delimiter),
            None => Ok(Scalar::Null),
        })
        .collect()
}
