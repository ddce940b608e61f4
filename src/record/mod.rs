//! Records handed to the writer and their conversion into table rows.

mod coerce;
mod value;

pub use coerce::{coerce, record_to_row};
pub use value::{FieldValue, Record, Scalar};
