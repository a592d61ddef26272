// Type Conversion Utilities for the Execution Engine
//
// This module converts between catalog values and the embedded engine's
// storage values, and infers the kind of result columns.

use rusqlite::types::{Value as SqlValue, ValueRef};

use crate::catalog::schema::DataType;
use crate::query::executor::result::DataValue;

/// Convert a table value into the engine's storage representation
pub fn to_sql_value(value: &DataValue) -> SqlValue {
    match value {
        DataValue::Null => SqlValue::Null,
        DataValue::Integer(i) => SqlValue::Integer(*i),
        DataValue::Float(f) => SqlValue::Real(*f),
        DataValue::Boolean(b) => SqlValue::Integer(if *b { 1 } else { 0 }),
        DataValue::Text(s) | DataValue::Date(s) | DataValue::Timestamp(s) => SqlValue::Text(s.clone()),
    }
}

/// Convert a value read from a result row without any column context.
///
/// BLOB results have no table kind, so they are rendered as hex text.
pub fn from_value_ref(value: ValueRef<'_>) -> DataValue {
    match value {
        ValueRef::Null => DataValue::Null,
        ValueRef::Integer(i) => DataValue::Integer(i),
        ValueRef::Real(f) => DataValue::Float(f),
        ValueRef::Text(bytes) => DataValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => DataValue::Text(hex::encode(bytes)),
    }
}

/// Decide the kind of a result column.
///
/// A declared type that maps to a known kind wins when every value can be
/// read back as that kind. Compound selects report the declaration of their
/// first arm only, so values from the other arms may not fit. Otherwise the
/// kinds of the values are widened: Integer and Float give Float, any other
/// mix gives Text, and an all-null column is Text.
pub fn infer_column_kind(declared: Option<&str>, values: &[&DataValue]) -> DataType {
    if let Some(kind) = declared.and_then(DataType::from_declared) {
        if values.iter().all(|v| fits_declared(v, kind)) {
            return kind;
        }
    }
    values
        .iter()
        .filter_map(|v| v.get_type())
        .reduce(widen)
        .unwrap_or(DataType::Text)
}

/// Whether a raw engine value reads back as the declared kind
fn fits_declared(value: &DataValue, kind: DataType) -> bool {
    match (value, kind) {
        (DataValue::Null, _) => true,
        (DataValue::Integer(i), DataType::Boolean) => *i == 0 || *i == 1,
        (DataValue::Text(_), DataType::Date | DataType::Timestamp) => true,
        (value, kind) => value.is_compatible_with(kind),
    }
}

fn widen(a: DataType, b: DataType) -> DataType {
    match (a, b) {
        _ if a == b => a,
        (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => DataType::Float,
        _ => DataType::Text,
    }
}

/// Align a raw result value with its column kind
pub fn align_result_value(value: DataValue, kind: DataType) -> DataValue {
    match (value, kind) {
        (DataValue::Integer(i), DataType::Boolean) => DataValue::Boolean(i != 0),
        (value @ (DataValue::Integer(_) | DataValue::Float(_)), DataType::Text) => {
            DataValue::Text(value.to_string())
        }
        (value, kind) => value.aligned_to(kind),
    }
}
