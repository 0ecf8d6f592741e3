//! Decoding of PostgreSQL rows into pipeline values
//!
//! Only a few column types map to a native [`Value`]. Every other type is
//! selected as `::text` so its textual form can be loaded back into a staging
//! column of the same type.

use crate::domain::{AnonymizerError, Result, Row, Value};
use serde_json::Number;
use std::sync::Arc;
use tokio_postgres::types::{FromSql, Type};

/// Check whether a column type decodes natively
pub fn is_native(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::BOOL | Type::INT2 | Type::INT4 | Type::INT8 | Type::FLOAT4 | Type::FLOAT8
    ) || <String as FromSql>::accepts(ty)
        || <serde_json::Value as FromSql>::accepts(ty)
}

/// Which of `types` must be selected as `::text`
pub fn text_casts(types: &[Type]) -> Vec<bool> {
    types.iter().map(|ty| !is_native(ty)).collect()
}

fn float_value(f: f64) -> Value {
    match Number::from_f64(f) {
        Some(n) => Value::Number(n),
        // NaN and infinities have no JSON number form; their text form round-trips
        None => Value::Text(f.to_string().replace("inf", "Infinity")),
    }
}

fn decode_column(row: &tokio_postgres::Row, idx: usize) -> std::result::Result<Value, tokio_postgres::Error> {
    let ty = row.columns()[idx].type_();
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx)?.map(Value::Boolean),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)?
            .map(|n| Value::from(i64::from(n))),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)?
            .map(|n| Value::from(i64::from(n))),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx)?.map(Value::from),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)?
            .map(|f| float_value(f64::from(f))),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx)?.map(float_value),
        _ if <serde_json::Value as FromSql>::accepts(ty) => row
            .try_get::<_, Option<serde_json::Value>>(idx)?
            .map(Value::Structured),
        _ => row.try_get::<_, Option<String>>(idx)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

/// Convert a fetched PostgreSQL row into a pipeline row
///
/// # Errors
///
/// Returns a connectivity error if the row shape does not match `columns`
/// or a value cannot be decoded.
pub fn decode_row(columns: &Arc<[String]>, row: &tokio_postgres::Row) -> Result<Row> {
    let values = (0..row.len())
        .map(|idx| decode_column(row, idx))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AnonymizerError::Connectivity(format!("Failed to decode row: {}", e)))?;

    Row::new(Arc::clone(columns), values).ok_or_else(|| {
        AnonymizerError::Connectivity(format!(
            "Fetched {} columns, expected {}",
            row.len(),
            columns.len()
        ))
    })
}
