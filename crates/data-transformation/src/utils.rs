//! Shared utilities for the transformers.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use crate::error::{Result, TransformationError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a data type for preprocessing purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer, floating point or boolean values
    Numeric,
    /// String/text or categorical values
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Get the category of a DataType.
///
/// Booleans count as numeric: they cast cleanly to 0.0 / 1.0.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) || matches!(dtype, DataType::Boolean) {
        DtypeCategory::Numeric
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Column Access
// =============================================================================

/// Look up a column, mapping a miss to [`TransformationError::ColumnNotFound`].
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|col| col.as_materialized_series())
        .map_err(|_| TransformationError::ColumnNotFound(name.to_string()))
}

/// Select columns in the given order, failing on the first missing one.
pub fn select_columns(df: &DataFrame, names: &[String]) -> Result<DataFrame> {
    if let Some(missing) = names.iter().find(|name| df.column(name.as_str()).is_err()) {
        return Err(TransformationError::ColumnNotFound(missing.clone()));
    }
    Ok(df.select(names.iter().map(|name| name.as_str()))?)
}

/// Column names of a frame as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Assemble a frame from already-built columns.
pub fn frame_from_series(columns: Vec<Series>) -> Result<DataFrame> {
    Ok(DataFrame::new(columns.into_iter().map(Column::from).collect())?)
}

/// Read a column as optional floats.
///
/// The cast is strict: a string value that does not parse is an error
/// rather than a silent null. `NaN` is read as missing.
pub fn series_to_f64(series: &Series) -> Result<Vec<Option<f64>>> {
    let casted = series
        .strict_cast(&DataType::Float64)
        .map_err(|e| TransformationError::NotNumeric {
            column: series.name().to_string(),
            reason: e.to_string(),
        })?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Read a column as optional strings.
pub fn series_to_strings(series: &Series) -> Result<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

// =============================================================================
// Statistics Utilities
// =============================================================================

/// Median of the non-null values, `None` when there are none.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Mean of the non-null values, `None` when there are none.
pub fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    Some(present.iter().sum::<f64>() / present.len() as f64)
}

/// Most frequent non-null value.
///
/// Ties go to the lexicographically smallest value so repeated fits on the
/// same data always agree.
pub fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut value_counts: HashMap<&str, usize> = HashMap::new();
    for val in values.iter().flatten() {
        *value_counts.entry(val.as_str()).or_insert(0) += 1;
    }

    value_counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val.to_string())
}

// =============================================================================
// Array Utilities
// =============================================================================

/// Copy a frame of numeric columns into a row-major `(height, width)` matrix.
///
/// Nulls become `NaN`. The row count is passed in because a frame without
/// columns reports a height of zero.
pub fn frame_to_array(df: &DataFrame, n_rows: usize) -> Result<Array2<f64>> {
    let mut array = Array2::<f64>::zeros((n_rows, df.width()));
    for (j, col) in df.get_columns().iter().enumerate() {
        let values = series_to_f64(col.as_materialized_series())?;
        if values.len() != n_rows {
            return Err(TransformationError::SchemaMismatch(format!(
                "column '{}' has {} rows, expected {}",
                col.name(),
                values.len(),
                n_rows
            )));
        }
        let column = Array1::from_iter(values.into_iter().map(|v| v.unwrap_or(f64::NAN)));
        array.column_mut(j).assign(&column);
    }
    Ok(array)
}

// =============================================================================
// Tests
// =============================================================================
