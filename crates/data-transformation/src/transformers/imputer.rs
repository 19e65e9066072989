//! Null imputation.
//!
//! Learns one fill value per column from training data (median, mean or zero
//! for numeric columns; mode or a constant for text columns) and replaces
//! nulls with it.

use crate::config::{CategoricalImputation, ImputerConfig, NumericImputation};
use crate::error::{Result, TransformationError};
use crate::transformers::{FittedTransformer, Transformer};
use crate::utils::{
    DtypeCategory, frame_from_series, get_dtype_category, mean, median, require_column,
    series_to_f64, series_to_strings, string_mode,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fill value used for text columns with [`CategoricalImputation::Constant`]
/// or when a column has no observed values.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Unfitted imputer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NullImputer {
    numeric: NumericImputation,
    categorical: CategoricalImputation,
}

impl NullImputer {
    pub fn new(numeric: NumericImputation, categorical: CategoricalImputation) -> Self {
        Self {
            numeric,
            categorical,
        }
    }

    pub fn from_config(config: &ImputerConfig) -> Self {
        Self::new(config.numeric, config.categorical)
    }

    fn numeric_fill(&self, name: &str, values: &[Option<f64>]) -> Result<f64> {
        let (fill, method) = match self.numeric {
            NumericImputation::Median => (median(values), "median"),
            NumericImputation::Mean => (mean(values), "mean"),
            NumericImputation::Zero => (Some(0.0), "zero"),
        };

        match fill {
            Some(value) if !value.is_finite() => Err(TransformationError::NotNumeric {
                column: name.to_string(),
                reason: format!("{} fill value is {}", method, value),
            }),
            Some(value) => {
                debug!("Imputer: '{}' fills with {}: {:.4}", name, method, value);
                Ok(value)
            }
            None => {
                warn!(
                    "Imputer: '{}' has no values to compute a {}, falling back to 0.0",
                    name, method
                );
                Ok(0.0)
            }
        }
    }

    fn categorical_fill(&self, name: &str, values: &[Option<String>]) -> String {
        match self.categorical {
            CategoricalImputation::Mode => match string_mode(values) {
                Some(mode) => {
                    debug!("Imputer: '{}' fills with mode: '{}'", name, mode);
                    mode
                }
                None => {
                    warn!(
                        "Imputer: '{}' has no values to compute a mode, falling back to '{}'",
                        name, UNKNOWN_CATEGORY
                    );
                    UNKNOWN_CATEGORY.to_string()
                }
            },
            CategoricalImputation::Constant => UNKNOWN_CATEGORY.to_string(),
        }
    }
}

/// Value a column's nulls are replaced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillValue {
    Numeric(f64),
    Categorical(String),
}

/// Fill value learned for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFill {
    pub column: String,
    pub value: FillValue,
}

/// Imputer with fill values learned from training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedNullImputer {
    fills: Vec<ColumnFill>,
}

impl FittedNullImputer {
    /// Learned fill values, in column order.
    pub fn fills(&self) -> &[ColumnFill] {
        &self.fills
    }

    /// Fill value for a single column, if it was fitted.
    pub fn fill_for(&self, column: &str) -> Option<&FillValue> {
        self.fills
            .iter()
            .find(|fill| fill.column == column)
            .map(|fill| &fill.value)
    }
}

impl Transformer for NullImputer {
    type Fitted = FittedNullImputer;

    fn fit(&self, df: &DataFrame) -> Result<FittedNullImputer> {
        let mut fills = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let name = series.name().to_string();

            let value = match get_dtype_category(series.dtype()) {
                DtypeCategory::Numeric => {
                    let values = series_to_f64(series)?;
                    FillValue::Numeric(self.numeric_fill(&name, &values)?)
                }
                DtypeCategory::String | DtypeCategory::Other => {
                    let values = series_to_strings(series)?;
                    FillValue::Categorical(self.categorical_fill(&name, &values))
                }
            };

            fills.push(ColumnFill {
                column: name,
                value,
            });
        }

        debug!("Imputer fitted on {} columns", fills.len());
        Ok(FittedNullImputer { fills })
    }
}

impl FittedTransformer for FittedNullImputer {
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.fills.len());

        for fill in &self.fills {
            let series = require_column(df, &fill.column)?;
            let filled = match &fill.value {
                FillValue::Numeric(value) => {
                    let values: Vec<f64> = series_to_f64(series)?
                        .into_iter()
                        .map(|v| v.unwrap_or(*value))
                        .collect();
                    Series::new(fill.column.as_str().into(), values)
                }
                FillValue::Categorical(value) => {
                    let values: Vec<String> = series_to_strings(series)?
                        .into_iter()
                        .map(|v| v.unwrap_or_else(|| value.clone()))
                        .collect();
                    Series::new(fill.column.as_str().into(), values)
                }
            };
            columns.push(filled);
        }

        frame_from_series(columns)
    }

    fn feature_names_out(&self) -> Vec<String> {
        self.fills.iter().map(|fill| fill.column.clone()).collect()
    }
}
