//! Feature engineering.
//!
//! Turns imputed columns into a purely numeric feature block:
//!
//! 1. text columns are ordinal-encoded against the categories seen in training
//!    (unseen categories become `-1.0`), numeric columns are cast to `f64`
//! 2. configured [`DerivedFeature`]s are computed from those base columns
//! 3. optionally, pairwise interaction products of the base columns are added
//! 4. every feature is scaled with parameters learned on the training data
//!
//! Output columns are ordered base, derived, interactions.

use crate::config::{DerivedFeature, DerivedFeatureKind, FeatureEngineeringConfig};
use crate::error::{Result, TransformationError};
use crate::transformers::scaler::FittedScaler;
use crate::transformers::{FittedTransformer, Transformer};
use crate::utils::{
    DtypeCategory, frame_from_series, get_dtype_category, require_column, series_to_f64,
    series_to_strings,
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Code assigned to a category that was not present in the training data.
pub const UNSEEN_CATEGORY_CODE: f64 = -1.0;

/// Unfitted feature engineering step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureEngineering {
    config: FeatureEngineeringConfig,
}

impl FeatureEngineering {
    pub fn new(config: FeatureEngineeringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureEngineeringConfig {
        &self.config
    }
}

/// How a base column is turned into a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Encoding {
    Numeric,
    Ordinal { categories: Vec<String> },
}

/// A base input column and its encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseFeature {
    pub column: String,
    pub encoding: Encoding,
}

impl BaseFeature {
    fn encode(&self, series: &Series) -> Result<Vec<f64>> {
        match &self.encoding {
            Encoding::Numeric => Ok(series_to_f64(series)?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect()),
            Encoding::Ordinal { categories } => Ok(series_to_strings(series)?
                .into_iter()
                .map(|v| match v {
                    Some(value) => categories
                        .binary_search(&value)
                        .map(|code| code as f64)
                        .unwrap_or(UNSEEN_CATEGORY_CODE),
                    None => f64::NAN,
                })
                .collect()),
        }
    }
}

/// Feature engineering with encodings and scaling learned from training data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedFeatureEngineering {
    base: Vec<BaseFeature>,
    derived: Vec<DerivedFeature>,
    interactions: bool,
    scaler: FittedScaler,
}

impl FittedFeatureEngineering {
    pub fn base_features(&self) -> &[BaseFeature] {
        &self.base
    }

    /// Derived features that were computable on the training data.
    pub fn derived_features(&self) -> &[DerivedFeature] {
        &self.derived
    }

    pub fn scaler(&self) -> &FittedScaler {
        &self.scaler
    }

    /// Build the unscaled feature columns, in output order.
    fn build_columns(
        base: &[BaseFeature],
        derived: &[DerivedFeature],
        interactions: bool,
        df: &DataFrame,
    ) -> Result<Vec<Vec<f64>>> {
        let mut columns = Vec::with_capacity(base.len());
        for feature in base {
            let series = require_column(df, &feature.column)?;
            columns.push(feature.encode(series)?);
        }

        let index: HashMap<&str, usize> = base
            .iter()
            .enumerate()
            .map(|(i, feature)| (feature.column.as_str(), i))
            .collect();

        let mut extra = Vec::new();
        for feature in derived {
            extra.push(compute_derived(&feature.kind, &index, &columns)?);
        }

        if interactions {
            for i in 0..columns.len() {
                for j in (i + 1)..columns.len() {
                    extra.push(
                        columns[i]
                            .iter()
                            .zip(&columns[j])
                            .map(|(a, b)| a * b)
                            .collect(),
                    );
                }
            }
        }

        columns.extend(extra);
        Ok(columns)
    }

    fn output_names(
        base: &[BaseFeature],
        derived: &[DerivedFeature],
        interactions: bool,
    ) -> Vec<String> {
        let mut names: Vec<String> = base.iter().map(|f| f.column.clone()).collect();
        names.extend(derived.iter().map(|f| f.name.clone()));
        if interactions {
            for i in 0..base.len() {
                for j in (i + 1)..base.len() {
                    names.push(format!("{}*{}", base[i].column, base[j].column));
                }
            }
        }
        names
    }
}

fn source<'a>(
    index: &HashMap<&str, usize>,
    columns: &'a [Vec<f64>],
    name: &str,
) -> Result<&'a [f64]> {
    index
        .get(name)
        .map(|&i| columns[i].as_slice())
        .ok_or_else(|| TransformationError::ColumnNotFound(name.to_string()))
}

fn compute_derived(
    kind: &DerivedFeatureKind,
    index: &HashMap<&str, usize>,
    columns: &[Vec<f64>],
) -> Result<Vec<f64>> {
    let values = match kind {
        DerivedFeatureKind::Ratio {
            numerator,
            denominator,
        } => source(index, columns, numerator)?
            .iter()
            .zip(source(index, columns, denominator)?)
            .map(|(n, d)| if *d == 0.0 { 0.0 } else { n / d })
            .collect(),
        DerivedFeatureKind::Product { left, right } => source(index, columns, left)?
            .iter()
            .zip(source(index, columns, right)?)
            .map(|(a, b)| a * b)
            .collect(),
        DerivedFeatureKind::Difference { left, right } => source(index, columns, left)?
            .iter()
            .zip(source(index, columns, right)?)
            .map(|(a, b)| a - b)
            .collect(),
        DerivedFeatureKind::Log1p { column } => source(index, columns, column)?
            .iter()
            .map(|v| v.max(0.0).ln_1p())
            .collect(),
        DerivedFeatureKind::BodyMassIndex {
            weight_kg,
            height_cm,
        } => source(index, columns, weight_kg)?
            .iter()
            .zip(source(index, columns, height_cm)?)
            .map(|(w, h)| {
                let meters = h / 100.0;
                if meters == 0.0 { 0.0 } else { w / (meters * meters) }
            })
            .collect(),
    };

    Ok(values)
}

impl Transformer for FeatureEngineering {
    type Fitted = FittedFeatureEngineering;

    fn fit(&self, df: &DataFrame) -> Result<FittedFeatureEngineering> {
        let mut base = Vec::with_capacity(df.width());
        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let encoding = match get_dtype_category(series.dtype()) {
                DtypeCategory::Numeric => Encoding::Numeric,
                DtypeCategory::String | DtypeCategory::Other => {
                    let categories: BTreeSet<String> =
                        series_to_strings(series)?.into_iter().flatten().collect();
                    debug!(
                        "Feature engineering: '{}' ordinal-encoded with {} categories",
                        series.name(),
                        categories.len()
                    );
                    Encoding::Ordinal {
                        categories: categories.into_iter().collect(),
                    }
                }
            };
            base.push(BaseFeature {
                column: series.name().to_string(),
                encoding,
            });
        }

        let mut derived = Vec::new();
        for feature in &self.config.derived_features {
            if base.iter().any(|b| b.column == feature.name) {
                return Err(TransformationError::InvalidConfig(format!(
                    "derived feature '{}' collides with an input column",
                    feature.name
                )));
            }
            let missing: Vec<&str> = feature
                .kind
                .source_columns()
                .into_iter()
                .filter(|source| !base.iter().any(|b| b.column == *source))
                .collect();
            if missing.is_empty() {
                derived.push(feature.clone());
            } else {
                warn!(
                    "Skipping derived feature '{}': missing source columns {:?}",
                    feature.name, missing
                );
            }
        }

        let columns =
            FittedFeatureEngineering::build_columns(&base, &derived, self.config.interactions, df)?;
        let names = FittedFeatureEngineering::output_names(&base, &derived, self.config.interactions);
        let scaler = FittedScaler::fit(self.config.scaling, &names, &columns)?;

        debug!(
            "Feature engineering fitted: {} base, {} derived, {} total features",
            base.len(),
            derived.len(),
            columns.len()
        );

        Ok(FittedFeatureEngineering {
            base,
            derived,
            interactions: self.config.interactions,
            scaler,
        })
    }
}

impl FittedTransformer for FittedFeatureEngineering {
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut columns =
            Self::build_columns(&self.base, &self.derived, self.interactions, df)?;
        self.scaler.transform(&mut columns)?;

        let series: Vec<Series> = self
            .feature_names_out()
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Series::new(name.as_str().into(), values))
            .collect();
        frame_from_series(series)
    }

    fn feature_names_out(&self) -> Vec<String> {
        Self::output_names(&self.base, &self.derived, self.interactions)
    }
}
