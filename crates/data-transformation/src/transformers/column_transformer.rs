//! Column-scoped transformers.
//!
//! A [`ColumnTransformer`] applies each of its pipelines to a named subset of
//! columns and concatenates the outputs side by side. Columns that no entry
//! claims are dropped.

use crate::error::{Result, ResultExt, TransformationError};
use crate::transformers::pipeline::{FittedPipeline, Pipeline};
use crate::transformers::{FittedTransformer, Transformer};
use crate::utils::{frame_from_series, frame_to_array, select_columns};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info};

/// One `(name, pipeline, columns)` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTransformerEntry {
    pub name: String,
    pub pipeline: Pipeline,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnTransformer {
    entries: Vec<ColumnTransformerEntry>,
}

impl ColumnTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry. Entry names must be unique.
    pub fn with_entry(
        mut self,
        name: impl Into<String>,
        pipeline: Pipeline,
        columns: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        if self.entries.iter().any(|entry| entry.name == name) {
            return Err(TransformationError::InvalidConfig(format!(
                "duplicate column transformer entry '{}'",
                name
            )));
        }
        self.entries.push(ColumnTransformerEntry {
            name,
            pipeline,
            columns,
        });
        Ok(self)
    }

    pub fn entries(&self) -> &[ColumnTransformerEntry] {
        &self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformerEntry {
    pub name: String,
    pub pipeline: FittedPipeline,
    pub columns: Vec<String>,
}

/// A column transformer with every entry fitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedColumnTransformer {
    entries: Vec<FittedColumnTransformerEntry>,
}

static_assertions::assert_impl_all!(FittedColumnTransformer: Send, Sync);

impl FittedColumnTransformer {
    pub fn entries(&self) -> &[FittedColumnTransformerEntry] {
        &self.entries
    }

    /// Number of input columns the transformer consumes.
    pub fn n_features_in(&self) -> usize {
        self.entries.iter().map(|entry| entry.columns.len()).sum()
    }

    /// Transform into a dense `(rows, features)` matrix.
    ///
    /// Nulls left in the output become `NaN`.
    pub fn transform_array(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let features = self.transform(df)?;
        frame_to_array(&features, df.height())
    }
}

impl Transformer for ColumnTransformer {
    type Fitted = FittedColumnTransformer;

    fn fit(&self, df: &DataFrame) -> Result<FittedColumnTransformer> {
        self.fit_transform(df).map(|(fitted, _)| fitted)
    }

    fn fit_transform(&self, df: &DataFrame) -> Result<(FittedColumnTransformer, DataFrame)> {
        let mut entries = Vec::with_capacity(self.entries.len());
        let mut outputs = Vec::with_capacity(self.entries.len());

        for entry in &self.entries {
            let input = select_columns(df, &entry.columns)
                .context(format!("Selecting columns for '{}'", entry.name))?;
            let (pipeline, out) = entry
                .pipeline
                .fit_transform(&input)
                .context(format!("Fitting '{}'", entry.name))?;
            debug!(
                "Column transformer '{}': {} columns in, {} out",
                entry.name,
                entry.columns.len(),
                out.width()
            );
            entries.push(FittedColumnTransformerEntry {
                name: entry.name.clone(),
                pipeline,
                columns: entry.columns.clone(),
            });
            outputs.push(out);
        }

        let fitted = FittedColumnTransformer { entries };
        let combined = hstack_outputs(outputs)?;
        info!(
            "Column transformer fitted: {} features in, {} out",
            fitted.n_features_in(),
            combined.width()
        );
        Ok((fitted, combined))
    }
}

impl FittedTransformer for FittedColumnTransformer {
    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut outputs = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let input = select_columns(df, &entry.columns)
                .context(format!("Selecting columns for '{}'", entry.name))?;
            let out = entry
                .pipeline
                .transform(&input)
                .context(format!("Transforming '{}'", entry.name))?;
            outputs.push(out);
        }
        hstack_outputs(outputs)
    }

    fn feature_names_out(&self) -> Vec<String> {
        self.entries
            .iter()
            .flat_map(|entry| entry.pipeline.feature_names_out())
            .collect()
    }
}

/// Concatenate entry outputs column-wise. Output names must not collide.
fn hstack_outputs(outputs: Vec<DataFrame>) -> Result<DataFrame> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for frame in outputs {
        for col in frame.get_columns() {
            let name = col.name().to_string();
            if !seen.insert(name.clone()) {
                return Err(TransformationError::SchemaMismatch(format!(
                    "output column '{}' is produced by more than one entry",
                    name
                )));
            }
            columns.push(col.as_materialized_series().clone());
        }
    }
    frame_from_series(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeatureEngineeringConfig, ScalingStrategy};
    use crate::transformers::{FeatureEngineering, NullImputer};

    fn impute_and_encode() -> Pipeline {
        Pipeline::new(vec![
            ("imputer", NullImputer::default().into()),
            (
                "feat_engineering",
                FeatureEngineering::new(FeatureEngineeringConfig {
                    derived_features: vec![],
                    interactions: false,
                    scaling: ScalingStrategy::None,
                })
                .into(),
            ),
        ])
        .unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_unclaimed_columns_are_dropped() {
        let df = df![
            "age" => [30.0, 40.0],
            "id" => [1i64, 2],
            "smoker_status" => [0i64, 1],
        ]
        .unwrap();

        let ct = ColumnTransformer::new()
            .with_entry("df_pipeline", impute_and_encode(), cols(&["age"]))
            .unwrap();
        let (fitted, out) = ct.fit_transform(&df).unwrap();

        assert_eq!(crate::utils::column_names(&out), vec!["age"]);
        assert_eq!(fitted.n_features_in(), 1);
        assert_eq!(fitted.feature_names_out(), vec!["age"]);
    }

    #[test]
    fn test_entries_are_concatenated_in_order() {
        let df = df![
            "a" => [1.0, 2.0],
            "b" => [3.0, 4.0],
        ]
        .unwrap();

        let ct = ColumnTransformer::new()
            .with_entry("second", impute_and_encode(), cols(&["b"]))
            .unwrap()
            .with_entry("first", impute_and_encode(), cols(&["a"]))
            .unwrap();
        let fitted = ct.fit(&df).unwrap();
        let array = fitted.transform_array(&df).unwrap();

        assert_eq!(fitted.feature_names_out(), vec!["b", "a"]);
        assert_eq!(array.row(0).to_vec(), vec![3.0, 1.0]);
        assert_eq!(array.row(1).to_vec(), vec![4.0, 2.0]);
    }

    #[test]
    fn test_fit_transform_matches_fitted_transform() {
        let df = df![
            "age" => [Some(20.0), None, Some(40.0)],
            "sex" => [Some("F"), Some("M"), None],
        ]
        .unwrap();

        let ct = ColumnTransformer::new()
            .with_entry("df_pipeline", impute_and_encode(), cols(&["age", "sex"]))
            .unwrap();
        let (fitted, out) = ct.fit_transform(&df).unwrap();

        let from_fit = frame_to_array(&out, df.height()).unwrap();
        let from_transform = fitted.transform_array(&df).unwrap();
        assert_eq!(from_fit, from_transform);
        assert_eq!(from_fit.column(0).to_vec(), vec![20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_duplicate_entry_rejected() {
        let err = ColumnTransformer::new()
            .with_entry("p", impute_and_encode(), cols(&["a"]))
            .unwrap()
            .with_entry("p", impute_and_encode(), cols(&["b"]))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_colliding_outputs_rejected() {
        let df = df!["a" => [1.0, 2.0]].unwrap();
        let err = ColumnTransformer::new()
            .with_entry("one", impute_and_encode(), cols(&["a"]))
            .unwrap()
            .with_entry("two", impute_and_encode(), cols(&["a"]))
            .unwrap()
            .fit(&df)
            .unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn test_missing_column_at_transform() {
        let train = df!["a" => [1.0], "b" => [2.0]].unwrap();
        let test = df!["a" => [1.0]].unwrap();

        let fitted = ColumnTransformer::new()
            .with_entry("df_pipeline", impute_and_encode(), cols(&["a", "b"]))
            .unwrap()
            .fit(&train)
            .unwrap();
        let err = fitted.transform(&test).unwrap_err();

        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.to_string().contains("Selecting columns for 'df_pipeline'"));
    }

    #[test]
    fn test_empty_feature_set_keeps_row_count() {
        let df = df!["smoker_status" => [0i64, 1, 1]].unwrap();

        let fitted = ColumnTransformer::new().fit(&df).unwrap();
        let array = fitted.transform_array(&df).unwrap();

        assert_eq!(array.dim(), (3, 0));
    }
}
