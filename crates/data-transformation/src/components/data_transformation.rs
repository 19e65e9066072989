//! Data transformation stage.
//!
//! Reads the train and test splits, fits the preprocessor on the training
//! features only, applies it to both splits and persists it. The target
//! column bypasses the preprocessor and is appended as the last column of
//! each output array.

use crate::config::DataTransformationConfig;
use crate::error::{Result, ResultExt, TRANSFORMATION_FAILURE, TransformationError};
use crate::io::{read_csv, save_object};
use crate::transformers::{
    ColumnTransformer, FeatureEngineering, FittedColumnTransformer, FittedTransformer,
    NullImputer, Pipeline, Transformer,
};
use crate::utils::{column_names, frame_to_array, select_columns, series_to_f64};
use ndarray::{Array1, Array2, Axis, concatenate};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the single column transformer entry.
pub const PIPELINE_NAME: &str = "df_pipeline";

/// Result of a successful transformation run.
#[derive(Debug, Clone)]
pub struct TransformationOutput {
    /// Transformed training features with the target as the last column.
    pub train_arr: Array2<f64>,
    /// Transformed test features with the target as the last column.
    pub test_arr: Array2<f64>,
    /// Where the fitted preprocessor was written.
    pub preprocessor_path: PathBuf,
    /// Column names of both arrays, target last.
    pub column_names: Vec<String>,
}

/// Builds, fits and persists the preprocessor for a train/test pair.
#[derive(Debug, Clone, Default)]
pub struct DataTransformation {
    config: DataTransformationConfig,
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DataTransformationConfig {
        &self.config
    }

    /// Build the unfitted preprocessor for the given feature columns.
    ///
    /// One `"df_pipeline"` entry runs `imputer` then `feat_engineering` over
    /// exactly `columns`; any other column is dropped. Column existence is
    /// only checked when the result is fitted.
    pub fn get_data_transformer_object(&self, columns: &[String]) -> Result<ColumnTransformer> {
        let pipeline = Pipeline::new(vec![
            ("imputer", NullImputer::from_config(&self.config.imputer).into()),
            (
                "feat_engineering",
                FeatureEngineering::new(self.config.feature_engineering.clone()).into(),
            ),
        ])?;

        ColumnTransformer::new().with_entry(PIPELINE_NAME, pipeline, columns.to_vec())
    }

    /// Run the whole stage on two CSV files.
    ///
    /// Any failure comes back wrapped as a transformation failure
    /// ([`TransformationError::is_transformation_failure`]). The preprocessor
    /// is written last, so a failed run leaves no new artifact behind.
    pub fn initiate_data_transformation(
        &self,
        train_path: impl AsRef<Path>,
        test_path: impl AsRef<Path>,
    ) -> Result<TransformationOutput> {
        self.run(train_path.as_ref(), test_path.as_ref())
            .context(TRANSFORMATION_FAILURE)
    }

    fn run(&self, train_path: &Path, test_path: &Path) -> Result<TransformationOutput> {
        let train_df = read_csv(train_path)?;
        let test_df = read_csv(test_path)?;
        info!("Read train and test data completed");
        debug!(
            "Train shape: {:?}, test shape: {:?}",
            train_df.shape(),
            test_df.shape()
        );

        let target = self.config.target_column.as_str();
        let (train_features, train_target) = split_target(&train_df, target, "train")?;
        let (test_features, test_target) = split_target(&test_df, target, "test")?;

        info!("Obtaining preprocessing object");
        let feature_columns = column_names(&train_features);
        let preprocessor = self.get_data_transformer_object(&feature_columns)?;

        info!("Applying preprocessing object on training and testing dataframes");
        let (fitted, train_out) = preprocessor.fit_transform(&train_features)?;
        let train_features_arr = frame_to_array(&train_out, train_features.height())?;
        let test_features_arr = fitted.transform_array(&test_features)?;

        let train_arr = append_target(&train_features_arr, train_target)?;
        let test_arr = append_target(&test_features_arr, test_target)?;

        let preprocessor_path = save_object(
            &self.config.preprocessor_obj_file_path,
            target,
            &fitted,
        )?;

        let mut column_names = fitted.feature_names_out();
        column_names.push(target.to_string());

        info!(
            "Data transformation completed: train {:?}, test {:?}",
            train_arr.dim(),
            test_arr.dim()
        );

        Ok(TransformationOutput {
            train_arr,
            test_arr,
            preprocessor_path,
            column_names,
        })
    }

    /// Load a preprocessor written by [`initiate_data_transformation`](Self::initiate_data_transformation).
    pub fn load_preprocessor(path: impl AsRef<Path>) -> Result<FittedColumnTransformer> {
        let artifact = crate::io::load_object::<FittedColumnTransformer>(path)?;
        Ok(artifact.preprocessor)
    }
}

/// Split a frame into its feature columns and the target as floats.
///
/// Target nulls become `NaN`; a target that is not numeric is an error.
fn split_target(df: &DataFrame, target: &str, dataset: &str) -> Result<(DataFrame, Vec<f64>)> {
    let target_series = df
        .column(target)
        .map(|col| col.as_materialized_series())
        .map_err(|_| TransformationError::TargetColumnMissing {
            column: target.to_string(),
            dataset: dataset.to_string(),
        })?;
    let target_values = series_to_f64(target_series)?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    let feature_columns: Vec<String> = column_names(df)
        .into_iter()
        .filter(|name| name != target)
        .collect();
    let features = select_columns(df, &feature_columns)?;

    Ok((features, target_values))
}

/// Append the target as the last column.
fn append_target(features: &Array2<f64>, target: Vec<f64>) -> Result<Array2<f64>> {
    let target = Array1::from_vec(target).insert_axis(Axis(1));
    Ok(concatenate(Axis(1), &[features.view(), target.view()])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalingStrategy;
    use polars::prelude::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn transformation(dir: &TempDir) -> DataTransformation {
        let config = DataTransformationConfig::builder()
            .preprocessor_obj_file_path(dir.path().join("artifacts").join("preprocessor.json"))
            .derived_features(vec![])
            .scaling(ScalingStrategy::None)
            .build()
            .unwrap();
        DataTransformation::new(config)
    }

    #[test]
    fn test_transformer_object_layout() {
        let ct = DataTransformation::default()
            .get_data_transformer_object(&["age".to_string(), "sex".to_string()])
            .unwrap();

        let entries = ct.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, PIPELINE_NAME);
        assert_eq!(entries[0].columns, vec!["age", "sex"]);
        assert_eq!(entries[0].pipeline.step_names(), vec!["imputer", "feat_engineering"]);
    }

    #[test]
    fn test_split_target() {
        let df = df![
            "age" => [20.0, 30.0],
            "smoker_status" => [Some(1i64), None],
        ]
        .unwrap();

        let (features, target) = split_target(&df, "smoker_status", "train").unwrap();
        assert_eq!(column_names(&features), vec!["age"]);
        assert_eq!(target[0], 1.0);
        assert!(target[1].is_nan());
    }

    #[test]
    fn test_split_target_missing() {
        let df = df!["age" => [20.0]].unwrap();
        let err = split_target(&df, "smoker_status", "test").unwrap_err();
        assert!(matches!(
            err,
            TransformationError::TargetColumnMissing { ref dataset, .. } if dataset == "test"
        ));
    }

    #[test]
    fn test_append_target_is_last_column() {
        let features = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let combined = append_target(&features, vec![0.0, 1.0]).unwrap();
        assert_eq!(combined.dim(), (2, 3));
        assert_eq!(combined.column(2).to_vec(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_initiate_data_transformation() {
        let dir = TempDir::new().unwrap();
        let train = write_csv(&dir, "train.csv", "age,sex,smoker_status\n20,F,0\n,M,1\n40,F,1\n");
        let test = write_csv(&dir, "test.csv", "age,sex,smoker_status\n,M,0\n50,F,1\n");

        let output = transformation(&dir)
            .initiate_data_transformation(&train, &test)
            .unwrap();

        assert_eq!(output.train_arr.dim(), (3, 3));
        assert_eq!(output.test_arr.dim(), (2, 3));
        assert_eq!(output.column_names, vec!["age", "sex", "smoker_status"]);
        // Test nulls take the training median
        assert_eq!(output.test_arr[[0, 0]], 30.0);
        assert_eq!(output.test_arr.column(2).to_vec(), vec![0.0, 1.0]);
        assert!(output.preprocessor_path.exists());
    }

    #[test]
    fn test_failure_is_wrapped_and_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let train = write_csv(&dir, "train.csv", "age,smoker_status\n20,0\n");
        let test = write_csv(&dir, "test.csv", "age\n20\n");
        let stage = transformation(&dir);

        let err = stage.initiate_data_transformation(&train, &test).unwrap_err();

        assert!(err.is_transformation_failure());
        assert_eq!(err.error_code(), "TARGET_COLUMN_MISSING");
        assert!(!stage.config().preprocessor_obj_file_path.exists());
    }

    #[test]
    fn test_missing_input_file() {
        let dir = TempDir::new().unwrap();
        let test = write_csv(&dir, "test.csv", "age,smoker_status\n20,0\n");

        let err = transformation(&dir)
            .initiate_data_transformation(dir.path().join("absent.csv"), &test)
            .unwrap_err();

        assert!(err.is_transformation_failure());
        assert_eq!(err.error_code(), "IO_ERROR");
    }
}
