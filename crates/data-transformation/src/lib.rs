//! Data Transformation Stage
//!
//! Turns raw train/test CSV splits into model-ready numeric matrices using a
//! preprocessor fitted on the training split only, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Imputation**: nulls are filled with statistics learned from training data
//! - **Feature Engineering**: text columns are ordinal-encoded, health-metric
//!   ratios are derived, and every feature is scaled
//! - **Column Scoping**: the preprocessor only sees the feature columns; the
//!   target bypasses it and is appended as the last output column
//! - **Persistence**: the fitted preprocessor is written as a JSON artifact and
//!   can be reloaded to transform new data identically
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use data_transformation::{DataTransformation, DataTransformationConfig};
//!
//! let config = DataTransformationConfig::builder()
//!     .target_column("smoker_status")
//!     .preprocessor_obj_file_path("artifacts/preprocessor.json")
//!     .build()?;
//!
//! let output = DataTransformation::new(config)
//!     .initiate_data_transformation("data/train.csv", "data/test.csv")?;
//!
//! println!("train: {:?}", output.train_arr.dim());
//! println!("test: {:?}", output.test_arr.dim());
//! println!("preprocessor: {}", output.preprocessor_path.display());
//! ```
//!
//! # Reusing a Fitted Preprocessor
//!
//! ```rust,ignore
//! use data_transformation::{DataTransformation, FittedTransformer};
//!
//! let preprocessor = DataTransformation::load_preprocessor("artifacts/preprocessor.json")?;
//! let features = preprocessor.transform_array(&new_rows)?;
//! ```

pub mod components;
pub mod config;
pub mod error;
pub mod io;
pub mod transformers;
pub mod utils;

// Re-exports for convenient access
pub use components::{DataTransformation, TransformationOutput};
pub use config::{
    CategoricalImputation, ConfigValidationError, DataTransformationConfig,
    DataTransformationConfigBuilder, DerivedFeature, DerivedFeatureKind, FeatureEngineeringConfig,
    ImputerConfig, NumericImputation, ScalingStrategy,
};
pub use error::{Result as TransformationResult, ResultExt, TRANSFORMATION_FAILURE, TransformationError};
pub use io::{Artifact, load_object, read_csv, save_object, write_array_csv};
pub use transformers::{
    ColumnTransformer, FeatureEngineering, FittedColumnTransformer, FittedFeatureEngineering,
    FittedNullImputer, FittedPipeline, FittedTransformer, NullImputer, Pipeline, PipelineStep,
    Transformer,
};
