//! Configuration types for the data transformation stage.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic setup.

use crate::error::TransformationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default location of the persisted preprocessor.
pub const DEFAULT_PREPROCESSOR_PATH: &str = "artifacts/preprocessor.json";

/// Default name of the label column.
pub const DEFAULT_TARGET_COLUMN: &str = "smoker_status";

/// Strategy for imputing missing numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NumericImputation {
    /// Use the median of non-null training values
    #[default]
    Median,
    /// Use the mean of non-null training values
    Mean,
    /// Use a constant value (0.0)
    Zero,
}

/// Strategy for imputing missing categorical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CategoricalImputation {
    /// Use the most frequent training value (mode)
    #[default]
    Mode,
    /// Use a constant value ("Unknown")
    Constant,
}

/// Scaling applied as the last feature engineering step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ScalingStrategy {
    /// Map the training range of each feature onto [0, 1]
    #[default]
    MinMax,
    /// Zero mean and unit (population) standard deviation
    Standard,
    /// Leave values as they are
    None,
}

/// How a derived feature is computed from existing columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DerivedFeatureKind {
    /// `numerator / denominator` (0.0 when the denominator is zero)
    Ratio {
        numerator: String,
        denominator: String,
    },
    /// `left * right`
    Product { left: String, right: String },
    /// `left - right`
    Difference { left: String, right: String },
    /// `ln(1 + x)`, with `x` clamped at 0.0
    Log1p { column: String },
    /// `weight_kg / (height_cm / 100)^2`
    BodyMassIndex { weight_kg: String, height_cm: String },
}

impl DerivedFeatureKind {
    /// Columns that must be present for the feature to be computed.
    pub fn source_columns(&self) -> Vec<&str> {
        match self {
            Self::Ratio {
                numerator,
                denominator,
            } => vec![numerator.as_str(), denominator.as_str()],
            Self::Product { left, right } | Self::Difference { left, right } => {
                vec![left.as_str(), right.as_str()]
            }
            Self::Log1p { column } => vec![column.as_str()],
            Self::BodyMassIndex {
                weight_kg,
                height_cm,
            } => vec![weight_kg.as_str(), height_cm.as_str()],
        }
    }
}

/// A named feature computed from other columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeature {
    pub name: String,
    pub kind: DerivedFeatureKind,
}

impl DerivedFeature {
    pub fn new(name: impl Into<String>, kind: DerivedFeatureKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn ratio(name: &str, numerator: &str, denominator: &str) -> Self {
        Self::new(
            name,
            DerivedFeatureKind::Ratio {
                numerator: numerator.to_string(),
                denominator: denominator.to_string(),
            },
        )
    }

    pub fn product(name: &str, left: &str, right: &str) -> Self {
        Self::new(
            name,
            DerivedFeatureKind::Product {
                left: left.to_string(),
                right: right.to_string(),
            },
        )
    }

    pub fn difference(name: &str, left: &str, right: &str) -> Self {
        Self::new(
            name,
            DerivedFeatureKind::Difference {
                left: left.to_string(),
                right: right.to_string(),
            },
        )
    }

    pub fn log1p(name: &str, column: &str) -> Self {
        Self::new(
            name,
            DerivedFeatureKind::Log1p {
                column: column.to_string(),
            },
        )
    }

    pub fn body_mass_index(name: &str, weight_kg: &str, height_cm: &str) -> Self {
        Self::new(
            name,
            DerivedFeatureKind::BodyMassIndex {
                weight_kg: weight_kg.to_string(),
                height_cm: height_cm.to_string(),
            },
        )
    }
}

/// Derived features for the smoker-status health screening dataset.
///
/// Features whose source columns are missing from a given dataset are
/// skipped when fitting, so this set is safe to use on other schemas.
pub fn smoker_status_features() -> Vec<DerivedFeature> {
    vec![
        DerivedFeature::body_mass_index("bmi", "weight(kg)", "height(cm)"),
        DerivedFeature::ratio("waist_to_height", "waist(cm)", "height(cm)"),
        DerivedFeature::ratio("ast_alt_ratio", "AST", "ALT"),
        DerivedFeature::ratio("ldl_hdl_ratio", "LDL", "HDL"),
        DerivedFeature::ratio("triglyceride_hdl_ratio", "triglyceride", "HDL"),
        DerivedFeature::difference("pulse_pressure", "systolic", "relaxation"),
    ]
}

/// Settings for the null imputation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ImputerConfig {
    #[serde(default)]
    pub numeric: NumericImputation,
    #[serde(default)]
    pub categorical: CategoricalImputation,
}

/// Settings for the feature engineering step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEngineeringConfig {
    /// Features computed from the imputed columns.
    /// Default: [`smoker_status_features`]
    #[serde(default = "smoker_status_features")]
    pub derived_features: Vec<DerivedFeature>,

    /// Whether to add pairwise products of every base column.
    /// Default: false
    #[serde(default)]
    pub interactions: bool,

    /// Scaling applied to every output feature.
    /// Default: MinMax
    #[serde(default)]
    pub scaling: ScalingStrategy,
}

impl Default for FeatureEngineeringConfig {
    fn default() -> Self {
        Self {
            derived_features: smoker_status_features(),
            interactions: false,
            scaling: ScalingStrategy::default(),
        }
    }
}

/// Configuration for the data transformation stage.
///
/// Use [`DataTransformationConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use data_transformation::config::{DataTransformationConfig, ScalingStrategy};
///
/// let config = DataTransformationConfig::builder()
///     .target_column("smoker_status")
///     .scaling(ScalingStrategy::Standard)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationConfig {
    /// Where the fitted preprocessor is written.
    /// Default: "artifacts/preprocessor.json"
    pub preprocessor_obj_file_path: PathBuf,

    /// Name of the label column excluded from transformation.
    /// Default: "smoker_status"
    pub target_column: String,

    /// Null imputation settings.
    #[serde(default)]
    pub imputer: ImputerConfig,

    /// Feature engineering settings.
    #[serde(default)]
    pub feature_engineering: FeatureEngineeringConfig,
}

impl Default for DataTransformationConfig {
    fn default() -> Self {
        Self {
            preprocessor_obj_file_path: PathBuf::from(DEFAULT_PREPROCESSOR_PATH),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            imputer: ImputerConfig::default(),
            feature_engineering: FeatureEngineeringConfig::default(),
        }
    }
}

impl DataTransformationConfig {
    /// Create a new configuration builder.
    pub fn builder() -> DataTransformationConfigBuilder {
        DataTransformationConfigBuilder::default()
    }

    /// Read and validate a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.target_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTargetColumn);
        }

        if self.preprocessor_obj_file_path.as_os_str().is_empty() {
            return Err(ConfigValidationError::EmptyPreprocessorPath);
        }

        let mut seen = HashSet::new();
        for feature in &self.feature_engineering.derived_features {
            if feature.name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyFeatureName);
            }
            if !seen.insert(feature.name.as_str()) {
                return Err(ConfigValidationError::DuplicateFeatureName(
                    feature.name.clone(),
                ));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Target column name must not be empty")]
    EmptyTargetColumn,

    #[error("Preprocessor file path must not be empty")]
    EmptyPreprocessorPath,

    #[error("Derived feature name must not be empty")]
    EmptyFeatureName,

    #[error("Derived feature '{0}' is defined more than once")]
    DuplicateFeatureName(String),
}

impl From<ConfigValidationError> for TransformationError {
    fn from(err: ConfigValidationError) -> Self {
        TransformationError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`DataTransformationConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct DataTransformationConfigBuilder {
    preprocessor_obj_file_path: Option<PathBuf>,
    target_column: Option<String>,
    numeric_imputation: Option<NumericImputation>,
    categorical_imputation: Option<CategoricalImputation>,
    derived_features: Option<Vec<DerivedFeature>>,
    interactions: Option<bool>,
    scaling: Option<ScalingStrategy>,
}

impl DataTransformationConfigBuilder {
    /// Set where the fitted preprocessor is saved.
    pub fn preprocessor_obj_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.preprocessor_obj_file_path = Some(path.into());
        self
    }

    /// Set the label column name.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the numeric imputation strategy.
    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.numeric_imputation = Some(strategy);
        self
    }

    /// Set the categorical imputation strategy.
    pub fn categorical_imputation(mut self, strategy: CategoricalImputation) -> Self {
        self.categorical_imputation = Some(strategy);
        self
    }

    /// Replace the derived feature list.
    ///
    /// Pass an empty list to disable derived features entirely.
    pub fn derived_features(mut self, features: Vec<DerivedFeature>) -> Self {
        self.derived_features = Some(features);
        self
    }

    /// Enable or disable pairwise interaction features.
    pub fn interactions(mut self, enable: bool) -> Self {
        self.interactions = Some(enable);
        self
    }

    /// Set the scaling strategy.
    pub fn scaling(mut self, strategy: ScalingStrategy) -> Self {
        self.scaling = Some(strategy);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `DataTransformationConfig` or an error if validation fails.
    pub fn build(self) -> Result<DataTransformationConfig, ConfigValidationError> {
        let config = DataTransformationConfig {
            preprocessor_obj_file_path: self
                .preprocessor_obj_file_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PREPROCESSOR_PATH)),
            target_column: self
                .target_column
                .unwrap_or_else(|| DEFAULT_TARGET_COLUMN.to_string()),
            imputer: ImputerConfig {
                numeric: self.numeric_imputation.unwrap_or_default(),
                categorical: self.categorical_imputation.unwrap_or_default(),
            },
            feature_engineering: FeatureEngineeringConfig {
                derived_features: self
                    .derived_features
                    .unwrap_or_else(smoker_status_features),
                interactions: self.interactions.unwrap_or(false),
                scaling: self.scaling.unwrap_or_default(),
            },
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DataTransformationConfig::default();
        assert_eq!(
            config.preprocessor_obj_file_path,
            PathBuf::from("artifacts/preprocessor.json")
        );
        assert_eq!(config.target_column, "smoker_status");
        assert_eq!(config.imputer.numeric, NumericImputation::Median);
        assert_eq!(config.imputer.categorical, CategoricalImputation::Mode);
        assert_eq!(config.feature_engineering.scaling, ScalingStrategy::MinMax);
        assert!(!config.feature_engineering.interactions);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = DataTransformationConfig::builder().build().unwrap();
        assert_eq!(config, DataTransformationConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = DataTransformationConfig::builder()
            .target_column("label")
            .preprocessor_obj_file_path("out/prep.json")
            .numeric_imputation(NumericImputation::Mean)
            .categorical_imputation(CategoricalImputation::Constant)
            .derived_features(vec![])
            .interactions(true)
            .scaling(ScalingStrategy::Standard)
            .build()
            .unwrap();

        assert_eq!(config.target_column, "label");
        assert_eq!(config.preprocessor_obj_file_path, PathBuf::from("out/prep.json"));
        assert_eq!(config.imputer.numeric, NumericImputation::Mean);
        assert_eq!(config.imputer.categorical, CategoricalImputation::Constant);
        assert!(config.feature_engineering.derived_features.is_empty());
        assert!(config.feature_engineering.interactions);
        assert_eq!(config.feature_engineering.scaling, ScalingStrategy::Standard);
    }

    #[test]
    fn test_validation_empty_target() {
        let result = DataTransformationConfig::builder().target_column("  ").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::EmptyTargetColumn
        ));
    }

    #[test]
    fn test_validation_duplicate_feature_names() {
        let result = DataTransformationConfig::builder()
            .derived_features(vec![
                DerivedFeature::ratio("r", "a", "b"),
                DerivedFeature::product("r", "a", "b"),
            ])
            .build();

        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::DuplicateFeatureName(name) if name == "r"
        ));
    }

    #[test]
    fn test_validation_error_converts_to_invalid_config() {
        let err: TransformationError = ConfigValidationError::EmptyPreprocessorPath.into();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_source_columns() {
        let bmi = DerivedFeature::body_mass_index("bmi", "weight(kg)", "height(cm)");
        assert_eq!(bmi.kind.source_columns(), vec!["weight(kg)", "height(cm)"]);

        let log = DerivedFeature::log1p("log_gtp", "Gtp");
        assert_eq!(log.kind.source_columns(), vec!["Gtp"]);
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "preprocessor_obj_file_path": "artifacts/custom.json",
            "target_column": "smoking",
            "imputer": { "numeric": "Mean", "categorical": "Constant" },
            "feature_engineering": {
                "derived_features": [
                    { "name": "bmi", "kind": { "type": "body_mass_index", "weight_kg": "w", "height_cm": "h" } },
                    { "name": "r", "kind": { "type": "ratio", "numerator": "a", "denominator": "b" } }
                ],
                "interactions": true,
                "scaling": "None"
            }
        }"#;

        let config: DataTransformationConfig =
            serde_json::from_str(json).expect("Should deserialize from JSON");

        assert_eq!(config.target_column, "smoking");
        assert_eq!(config.imputer.numeric, NumericImputation::Mean);
        assert_eq!(config.feature_engineering.derived_features.len(), 2);
        assert_eq!(
            config.feature_engineering.derived_features[0].kind,
            DerivedFeatureKind::BodyMassIndex {
                weight_kg: "w".to_string(),
                height_cm: "h".to_string()
            }
        );
        assert_eq!(config.feature_engineering.scaling, ScalingStrategy::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_feature_engineering_json_keeps_defaults() {
        let json = r#"{
            "preprocessor_obj_file_path": "artifacts/preprocessor.json",
            "target_column": "smoker_status",
            "feature_engineering": { "interactions": true }
        }"#;

        let config: DataTransformationConfig = serde_json::from_str(json).unwrap();

        assert!(config.feature_engineering.interactions);
        assert_eq!(
            config.feature_engineering.derived_features,
            smoker_status_features()
        );
        assert_eq!(config.feature_engineering.scaling, ScalingStrategy::MinMax);
    }

    #[test]
    fn test_config_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = DataTransformationConfig::builder()
            .target_column("label")
            .build()
            .unwrap();
        std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = DataTransformationConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
