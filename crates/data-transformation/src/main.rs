//! CLI entry point for the data transformation stage.

use anyhow::{Context, Result, anyhow};
use clap::{Parser, ValueEnum};
use data_transformation::{
    CategoricalImputation, DataTransformation, DataTransformationConfig, NumericImputation,
    ScalingStrategy, TransformationOutput, write_array_csv,
};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// CLI-compatible numeric imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNumericImputation {
    /// Use the median of non-null values
    Median,
    /// Use the mean of non-null values
    Mean,
    /// Use zero as the fill value
    Zero,
}

impl From<CliNumericImputation> for NumericImputation {
    fn from(cli: CliNumericImputation) -> Self {
        match cli {
            CliNumericImputation::Median => NumericImputation::Median,
            CliNumericImputation::Mean => NumericImputation::Mean,
            CliNumericImputation::Zero => NumericImputation::Zero,
        }
    }
}

/// CLI-compatible categorical imputation strategy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCategoricalImputation {
    /// Use the most frequent value (mode)
    Mode,
    /// Use a constant value ("Unknown")
    Constant,
}

impl From<CliCategoricalImputation> for CategoricalImputation {
    fn from(cli: CliCategoricalImputation) -> Self {
        match cli {
            CliCategoricalImputation::Mode => CategoricalImputation::Mode,
            CliCategoricalImputation::Constant => CategoricalImputation::Constant,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliScaling {
    /// Map each feature's training range onto [0, 1]
    MinMax,
    /// Zero mean, unit variance
    Standard,
    /// No scaling
    None,
}

impl From<CliScaling> for ScalingStrategy {
    fn from(cli: CliScaling) -> Self {
        match cli {
            CliScaling::MinMax => ScalingStrategy::MinMax,
            CliScaling::Standard => ScalingStrategy::Standard,
            CliScaling::None => ScalingStrategy::None,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Fit a preprocessor on a training split and apply it to both splits",
    long_about = "Reads train and test CSV files, fits an imputation and feature engineering \
                  preprocessor on the training features, transforms both splits and saves the \
                  fitted preprocessor.\n\n\
                  EXAMPLES:\n  \
                  # Default smoker-status setup\n  \
                  data-transformation --train data/train.csv --test data/test.csv\n\n  \
                  # Standard scaling, arrays written to disk\n  \
                  data-transformation --train data/train.csv --test data/test.csv \\\n      \
                  --scaling standard --output-dir outputs/"
)]
struct Args {
    /// Path to the training CSV file
    #[arg(long)]
    train: PathBuf,

    /// Path to the test CSV file
    #[arg(long)]
    test: PathBuf,

    /// Target column excluded from transformation
    ///
    /// Default: smoker_status (or the value from --config)
    #[arg(short, long)]
    target: Option<String>,

    /// Where to write the fitted preprocessor
    ///
    /// Default: artifacts/preprocessor.json (or the value from --config)
    #[arg(long)]
    preprocessor_path: Option<PathBuf>,

    /// JSON configuration file; command line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strategy for imputing missing numeric values
    #[arg(long, value_enum)]
    numeric_imputation: Option<CliNumericImputation>,

    /// Strategy for imputing missing categorical values
    #[arg(long, value_enum)]
    categorical_imputation: Option<CliCategoricalImputation>,

    /// Scaling applied to every output feature
    #[arg(long, value_enum)]
    scaling: Option<CliScaling>,

    /// Add pairwise products of the base feature columns
    #[arg(long, overrides_with = "no_interactions")]
    interactions: bool,

    /// Disable pairwise products, even when --config enables them
    #[arg(long, overrides_with = "interactions")]
    no_interactions: bool,

    /// Write train_arr.csv and test_arr.csv to this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Interaction setting from the command line, if one was given.
    fn interactions_override(&self) -> Option<bool> {
        match (self.interactions, self.no_interactions) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet);

    // Load environment variables from .env file
    dotenv().ok();

    for path in [&args.train, &args.test] {
        if !path.exists() {
            return Err(anyhow!("Input file not found: {}", path.display()));
        }
    }

    let config = build_config(&args)?;
    debug!("Configuration: {:?}", config);

    let stage = DataTransformation::new(config);
    let output = match stage.initiate_data_transformation(&args.train, &args.test) {
        Ok(output) => output,
        Err(e) => {
            let code = e.error_code();
            error!("{}", e);
            return Err(anyhow!(e).context(format!("Error code: {}", code)));
        }
    };

    if let Some(ref dir) = args.output_dir {
        write_arrays(dir, &output)?;
    }

    print_summary(&args, &output);
    Ok(())
}

/// Start from the config file (or defaults) and apply command line overrides.
fn build_config(args: &Args) -> Result<DataTransformationConfig> {
    let base = match args.config {
        Some(ref path) => DataTransformationConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DataTransformationConfig::default(),
    };

    let config = DataTransformationConfig::builder()
        .preprocessor_obj_file_path(
            args.preprocessor_path
                .clone()
                .unwrap_or(base.preprocessor_obj_file_path),
        )
        .target_column(args.target.clone().unwrap_or(base.target_column))
        .numeric_imputation(
            args.numeric_imputation
                .map(Into::into)
                .unwrap_or(base.imputer.numeric),
        )
        .categorical_imputation(
            args.categorical_imputation
                .map(Into::into)
                .unwrap_or(base.imputer.categorical),
        )
        .derived_features(base.feature_engineering.derived_features)
        .interactions(
            args.interactions_override()
                .unwrap_or(base.feature_engineering.interactions),
        )
        .scaling(
            args.scaling
                .map(Into::into)
                .unwrap_or(base.feature_engineering.scaling),
        )
        .build()?;

    Ok(config)
}

fn write_arrays(dir: &Path, output: &TransformationOutput) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    write_array_csv(dir.join("train_arr.csv"), &output.train_arr, &output.column_names)?;
    write_array_csv(dir.join("test_arr.csv"), &output.test_arr, &output.column_names)?;
    info!("Arrays written to: {}", dir.display());
    Ok(())
}

/// Print a human-readable summary of the transformation.
fn print_summary(args: &Args, output: &TransformationOutput) {
    println!();
    println!("{}", "=".repeat(80));
    println!("DATA TRANSFORMATION COMPLETE");
    println!("{}", "=".repeat(80));
    println!();
    println!(
        "Train: {} -> {} rows x {} columns",
        args.train.display(),
        output.train_arr.nrows(),
        output.train_arr.ncols()
    );
    println!(
        "Test:  {} -> {} rows x {} columns",
        args.test.display(),
        output.test_arr.nrows(),
        output.test_arr.ncols()
    );
    println!("Preprocessor: {}", output.preprocessor_path.display());
    println!();

    let (features, target) = output.column_names.split_at(output.column_names.len().saturating_sub(1));
    println!("Features ({}):", features.len());
    for name in features.iter().take(20) {
        println!("  - {}", name);
    }
    if features.len() > 20 {
        println!("  ... and {} more", features.len() - 20);
    }
    if let Some(target) = target.first() {
        println!("Target (last column): {}", target);
    }

    if let Some(ref dir) = args.output_dir {
        println!();
        println!("Arrays: {}/train_arr.csv, {}/test_arr.csv", dir.display(), dir.display());
    }
    println!("{}", "=".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["data-transformation", "--train", "train.csv", "--test", "test.csv"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    fn config_with_interactions(dir: &TempDir) -> String {
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "preprocessor_obj_file_path": "artifacts/preprocessor.json",
                "target_column": "smoker_status",
                "feature_engineering": { "interactions": true }
            }"#,
        )
        .unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn test_interactions_default_off() {
        let config = build_config(&parse(&[])).unwrap();
        assert!(!config.feature_engineering.interactions);

        let config = build_config(&parse(&["--interactions"])).unwrap();
        assert!(config.feature_engineering.interactions);
    }

    #[test]
    fn test_no_interactions_overrides_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = config_with_interactions(&dir);

        let from_file = build_config(&parse(&["--config", &config_path])).unwrap();
        assert!(from_file.feature_engineering.interactions);

        let overridden =
            build_config(&parse(&["--config", &config_path, "--no-interactions"])).unwrap();
        assert!(!overridden.feature_engineering.interactions);
    }

    #[test]
    fn test_last_interaction_flag_wins() {
        let args = parse(&["--interactions", "--no-interactions"]);
        assert_eq!(args.interactions_override(), Some(false));

        let args = parse(&["--no-interactions", "--interactions"]);
        assert_eq!(args.interactions_override(), Some(true));
    }
}
