//! File input and output: CSV datasets in, arrays and fitted objects out.

use crate::error::{Result, ResultExt, TransformationError};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use polars::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Version of the persisted artifact layout.
pub const FORMAT_VERSION: u32 = 1;

/// Cell values read as missing, in addition to empty fields.
pub const NULL_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load a CSV file with a header row.
///
/// The whole file is scanned for schema inference so a column whose first
/// rows are integers and later rows are floats still reads as floats.
/// Any of [`NULL_MARKERS`] is read as a null, so a numeric column that
/// marks gaps with `NA` still infers as numeric.
pub fn read_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(TransformationError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("CSV file not found: {}", path.display()),
        )));
    }

    let df = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(NullValues::AllColumns(
                    NULL_MARKERS.iter().map(|marker| (*marker).into()).collect(),
                ))),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("Reading {}", path.display()))?;

    debug!("Loaded {}: {:?}", path.display(), df.shape());
    Ok(df)
}

/// Write a numeric matrix as CSV with the given header.
pub fn write_array_csv(path: impl AsRef<Path>, array: &Array2<f64>, header: &[String]) -> Result<()> {
    let path = path.as_ref();
    if header.len() != array.ncols() {
        return Err(TransformationError::SchemaMismatch(format!(
            "{} header names for {} array columns",
            header.len(),
            array.ncols()
        )));
    }

    let columns: Vec<Column> = header
        .iter()
        .zip(array.columns())
        .map(|(name, values)| Column::new(name.as_str().into(), values.to_vec()))
        .collect();
    let mut df = DataFrame::new(columns)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path).context(format!("Creating {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(&mut df)?;

    info!("Array saved: {}", path.display());
    Ok(())
}

/// Envelope written around a persisted object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub target_column: String,
    pub preprocessor: T,
}

/// Persist `object` as pretty JSON at `path`.
///
/// Parent directories are created. The file is written to a sibling temp
/// path first and renamed into place, so a reader never sees a partial file.
pub fn save_object<T: Serialize>(path: impl AsRef<Path>, target_column: &str, object: &T) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(format!("Creating {}", parent.display()))?;
    }

    let artifact = Artifact {
        format_version: FORMAT_VERSION,
        created_at: Utc::now(),
        target_column: target_column.to_string(),
        preprocessor: object,
    };
    let json = serde_json::to_string_pretty(&artifact)?;

    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, json).context(format!("Writing {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).context(format!("Moving artifact to {}", path.display()))?;

    info!("Preprocessor saved: {}", path.display());
    Ok(path.to_path_buf())
}

/// Read an object written by [`save_object`].
pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<Artifact<T>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).context(format!("Reading {}", path.display()))?;

    let header: ArtifactHeader = serde_json::from_str(&content)?;
    if header.format_version != FORMAT_VERSION {
        return Err(TransformationError::InvalidArtifact(format!(
            "{} has format version {}, expected {}",
            path.display(),
            header.format_version,
            FORMAT_VERSION
        )));
    }

    Ok(serde_json::from_str(&content)?)
}

#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::TempDir;

    #[test]
    fn test_read_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "age,sex,smoker_status\n20,F,0\n35.5,M,1\n").unwrap();

        let df = read_csv(&path).unwrap();
        assert_eq!(df.shape(), (2, 3));
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_read_csv_null_markers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "age,sex\n20,F\nNA,null\n40,N/A\nNaN,M\n").unwrap();

        let df = read_csv(&path).unwrap();
        let age = df.column("age").unwrap();
        assert!(crate::utils::is_numeric_dtype(age.dtype()));
        assert_eq!(age.null_count(), 2);
        assert_eq!(df.column("sex").unwrap().null_count(), 2);
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = read_csv("/nonexistent/train.csv").unwrap_err();
        assert_eq!(err.error_code(), "IO_ERROR");
    }

    #[test]
    fn test_write_array_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("train_arr.csv");
        let array = array![[0.5, 1.0], [0.25, 0.0]];

        write_array_csv(&path, &array, &["age".to_string(), "smoker_status".to_string()]).unwrap();

        let df = read_csv(&path).unwrap();
        assert_eq!(crate::utils::column_names(&df), vec!["age", "smoker_status"]);
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_write_array_csv_header_mismatch() {
        let dir = TempDir::new().unwrap();
        let err = write_array_csv(dir.path().join("x.csv"), &array![[1.0, 2.0]], &["a".to_string()])
            .unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn test_save_and_load_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("artifacts").join("preprocessor.json");

        let saved = save_object(&path, "smoker_status", &vec![1.5f64, 2.5]).unwrap();
        assert_eq!(saved, path);
        assert!(!path.with_extension("json.tmp").exists());

        let artifact: Artifact<Vec<f64>> = load_object(&path).unwrap();
        assert_eq!(artifact.format_version, FORMAT_VERSION);
        assert_eq!(artifact.target_column, "smoker_status");
        assert_eq!(artifact.preprocessor, vec![1.5, 2.5]);
    }

    #[test]
    fn test_load_object_rejects_other_versions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("preprocessor.json");
        fs::write(
            &path,
            r#"{"format_version": 99, "created_at": "2024-01-01T00:00:00Z", "target_column": "y", "preprocessor": []}"#,
        )
        .unwrap();

        let err = load_object::<Vec<f64>>(&path).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARTIFACT");
    }
}
