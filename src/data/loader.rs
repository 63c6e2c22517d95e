//! CSV Data Loader Module
//! Loads raw OHLCV and processed feature CSVs using Polars.

use std::path::{Path, PathBuf};

use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use super::timestamp::parse_timestamp_millis;
use crate::paths::{DataKind, ProjectLayout};

/// Default processed dataset name.
pub const DEFAULT_PROCESSED_FILE: &str = "spy_featured.csv";

/// Columns every raw OHLCV file must provide.
pub const REQUIRED_COLUMNS: [&str; 5] = ["time", "open", "high", "low", "close"];

/// Accepted names for the timestamp column, in priority order.
const TIME_COLUMN_ALIASES: [&str; 3] = ["time", "date", "Date"];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("{message}")]
    NotFound { message: String, path: PathBuf },
    #[error("Missing required columns: {0:?}")]
    MissingColumns(Vec<String>),
    #[error("Invalid timestamp {value:?} in column '{column}' at row {row}")]
    InvalidTimestamp {
        column: String,
        row: usize,
        value: String,
    },
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
}

/// Which raw file to load. Defaults auto-detect `SPY*.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataQuery {
    /// Exact file name under `data/raw`; skips auto-detection.
    pub filename: Option<String>,
    pub pattern: String,
    pub symbol: String,
}

impl Default for RawDataQuery {
    fn default() -> Self {
        Self {
            filename: None,
            pattern: "SPY*.csv".to_string(),
            symbol: "SPY".to_string(),
        }
    }
}

impl RawDataQuery {
    pub fn file(filename: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            ..Self::default()
        }
    }

    /// Auto-detect `<symbol>*.csv`.
    pub fn symbol(symbol: &str) -> Self {
        Self {
            filename: None,
            pattern: format!("{}*.csv", symbol),
            symbol: symbol.to_string(),
        }
    }
}

/// Loads datasets from the `data/` tree of a project.
pub struct DataLoader {
    layout: ProjectLayout,
}

impl DataLoader {
    pub fn new(layout: ProjectLayout) -> Self {
        Self { layout }
    }

    /// Discover the project root from the current directory.
    pub fn discover() -> Self {
        Self::new(ProjectLayout::discover())
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    /// Locate the raw CSV a query refers to.
    pub fn locate_raw(&self, query: &RawDataQuery) -> Result<PathBuf, LoaderError> {
        if let Some(filename) = &query.filename {
            let path = self.layout.resolve_data_path(filename, DataKind::Raw);
            if !path.exists() {
                return Err(LoaderError::NotFound {
                    message: format!("Raw data file not found: {}", path.display()),
                    path,
                });
            }
            return Ok(path);
        }

        if let Some(path) = self.layout.find_data_file(&query.pattern, DataKind::Raw) {
            return Ok(path);
        }

        let fallback = format!("{}*.csv", query.symbol);
        debug!(
            "Nothing matched {}, retrying with {}",
            query.pattern, fallback
        );
        if let Some(path) = self.layout.find_data_file(&fallback, DataKind::Raw) {
            return Ok(path);
        }

        let raw_dir = self.layout.data_dir(DataKind::Raw);
        Err(LoaderError::NotFound {
            message: format!(
                "No {} CSV files found in {}. Please ensure raw data exists or specify filename directly.",
                query.symbol,
                raw_dir.display()
            ),
            path: raw_dir,
        })
    }

    /// Load raw OHLCV data.
    ///
    /// Output has a UTC `time` column, is sorted by it, and is guaranteed to
    /// contain `time, open, high, low, close`.
    pub fn load_raw(&self, query: &RawDataQuery) -> Result<DataFrame, LoaderError> {
        let csv_path = self.locate_raw(query)?;
        let mut df = read_csv(&csv_path)?;

        let time_source = TIME_COLUMN_ALIASES
            .into_iter()
            .find(|name| has_column(&df, name));
        if let Some(source) = time_source {
            if source != "time" {
                df.rename(source, "time".into())?;
            }
            normalize_time_column(&mut df, source)?;
            df = sort_by_time(&df)?;
        }

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| !has_column(&df, name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LoaderError::MissingColumns(missing));
        }

        info!(
            "Loaded {} raw rows from {}",
            df.height(),
            csv_path.display()
        );
        Ok(df)
    }

    /// Load a processed feature file from `data/processed`.
    ///
    /// A `time` column, when present, is converted to UTC and used for
    /// ordering. Columns are not validated.
    pub fn load_processed(&self, filename: &str) -> Result<DataFrame, LoaderError> {
        let csv_path = self.layout.resolve_data_path(filename, DataKind::Processed);
        if !csv_path.exists() {
            return Err(LoaderError::NotFound {
                message: format!(
                    "Processed data file not found: {}\nPlease ensure processed data exists in {}",
                    csv_path.display(),
                    self.layout.data_dir(DataKind::Processed).display()
                ),
                path: csv_path,
            });
        }

        let mut df = read_csv(&csv_path)?;
        if has_column(&df, "time") {
            normalize_time_column(&mut df, "time")?;
            df = sort_by_time(&df)?;
        }

        info!(
            "Loaded {} processed rows from {}",
            df.height(),
            csv_path.display()
        );
        Ok(df)
    }
}

/// Load raw OHLCV data, auto-detecting the file when `query.filename` is unset.
///
/// # Example
/// ```no_run
/// use trading_lab::{load_raw_data, RawDataQuery};
///
/// let df = load_raw_data(&RawDataQuery::default()).unwrap();
/// let df = load_raw_data(&RawDataQuery::file("SPY_D1_20251228_215819.csv")).unwrap();
/// ```
pub fn load_raw_data(query: &RawDataQuery) -> Result<DataFrame, LoaderError> {
    DataLoader::discover().load_raw(query)
}

/// Load processed feature data; see [`DEFAULT_PROCESSED_FILE`].
pub fn load_processed_data(filename: &str) -> Result<DataFrame, LoaderError> {
    DataLoader::discover().load_processed(filename)
}

fn read_csv(path: &Path) -> Result<DataFrame, LoaderError> {
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(10000))
        .finish()?
        .collect()?;
    Ok(df)
}

fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Replace the `time` column with UTC millisecond datetimes.
///
/// `source` is the column's original name, used in error messages.
fn normalize_time_column(df: &mut DataFrame, source: &str) -> Result<(), LoaderError> {
    let as_text = df.column("time")?.cast(&DataType::String)?;
    let text = as_text.as_materialized_series().str()?;

    let mut millis: Vec<Option<i64>> = Vec::with_capacity(text.len());
    for (row, value) in text.into_iter().enumerate() {
        match value {
            None => millis.push(None),
            Some(raw) => match parse_timestamp_millis(raw) {
                Some(ms) => millis.push(Some(ms)),
                None => {
                    return Err(LoaderError::InvalidTimestamp {
                        column: source.to_string(),
                        row,
                        value: raw.to_string(),
                    })
                }
            },
        }
    }

    let time = Series::new("time".into(), millis)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, Some("UTC".into())))?;
    df.with_column(time)?;
    Ok(())
}

fn sort_by_time(df: &DataFrame) -> Result<DataFrame, LoaderError> {
    let sorted = df.sort(
        ["time"],
        SortMultipleOptions::default()
            .with_maintain_order(true)
            .with_nulls_last(true),
    )?;
    Ok(sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn project_with(kind: DataKind, files: &[(&str, &str)]) -> (TempDir, DataLoader) {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("data").join(kind.as_dir());
        fs::create_dir_all(&data_dir).unwrap();
        for (name, content) in files {
            fs::write(data_dir.join(name), content).unwrap();
        }
        let loader = DataLoader::new(ProjectLayout::from_root(dir.path()));
        (dir, loader)
    }

    fn time_millis(df: &DataFrame) -> Vec<Option<i64>> {
        df.column("time")
            .unwrap()
            .cast(&DataType::Int64)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_raw_date_column_is_renamed_and_sorted() {
        let csv = "Date,open,high,low,close\n\
                   2024-01-03,2.0,2.5,1.5,2.2\n\
                   2024-01-02,1.0,1.5,0.5,1.2\n";
        let (_dir, loader) = project_with(DataKind::Raw, &[("SPY_D1.csv", csv)]);

        let df = loader.load_raw(&RawDataQuery::default()).unwrap();
        assert!(has_column(&df, "time"));
        assert!(!has_column(&df, "Date"));
        assert_eq!(
            df.column("time").unwrap().dtype(),
            &DataType::Datetime(TimeUnit::Milliseconds, Some("UTC".into()))
        );

        let times = time_millis(&df);
        assert!(times[0] < times[1]);
        let close = df.column("close").unwrap().f64().unwrap().get(0);
        assert_eq!(close, Some(1.2));
    }

    #[test]
    fn test_raw_missing_close_is_validation_error() {
        let csv = "time,open,high,low\n2024-01-02,1.0,1.5,0.5\n";
        let (_dir, loader) = project_with(DataKind::Raw, &[("SPY.csv", csv)]);

        match loader.load_raw(&RawDataQuery::default()) {
            Err(LoaderError::MissingColumns(missing)) => assert_eq!(missing, vec!["close"]),
            other => panic!("expected missing columns, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_time_takes_priority_over_date() {
        let csv = "time,date,open,high,low,close\n\
                   1704240000,2000-01-01,2.0,2.5,1.5,2.2\n\
                   1704153600,2000-01-02,1.0,1.5,0.5,1.2\n";
        let (_dir, loader) = project_with(DataKind::Raw, &[("SPY.csv", csv)]);

        let df = loader.load_raw(&RawDataQuery::default()).unwrap();
        assert!(has_column(&df, "date"));
        assert_eq!(
            time_millis(&df),
            vec![Some(1_704_153_600_000), Some(1_704_240_000_000)]
        );
    }

    #[test]
    fn test_raw_symbol_fallback_pattern() {
        let csv = "time,open,high,low,close\n2024-01-02,1.0,1.5,0.5,1.2\n";
        let (_dir, loader) = project_with(DataKind::Raw, &[("QQQ_H1.csv", csv)]);

        let query = RawDataQuery {
            pattern: "QQQ_D1*.csv".to_string(),
            symbol: "QQQ".to_string(),
            ..RawDataQuery::default()
        };
        let df = loader.load_raw(&query).unwrap();
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn test_raw_nothing_found_names_directory() {
        let (_dir, loader) = project_with(DataKind::Raw, &[]);
        let err = loader.load_raw(&RawDataQuery::default()).unwrap_err();
        match err {
            LoaderError::NotFound { message, path } => {
                assert!(path.ends_with("data/raw"));
                assert!(message.contains("No SPY CSV files found"));
            }
            other => panic!("expected not found, got {:?}", other),
        }
    }

    #[test]
    fn test_raw_explicit_file_must_exist() {
        let (_dir, loader) = project_with(DataKind::Raw, &[]);
        let err = loader
            .load_raw(&RawDataQuery::file("SPY_missing.csv"))
            .unwrap_err();
        assert!(matches!(err, LoaderError::NotFound { ref path, .. } if path.ends_with("SPY_missing.csv")));
    }

    #[test]
    fn test_raw_bad_timestamp() {
        let csv = "time,open,high,low,close\nnot-a-date,1.0,1.5,0.5,1.2\n";
        let (_dir, loader) = project_with(DataKind::Raw, &[("SPY.csv", csv)]);
        let err = loader.load_raw(&RawDataQuery::default()).unwrap_err();
        assert!(matches!(err, LoaderError::InvalidTimestamp { row: 0, .. }));
    }

    #[test]
    fn test_raw_us_dates_and_float_epochs() {
        let csv = "Date,open,high,low,close\n\
                   01/03/2024,2.0,2.5,1.5,2.2\n\
                   01/02/2024,1.0,1.5,0.5,1.2\n";
        let (_dir, loader) = project_with(DataKind::Raw, &[("SPY.csv", csv)]);
        let df = loader.load_raw(&RawDataQuery::default()).unwrap();
        assert_eq!(
            time_millis(&df),
            vec![Some(1_704_153_600_000), Some(1_704_240_000_000)]
        );

        let csv = "time,open,high,low,close\n\
                   1704240000.0,2.0,2.5,1.5,2.2\n\
                   1704153600.0,1.0,1.5,0.5,1.2\n";
        let (_dir, loader) = project_with(DataKind::Raw, &[("SPY.csv", csv)]);
        let df = loader.load_raw(&RawDataQuery::default()).unwrap();
        assert_eq!(
            time_millis(&df),
            vec![Some(1_704_153_600_000), Some(1_704_240_000_000)]
        );
    }

    #[test]
    fn test_processed_missing_file_mentions_directory() {
        let (_dir, loader) = project_with(DataKind::Processed, &[]);
        let err = loader.load_processed(DEFAULT_PROCESSED_FILE).unwrap_err();
        assert!(matches!(err, LoaderError::NotFound { .. }));
        assert!(err.to_string().contains("data/processed"));
    }

    #[test]
    fn test_processed_sorted_without_validation() {
        let csv = "time,rsi,target\n\
                   2024-01-03,55.0,1\n\
                   2024-01-02,45.0,0\n";
        let (_dir, loader) = project_with(DataKind::Processed, &[("spy_featured.csv", csv)]);

        let df = loader.load_processed(DEFAULT_PROCESSED_FILE).unwrap();
        let rsi = df.column("rsi").unwrap().f64().unwrap().get(0);
        assert_eq!(rsi, Some(45.0));
    }

    #[test]
    fn test_processed_without_time_column() {
        let csv = "feature,target\n0.5,1\n";
        let (_dir, loader) = project_with(DataKind::Processed, &[("plain.csv", csv)]);
        let df = loader.load_processed("plain.csv").unwrap();
        assert_eq!(df.height(), 1);
    }
}
