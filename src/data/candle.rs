//! Typed OHLCV rows extracted from a loaded frame.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::loader::{LoaderError, REQUIRED_COLUMNS};

/// One OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
}

/// Convert a frame produced by [`super::load_raw_data`] into candles.
///
/// Rows with a null timestamp or price are skipped.
pub fn to_candles(df: &DataFrame) -> Result<Vec<Candle>, LoaderError> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|name| df.column(name).is_err())
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(LoaderError::MissingColumns(missing));
    }

    let time = df.column("time")?.cast(&DataType::Int64)?;
    let time = time.i64()?;
    let open = df.column("open")?.cast(&DataType::Float64)?;
    let open = open.f64()?;
    let high = df.column("high")?.cast(&DataType::Float64)?;
    let high = high.f64()?;
    let low = df.column("low")?.cast(&DataType::Float64)?;
    let low = low.f64()?;
    let close = df.column("close")?.cast(&DataType::Float64)?;
    let close = close.f64()?;
    let volume = match df.column("volume") {
        Ok(col) => Some(col.cast(&DataType::Float64)?),
        Err(_) => None,
    };
    let volume = volume.as_ref().map(|col| col.f64()).transpose()?;

    let candles = (0..df.height())
        .filter_map(|i| {
            Some(Candle {
                time: DateTime::from_timestamp_millis(time.get(i)?)?,
                open: open.get(i)?,
                high: high.get(i)?,
                low: low.get(i)?,
                close: close.get(i)?,
                volume: volume.and_then(|v| v.get(i)),
            })
        })
        .collect();

    Ok(candles)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(with_volume: bool) -> DataFrame {
        let time = Series::new("time".into(), vec![1_704_153_600_000i64, 1_704_240_000_000])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, Some("UTC".into())))
            .unwrap();
        let mut columns = vec![
            Column::from(time),
            Column::new("open".into(), vec![1.0, 2.0]),
            Column::new("high".into(), vec![1.5, 2.5]),
            Column::new("low".into(), vec![0.5, 1.5]),
            Column::new("close".into(), vec![1.2, 2.2]),
        ];
        if with_volume {
            columns.push(Column::new("volume".into(), vec![100i64, 200]));
        }
        DataFrame::new(columns).unwrap()
    }

    #[test]
    fn test_candles_from_frame() {
        let candles = to_candles(&frame(true)).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].time.timestamp(), 1_704_153_600);
        assert_eq!(candles[1].close, 2.2);
        assert_eq!(candles[1].volume, Some(200.0));
    }

    #[test]
    fn test_candle_serializes_time_as_rfc3339() {
        let candle = to_candles(&frame(true)).unwrap().remove(0);
        let json = serde_json::to_value(&candle).unwrap();
        assert_eq!(json["time"], "2024-01-02T00:00:00Z");

        let back: Candle = serde_json::from_value(json).unwrap();
        assert_eq!(back, candle);
    }

    #[test]
    fn test_volume_is_optional() {
        let candles = to_candles(&frame(false)).unwrap();
        assert!(candles.iter().all(|c| c.volume.is_none()));
    }

    #[test]
    fn test_missing_columns() {
        let df = frame(false).drop("close").unwrap();
        assert!(matches!(to_candles(&df), Err(LoaderError::MissingColumns(m)) if m == vec!["close"]));
    }
}
