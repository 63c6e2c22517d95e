//! Data module - CSV loading and timestamp normalization

mod candle;
mod loader;
mod timestamp;

pub use candle::{to_candles, Candle};
pub use loader::{
    load_processed_data, load_raw_data, DataLoader, LoaderError, RawDataQuery,
    DEFAULT_PROCESSED_FILE, REQUIRED_COLUMNS,
};
pub use timestamp::{parse_timestamp, parse_timestamp_millis};
