//! Trading Lab - project inspector
//!
//! Reports the discovered project root, the effective configuration, the raw
//! dataset and any trained model files it can find.

use anyhow::{Context, Result};
use tracing::warn;

use trading_lab::config::ConfigLoader;
use trading_lab::data::{to_candles, DataLoader, RawDataQuery};
use trading_lab::model::{boosting_available, Booster, ModelLoader, DEFAULT_MODEL_NAME};
use trading_lab::paths::ProjectLayout;

fn main() -> Result<()> {
    trading_lab::logger::init_logging("info");

    let layout = ProjectLayout::discover();
    println!("Project root: {}", layout.root().display());

    let config_loader = ConfigLoader::new(layout.clone());
    match config_loader.locate() {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: <defaults>"),
    }
    let config = config_loader
        .load_typed(None)
        .context("Failed to load configuration")?;
    println!(
        "Trading {} {} (lookback {} days), horizon {} days",
        config.trading.symbol,
        config.trading.timeframe,
        config.trading.lookback_days,
        config.features.horizon_days
    );

    let data_loader = DataLoader::new(layout.clone());
    match data_loader.load_raw(&RawDataQuery::symbol(&config.trading.symbol)) {
        Ok(df) => {
            let candles = to_candles(&df).context("Failed to read OHLCV rows")?;
            println!("Raw data: {} rows, {} columns", df.height(), df.width());
            if let (Some(first), Some(last)) = (candles.first(), candles.last()) {
                println!("  from {} to {}", first.time, last.time);
            }
        }
        Err(e) => warn!("Raw data unavailable: {}", e),
    }

    let model_loader = ModelLoader::new(layout);
    let found: Vec<_> = model_loader
        .candidates(DEFAULT_MODEL_NAME, None)
        .into_iter()
        .filter(|path| path.exists())
        .collect();
    if found.is_empty() {
        println!("Model: no '{}' files found", DEFAULT_MODEL_NAME);
    }
    for path in found {
        let is_json = path.extension().map(|ext| ext == "json").unwrap_or(false);
        if is_json && boosting_available() {
            match Booster::load(&path) {
                Ok(booster) => println!(
                    "Model: {} ({} trees, objective {})",
                    path.display(),
                    booster.num_trees(),
                    booster.objective()
                ),
                Err(e) => warn!("Unreadable model {}: {}", path.display(), e),
            }
        } else {
            println!("Model: {}", path.display());
        }
    }

    Ok(())
}
