//! Default configuration values, both as a raw YAML tree and as typed settings.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

/// Build the default configuration tree.
///
/// A fresh value is returned on every call; callers are free to mutate it.
pub fn default_config() -> Value {
    section(vec![
        (
            "trading",
            section(vec![
                ("symbol", Value::from("SPY")),
                ("timeframe", Value::from("D1")),
                ("lookback_days", Value::from(5000)),
            ]),
        ),
        (
            "features",
            section(vec![
                ("horizon_days", Value::from(5)),
                ("rsi_period", Value::from(14)),
                ("ema_short", Value::from(20)),
                ("ema_long", Value::from(50)),
                ("atr_period", Value::from(14)),
            ]),
        ),
        (
            "model",
            section(vec![
                ("n_estimators", Value::from(100)),
                ("learning_rate", Value::from(0.05)),
                ("train_ratio", Value::from(0.8)),
                ("random_state", Value::from(42)),
            ]),
        ),
        (
            "backtest",
            section(vec![
                ("initial_capital", Value::from(100.0)),
                // 0.1%
                ("commission_rate", Value::from(0.001)),
                // 0.01%
                ("slippage", Value::from(0.0001)),
            ]),
        ),
    ])
}

fn section(entries: Vec<(&str, Value)>) -> Value {
    let mut map = Mapping::new();
    for (key, value) in entries {
        map.insert(Value::from(key), value);
    }
    Value::Mapping(map)
}

/// Typed view of the merged configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LabConfig {
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub features: FeatureSettings,
    #[serde(default)]
    pub model: ModelSettings,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

/// Instrument and history window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    pub symbol: String,
    pub timeframe: String,
    pub lookback_days: u32,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            symbol: "SPY".to_string(),
            timeframe: "D1".to_string(),
            lookback_days: 5000,
        }
    }
}

/// Indicator periods and the prediction horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    pub horizon_days: u32,
    pub rsi_period: u32,
    pub ema_short: u32,
    pub ema_long: u32,
    pub atr_period: u32,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            horizon_days: 5,
            rsi_period: 14,
            ema_short: 20,
            ema_long: 50,
            atr_period: 14,
        }
    }
}

/// Gradient-boosting hyperparameters and the train/test split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub n_estimators: u32,
    pub learning_rate: f64,
    pub train_ratio: f64,
    pub random_state: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.05,
            train_ratio: 0.8,
            random_state: 42,
        }
    }
}

/// Cost assumptions used when simulating trades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: f64,
    pub commission_rate: f64,
    pub slippage: f64,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: 100.0,
            commission_rate: 0.001,
            slippage: 0.0001,
        }
    }
}
