//! Instrument metadata and the lookup table consulted before placing orders.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

/// Tradable instrument as listed by `accounts/{id}/instruments`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub name: String,
    #[serde(rename = "type", default)]
    pub instrument_type: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub pip_location: i32,
    #[serde(default)]
    pub display_precision: u32,
    pub trade_units_precision: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_trade_size: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_order_units: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_rate: Option<Decimal>,
}

/// Read-only instrument table keyed by symbol (`EUR_USD`).
///
/// Built once, before any order is placed, then handed to the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentCollection {
    instruments: BTreeMap<String, Instrument>,
}

impl InstrumentCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instruments(instruments: impl IntoIterator<Item = Instrument>) -> Self {
        let mut collection = Self::new();
        for instrument in instruments {
            collection.insert(instrument);
        }
        collection
    }

    pub fn insert(&mut self, instrument: Instrument) {
        self.instruments.insert(instrument.name.clone(), instrument);
    }

    pub fn get(&self, name: &str) -> Option<&Instrument> {
        self.instruments.get(name)
    }

    /// Unit rounding precision for `name`, if the instrument is known
    pub fn precision(&self, name: &str) -> Option<i32> {
        self.get(name).map(|i| i.trade_units_precision)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.instruments.keys().map(String::as_str)
    }

    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read instruments file {}", path.display()))?;
        let collection: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse instruments file {}", path.display()))?;
        info!(
            "Loaded {} instruments from {}",
            collection.len(),
            path.display()
        );
        Ok(collection)
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize instruments")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write instruments file {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn eur_usd() -> Instrument {
        serde_json::from_value(json!({
            "name": "EUR_USD",
            "type": "CURRENCY",
            "displayName": "EUR/USD",
            "pipLocation": -4,
            "displayPrecision": 5,
            "tradeUnitsPrecision": 0,
            "minimumTradeSize": "1",
            "maximumOrderUnits": "100000000",
            "marginRate": "0.0333"
        }))
        .unwrap()
    }

    #[test]
    fn test_instrument_decodes_broker_payload() {
        let instrument = eur_usd();
        assert_eq!(instrument.display_name, "EUR/USD");
        assert_eq!(instrument.trade_units_precision, 0);
        assert_eq!(instrument.margin_rate, Some(dec!(0.0333)));
        assert_eq!(instrument.pip_location, -4);
    }

    #[test]
    fn test_negative_units_precision_decodes() {
        let instrument: Instrument = serde_json::from_value(json!({
            "name": "BCO_USD",
            "tradeUnitsPrecision": -1
        }))
        .unwrap();
        let collection = InstrumentCollection::from_instruments(vec![instrument, eur_usd()]);
        assert_eq!(collection.precision("BCO_USD"), Some(-1));
        assert_eq!(collection.len(), 2);
    }

    #[test]
    fn test_precision_lookup() {
        let collection = InstrumentCollection::from_instruments(vec![eur_usd()]);
        assert_eq!(collection.precision("EUR_USD"), Some(0));
        assert_eq!(collection.precision("GBP_JPY"), None);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instruments.json");

        let collection = InstrumentCollection::from_instruments(vec![eur_usd()]);
        collection.save_file(&path).unwrap();

        let loaded = InstrumentCollection::load_file(&path).unwrap();
        assert_eq!(loaded, collection);
        assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["EUR_USD"]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = InstrumentCollection::load_file("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("Failed to read instruments file"));
    }
}
