//! Candle records as returned by `instruments/{pair}/candles` and their
//! flattened tabular form.

use super::granularity::Granularity;
use crate::domain::errors::{ApiError, ApiResult};
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tracing::warn;

/// Timestamp format the candles endpoint expects for `from` / `to`
pub const CANDLE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Which price sides to request: mid (`M`), bid (`B`) and/or ask (`A`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceComponents {
    pub mid: bool,
    pub bid: bool,
    pub ask: bool,
}

impl Default for PriceComponents {
    fn default() -> Self {
        Self {
            mid: true,
            bid: true,
            ask: true,
        }
    }
}

impl PriceComponents {
    pub fn mid_only() -> Self {
        Self {
            mid: true,
            bid: false,
            ask: false,
        }
    }
}

impl fmt::Display for PriceComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.mid {
            f.write_str("M")?;
        }
        if self.bid {
            f.write_str("B")?;
        }
        if self.ask {
            f.write_str("A")?;
        }
        Ok(())
    }
}

impl FromStr for PriceComponents {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut components = PriceComponents {
            mid: false,
            bid: false,
            ask: false,
        };
        for c in s.trim().chars() {
            match c.to_ascii_uppercase() {
                'M' => components.mid = true,
                'B' => components.bid = true,
                'A' => components.ask = true,
                other => return Err(anyhow!("Invalid price component '{}' in {}", other, s)),
            }
        }
        if !(components.mid || components.bid || components.ask) {
            return Err(anyhow!("At least one price component is required"));
        }
        Ok(components)
    }
}

/// Parameters for a candles request.
///
/// A time range is only used when both `from` and `to` are set; otherwise the
/// request asks for the latest `count` candles.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleQuery {
    pub count: u32,
    pub granularity: Granularity,
    pub price: PriceComponents,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl Default for CandleQuery {
    fn default() -> Self {
        Self {
            count: 10,
            granularity: Granularity::default(),
            price: PriceComponents::default(),
            from: None,
            to: None,
        }
    }
}

impl CandleQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_price(mut self, price: PriceComponents) -> Self {
        self.price = price;
        self
    }

    pub fn between(mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.to = Some(to);
        self
    }

    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("granularity".to_string(), self.granularity.to_string()),
            ("price".to_string(), self.price.to_string()),
        ];

        match (self.from, self.to) {
            (Some(from), Some(to)) => {
                params.push((
                    "from".to_string(),
                    from.format(CANDLE_TIME_FORMAT).to_string(),
                ));
                params.push(("to".to_string(), to.format(CANDLE_TIME_FORMAT).to_string()));
            }
            _ => params.push(("count".to_string(), self.count.to_string())),
        }

        params
    }
}

/// One price side of a candle as sent by the broker (prices are strings)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleOhlc {
    pub o: String,
    pub h: String,
    pub l: String,
    pub c: String,
}

/// Raw candle object from the candles endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub complete: bool,
    pub volume: i64,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<CandleOhlc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<CandleOhlc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<CandleOhlc>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl TryFrom<&CandleOhlc> for Ohlc {
    type Error = ApiError;

    fn try_from(raw: &CandleOhlc) -> ApiResult<Self> {
        let parse = |field: &str, value: &str| {
            value
                .parse::<f64>()
                .map_err(|e| ApiError::decode(&format!("candle price '{}'", field), e))
        };
        Ok(Ohlc {
            open: parse("o", &raw.o)?,
            high: parse("h", &raw.h)?,
            low: parse("l", &raw.l)?,
            close: parse("c", &raw.c)?,
        })
    }
}

/// A complete candle flattened into one table row
#[derive(Debug, Clone, PartialEq)]
pub struct CandleRow {
    pub time: DateTime<Utc>,
    pub volume: i64,
    pub mid: Option<Ohlc>,
    pub bid: Option<Ohlc>,
    pub ask: Option<Ohlc>,
}

impl TryFrom<&Candle> for CandleRow {
    type Error = ApiError;

    fn try_from(candle: &Candle) -> ApiResult<Self> {
        let time = DateTime::parse_from_rfc3339(&candle.time)
            .map_err(|e| ApiError::decode("candle time", e))?
            .with_timezone(&Utc);

        Ok(CandleRow {
            time,
            volume: candle.volume,
            mid: candle.mid.as_ref().map(Ohlc::try_from).transpose()?,
            bid: candle.bid.as_ref().map(Ohlc::try_from).transpose()?,
            ask: candle.ask.as_ref().map(Ohlc::try_from).transpose()?,
        })
    }
}

/// Tabular view over complete candles, ordered as received.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandleFrame {
    rows: Vec<CandleRow>,
}

impl CandleFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps complete candles only. Malformed candles are logged and skipped.
    pub fn from_candles(candles: &[Candle]) -> Self {
        let rows = candles
            .iter()
            .filter(|candle| candle.complete)
            .filter_map(|candle| match CandleRow::try_from(candle) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!("Skipping malformed candle at {}: {}", candle.time, e);
                    None
                }
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[CandleRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn last(&self) -> Option<&CandleRow> {
        self.rows.last()
    }

    fn present_components(&self) -> [bool; 3] {
        let mut present = [false; 3];
        for row in &self.rows {
            present[0] |= row.mid.is_some();
            present[1] |= row.bid.is_some();
            present[2] |= row.ask.is_some();
        }
        present
    }

    /// Column names: `time`, `volume`, then `{mid,bid,ask}_{o,h,l,c}` for the
    /// components present in at least one row.
    pub fn columns(&self) -> Vec<String> {
        if self.rows.is_empty() {
            return Vec::new();
        }

        let mut columns = vec!["time".to_string(), "volume".to_string()];
        let present = self.present_components();
        for (prefix, is_present) in ["mid", "bid", "ask"].iter().zip(present) {
            if is_present {
                for field in ["o", "h", "l", "c"] {
                    columns.push(format!("{}_{}", prefix, field));
                }
            }
        }
        columns
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            csv_writer.flush()?;
            return Ok(());
        }

        csv_writer
            .write_record(self.columns())
            .context("Failed to write candle CSV header")?;

        let present = self.present_components();
        for row in &self.rows {
            let mut record = vec![row.time.to_rfc3339(), row.volume.to_string()];
            for (ohlc, is_present) in [row.mid, row.bid, row.ask].iter().zip(present) {
                if !is_present {
                    continue;
                }
                match ohlc {
                    Some(v) => record.extend(
                        [v.open, v.high, v.low, v.close].iter().map(|p| p.to_string()),
                    ),
                    None => record.extend(std::iter::repeat_n(String::new(), 4)),
                }
            }
            csv_writer
                .write_record(&record)
                .context("Failed to write candle CSV row")?;
        }

        csv_writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ohlc(o: &str, h: &str, l: &str, c: &str) -> CandleOhlc {
        CandleOhlc {
            o: o.to_string(),
            h: h.to_string(),
            l: l.to_string(),
            c: c.to_string(),
        }
    }

    fn candle(time: &str, complete: bool) -> Candle {
        Candle {
            complete,
            volume: 120,
            time: time.to_string(),
            mid: Some(ohlc("1.1000", "1.1050", "1.0990", "1.1020")),
            bid: None,
            ask: None,
        }
    }

    #[test]
    fn test_default_query_uses_count() {
        let params = CandleQuery::new().to_params();
        assert!(params.contains(&("granularity".to_string(), "H1".to_string())));
        assert!(params.contains(&("price".to_string(), "MBA".to_string())));
        assert!(params.contains(&("count".to_string(), "10".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "from" || k == "to"));
    }

    #[test]
    fn test_range_query_replaces_count() {
        let from = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();
        let params = CandleQuery::new().between(from, to).to_params();

        assert!(params.contains(&("from".to_string(), "2024-01-02T03:04:05Z".to_string())));
        assert!(params.contains(&("to".to_string(), "2024-01-03T00:00:00Z".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "count"));
    }

    #[test]
    fn test_only_from_falls_back_to_count() {
        let mut query = CandleQuery::new().with_count(50);
        query.from = Some(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
        let params = query.to_params();
        assert!(params.contains(&("count".to_string(), "50".to_string())));
        assert!(!params.iter().any(|(k, _)| k == "from"));
    }

    #[test]
    fn test_price_components_parse() {
        let mid_ask = PriceComponents::from_str("ma").unwrap();
        assert!(mid_ask.mid && mid_ask.ask && !mid_ask.bid);
        assert_eq!(mid_ask.to_string(), "MA");
        assert!(PriceComponents::from_str("X").is_err());
        assert!(PriceComponents::from_str("").is_err());
    }

    #[test]
    fn test_frame_drops_incomplete_candles() {
        let candles = vec![
            candle("2024-01-02T10:00:00.000000000Z", true),
            candle("2024-01-02T11:00:00.000000000Z", false),
        ];
        let frame = CandleFrame::from_candles(&candles);

        assert_eq!(frame.len(), 1);
        let row = &frame.rows()[0];
        assert_eq!(row.time, Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap());
        assert_eq!(row.volume, 120);
        assert_eq!(row.mid.unwrap().high, 1.1050);
        assert!(row.bid.is_none());
    }

    #[test]
    fn test_frame_from_no_candles_is_empty() {
        let frame = CandleFrame::from_candles(&[]);
        assert!(frame.is_empty());
        assert!(frame.columns().is_empty());
    }

    #[test]
    fn test_malformed_candle_is_skipped() {
        let mut bad = candle("2024-01-02T10:00:00Z", true);
        bad.mid = Some(ohlc("abc", "1", "1", "1"));
        let good = candle("2024-01-02T11:00:00Z", true);

        let frame = CandleFrame::from_candles(&[bad, good]);
        assert_eq!(frame.len(), 1);
    }

    #[test]
    fn test_columns_follow_present_components() {
        let mut with_bid = candle("2024-01-02T10:00:00Z", true);
        with_bid.bid = Some(ohlc("1.0999", "1.1049", "1.0989", "1.1019"));
        let frame = CandleFrame::from_candles(&[with_bid, candle("2024-01-02T11:00:00Z", true)]);

        assert_eq!(
            frame.columns(),
            vec![
                "time", "volume", "mid_o", "mid_h", "mid_l", "mid_c", "bid_o", "bid_h", "bid_l",
                "bid_c"
            ]
        );
    }

    #[test]
    fn test_write_csv() {
        let frame = CandleFrame::from_candles(&[candle("2024-01-02T10:00:00Z", true)]);
        let mut buffer = Vec::new();
        frame.write_csv(&mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("time,volume,mid_o,mid_h,mid_l,mid_c"));
        assert_eq!(
            lines.next(),
            Some("2024-01-02T10:00:00+00:00,120,1.1,1.105,1.099,1.102")
        );
    }
}
