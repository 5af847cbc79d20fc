use anyhow::{Result, anyhow};
use std::fmt;
use std::str::FromStr;

/// Candle bucket sizes accepted by the OANDA candles endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    S5,
    S10,
    S15,
    S30,
    M1,
    M2,
    M4,
    M5,
    M10,
    M15,
    M30,
    #[default]
    H1,
    H2,
    H3,
    H4,
    H6,
    H8,
    H12,
    D,
    W,
    /// Monthly
    Month,
}

impl Granularity {
    /// Converts to the OANDA API granularity string
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::S5 => "S5",
            Granularity::S10 => "S10",
            Granularity::S15 => "S15",
            Granularity::S30 => "S30",
            Granularity::M1 => "M1",
            Granularity::M2 => "M2",
            Granularity::M4 => "M4",
            Granularity::M5 => "M5",
            Granularity::M10 => "M10",
            Granularity::M15 => "M15",
            Granularity::M30 => "M30",
            Granularity::H1 => "H1",
            Granularity::H2 => "H2",
            Granularity::H3 => "H3",
            Granularity::H4 => "H4",
            Granularity::H6 => "H6",
            Granularity::H8 => "H8",
            Granularity::H12 => "H12",
            Granularity::D => "D",
            Granularity::W => "W",
            Granularity::Month => "M",
        }
    }

    pub fn all() -> Vec<Granularity> {
        vec![
            Granularity::S5,
            Granularity::S10,
            Granularity::S15,
            Granularity::S30,
            Granularity::M1,
            Granularity::M2,
            Granularity::M4,
            Granularity::M5,
            Granularity::M10,
            Granularity::M15,
            Granularity::M30,
            Granularity::H1,
            Granularity::H2,
            Granularity::H3,
            Granularity::H4,
            Granularity::H6,
            Granularity::H8,
            Granularity::H12,
            Granularity::D,
            Granularity::W,
            Granularity::Month,
        ]
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    // Case-sensitive: "M" is monthly while "m1"-style spellings are not OANDA codes.
    fn from_str(s: &str) -> Result<Self> {
        Granularity::all()
            .into_iter()
            .find(|g| g.as_str() == s.trim())
            .ok_or_else(|| anyhow!("Invalid granularity: {}", s))
    }
}
