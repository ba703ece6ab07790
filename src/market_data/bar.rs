use chrono::{DateTime, Utc};

use crate::types::Period;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single daily OHLCV bar.
///
/// OHLC ordering (low <= open, close <= high) is whatever the provider sent;
/// nothing here enforces it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A bar that closed below its open. Drawn red on the volume chart.
    pub fn is_down(&self) -> bool {
        self.close < self.open
    }
}

/// Instrument metadata that comes back alongside the bars.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartMeta {
    pub symbol: String,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub previous_close: Option<f64>,
    /// Trailing 52-week range as reported by the provider, independent of
    /// how many bars were requested.
    pub fifty_two_week_high: Option<f64>,
    pub fifty_two_week_low: Option<f64>,
}

/// Everything fetched for one (ticker, period) request.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub meta: ChartMeta,
    /// Oldest first.
    pub bars: Vec<Bar>,
}

/// Identity of a fetched chart: the request parameters and nothing else.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct ChartKey {
    pub ticker: String,
    pub period: Period,
}

impl ChartKey {
    pub fn new(ticker: &str, period: Period) -> Self {
        Self {
            ticker: ticker.trim().to_uppercase(),
            period,
        }
    }
}

impl std::fmt::Display for ChartKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.ticker, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn chart_key_normalises_ticker() {
        let key = ChartKey::new(" aapl ", Period::OneYear);
        assert_eq!(key.ticker, "AAPL");
        assert_eq!(key.to_string(), "AAPL@1y");
        assert_eq!(key, ChartKey::new("AAPL", Period::OneYear));
    }

    #[test]
    fn down_bar_detection() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        assert!(Bar::new(ts, 10.0, 11.0, 9.0, 9.5, 100.0).is_down());
        assert!(!Bar::new(ts, 10.0, 11.0, 9.0, 10.0, 100.0).is_down());
    }
}
