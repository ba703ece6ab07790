// =============================================================================
// Analysis: indicators, summary metrics and technical signals
// =============================================================================
//
// Everything here is a pure function of the bar sequence. Nothing is cached or
// persisted; a new request recomputes from scratch.
// =============================================================================

use chrono::Duration;
use serde::Serialize;

use crate::indicators::{self, rsi, sma};
use crate::market_data::{Bar, ChartMeta};
use crate::types::{PriceTrend, RsiZone, VolumeTrend};

pub const SMA_SHORT: usize = 20;
pub const SMA_LONG: usize = 50;
/// Window for the average volume and the volume trend.
pub const VOLUME_AVG_WINDOW: usize = 20;
/// Latest volume above this multiple of the average counts as high.
pub const HIGH_VOLUME_MULTIPLIER: f64 = 1.5;

/// Indicator series laid onto the bar axis. `None` marks warm-up bars.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorFrame {
    pub sma_20: Vec<Option<f64>>,
    pub sma_50: Vec<Option<f64>>,
    pub rsi_14: Vec<Option<f64>>,
}

impl IndicatorFrame {
    pub fn latest_sma_20(&self) -> Option<f64> {
        self.sma_20.last().copied().flatten()
    }

    pub fn latest_sma_50(&self) -> Option<f64> {
        self.sma_50.last().copied().flatten()
    }

    pub fn latest_rsi(&self) -> Option<f64> {
        self.rsi_14.last().copied().flatten()
    }
}

/// Headline numbers for the metrics panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub latest_price: f64,
    /// Absent when there is only one bar.
    pub change: Option<f64>,
    pub change_pct: Option<f64>,
    pub high_52w: f64,
    pub low_52w: f64,
    pub latest_volume: f64,
    pub avg_volume_20: f64,
    pub volume_ratio: Option<f64>,
}

/// Latest-bar readings shown in the technical analysis row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalSignals {
    pub rsi: Option<f64>,
    pub rsi_zone: Option<RsiZone>,
    pub price_vs_sma_20: Option<PriceTrend>,
    pub volume_trend: Option<VolumeTrend>,
}

/// SMA 20, SMA 50 and RSI 14 over the closes, aligned to `bars`.
pub fn compute_indicators(bars: &[Bar]) -> IndicatorFrame {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let n = closes.len();

    IndicatorFrame {
        sma_20: indicators::align(&sma::calculate_sma(&closes, SMA_SHORT), n),
        sma_50: indicators::align(&sma::calculate_sma(&closes, SMA_LONG), n),
        rsi_14: indicators::align(&rsi::calculate_rsi(&closes, rsi::DEFAULT_PERIOD), n),
    }
}

/// Derive the summary metrics. `None` for an empty series.
///
/// The 52-week range is the provider's when `meta` carries it. Otherwise it
/// covers bars within 365 days of the last bar, which for shorter periods is
/// only what was fetched.
pub fn summarize(bars: &[Bar], meta: &ChartMeta) -> Option<SummaryMetrics> {
    let last = bars.last()?;

    let (change, change_pct) = match bars.len().checked_sub(2).map(|i| &bars[i]) {
        Some(prev) => {
            let change = last.close - prev.close;
            let pct = (prev.close != 0.0).then(|| change / prev.close * 100.0);
            (Some(change), pct)
        }
        None => (None, None),
    };

    let cutoff = last.timestamp - Duration::days(365);
    let (bar_high, bar_low) = bars
        .iter()
        .filter(|b| b.timestamp >= cutoff)
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), b| {
            (hi.max(b.high), lo.min(b.low))
        });
    let high_52w = meta.fifty_two_week_high.unwrap_or(bar_high);
    let low_52w = meta.fifty_two_week_low.unwrap_or(bar_low);

    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let avg_volume_20 = sma::trailing_mean(&volumes, VOLUME_AVG_WINDOW).unwrap_or(0.0);
    let volume_ratio = (avg_volume_20 > 0.0).then(|| last.volume / avg_volume_20);

    Some(SummaryMetrics {
        latest_price: last.close,
        change,
        change_pct,
        high_52w,
        low_52w,
        latest_volume: last.volume,
        avg_volume_20,
        volume_ratio,
    })
}

/// Read the latest RSI zone, price vs SMA 20 and volume trend.
pub fn technical_signals(bars: &[Bar], frame: &IndicatorFrame) -> TechnicalSignals {
    let rsi = frame.latest_rsi();
    let rsi_zone = rsi.map(rsi::classify);

    let price_vs_sma_20 = match (bars.last(), frame.latest_sma_20()) {
        (Some(last), Some(sma)) => Some(if last.close > sma {
            PriceTrend::Above
        } else {
            PriceTrend::Below
        }),
        _ => None,
    };

    let volume_trend = bars.last().map(|last| {
        let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
        let avg = sma::trailing_mean(&volumes, VOLUME_AVG_WINDOW).unwrap_or(0.0);
        if last.volume > avg * HIGH_VOLUME_MULTIPLIER {
            VolumeTrend::High
        } else {
            VolumeTrend::Normal
        }
    });

    TechnicalSignals {
        rsi,
        rsi_zone,
        price_vs_sma_20,
        volume_trend,
    }
}
