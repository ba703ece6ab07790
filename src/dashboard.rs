// =============================================================================
// Dashboard View: everything one page render needs
// =============================================================================

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::analysis::{self, SummaryMetrics, TechnicalSignals};
use crate::charts;
use crate::companies::Company;
use crate::market_data::{ChartData, CompanyProfile};
use crate::types::Period;

/// Longest "About" text shown before it is cut with an ellipsis.
pub const ABOUT_MAX_CHARS: usize = 300;

/// Company header and key metrics shown beside the charts.
///
/// Profile fields are `None` when the provider has no value or the profile
/// request failed; the charts render either way.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyInfo {
    pub name: String,
    pub ticker: String,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    /// Provider's own long name for the instrument.
    pub provider_name: Option<String>,
    /// Provider's latest market price, which may be intraday.
    pub market_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    /// Provider's average daily volume, not the 20-bar average.
    pub average_volume: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    /// Business summary cut to [`ABOUT_MAX_CHARS`].
    pub about: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Figures {
    pub price: Value,
    pub volume: Value,
    pub rsi: Value,
}

/// Serialised as the `/api/v1/dashboard` body and each live-feed message.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub company: CompanyInfo,
    pub period: Period,
    pub bar_count: usize,
    pub metrics: Option<SummaryMetrics>,
    pub latest_sma_20: Option<f64>,
    pub latest_sma_50: Option<f64>,
    pub signals: TechnicalSignals,
    pub figures: Figures,
    pub data_source: String,
    /// RFC 3339 "last updated" stamp.
    pub generated_at: String,
}

/// Keep the first `max_chars` characters, adding "..." when anything was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Assemble the page payload from a fetched chart and, when available, the
/// company profile.
pub fn build_dashboard(
    company: Company,
    period: Period,
    chart: &ChartData,
    profile: Option<&CompanyProfile>,
    data_source: &str,
) -> DashboardView {
    let bars = &chart.bars;
    let frame = analysis::compute_indicators(bars);

    DashboardView {
        company: CompanyInfo {
            name: company.name.to_string(),
            ticker: company.ticker.to_string(),
            exchange: chart.meta.exchange.clone(),
            currency: chart.meta.currency.clone(),
            provider_name: chart.meta.long_name.clone(),
            market_price: chart.meta.regular_market_price,
            previous_close: chart.meta.previous_close,
            market_cap: profile.and_then(|p| p.market_cap),
            trailing_pe: profile.and_then(|p| p.trailing_pe),
            average_volume: profile.and_then(|p| p.average_volume),
            sector: profile.and_then(|p| p.sector.clone()),
            industry: profile.and_then(|p| p.industry.clone()),
            website: profile.and_then(|p| p.website.clone()),
            about: profile
                .and_then(|p| p.business_summary.as_deref())
                .map(|s| excerpt(s, ABOUT_MAX_CHARS)),
        },
        period,
        bar_count: bars.len(),
        metrics: analysis::summarize(bars, &chart.meta),
        latest_sma_20: frame.latest_sma_20(),
        latest_sma_50: frame.latest_sma_50(),
        signals: analysis::technical_signals(bars, &frame),
        figures: Figures {
            price: charts::price_figure(company.name, bars, &frame),
            volume: charts::volume_figure(bars),
            rsi: charts::rsi_figure(bars, &frame),
        },
        data_source: data_source.to_string(),
        generated_at: Utc::now().to_rfc3339(),
    }
}
