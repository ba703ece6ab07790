// =============================================================================
// Yahoo Finance Client: daily OHLCV history and company profile
// =============================================================================
//
// Chart history uses the public v8 endpoint, which needs no cookie / crumb
// handshake as long as a browser-like User-Agent is sent:
//
//   GET {base}/v8/finance/chart/{ticker}?range={period}&interval=1d
//
// Response shape (abridged):
//   { "chart": { "result": [ { "meta": {...}, "timestamp": [...],
//       "indicators": { "quote": [ { "open": [...], "high": [...],
//       "low": [...], "close": [...], "volume": [...] } ] } } ],
//     "error": null } }
//
// Holidays and halted sessions show up as `null` entries in the quote arrays;
// those rows are skipped.
//
// Fundamentals come from quoteSummary, which does need the crumb (see
// [`super::auth`]).
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::auth::{CrumbStore, FINANCE_REFERER};
use super::quote_summary::{self, parse_quote_summary};
use crate::market_data::{
    Bar, ChartData, ChartFuture, ChartMeta, ChartSource, CompanyProfile, ProfileFuture,
};
use crate::runtime_config::DashboardConfig;
use crate::types::Period;

/// Yahoo Finance REST client for chart history and company profiles.
#[derive(Clone)]
pub struct YahooClient {
    base_url: String,
    client: reqwest::Client,
    crumbs: Arc<CrumbStore>,
}

impl YahooClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Build a client from the dashboard configuration (base URL, User-Agent
    /// and request timeout). The cookie store carries the Yahoo session.
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("invalid user_agent header")?,
        );

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .cookie_store(true)
            .build()
            .context("failed to build reqwest client")?;

        let base_url = config.yahoo_base_url.trim_end_matches('/').to_string();
        debug!(base_url = %base_url, "YahooClient initialised");

        let crumbs = Arc::new(CrumbStore::new(&config.yahoo_cookie_url, &base_url));

        Ok(Self {
            base_url,
            client,
            crumbs,
        })
    }

    fn chart_url(&self, ticker: &str, period: Period) -> String {
        format!(
            "{}/v8/finance/chart/{}?range={}&interval=1d&includePrePost=false",
            self.base_url,
            ticker.trim().to_uppercase(),
            period.as_str()
        )
    }

    fn quote_summary_url(&self, ticker: &str) -> String {
        format!(
            "{}/v10/finance/quoteSummary/{}",
            self.base_url,
            ticker.trim().to_uppercase()
        )
    }

    // -------------------------------------------------------------------------
    // Public market data
    // -------------------------------------------------------------------------

    /// GET /v8/finance/chart/{ticker} for the given period at daily bars.
    #[instrument(skip(self), name = "yahoo::get_chart")]
    pub async fn get_chart(&self, ticker: &str, period: Period) -> Result<ChartData> {
        let url = self.chart_url(ticker, period);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read chart response body")?;

        if !status.is_success() {
            // Yahoo still sends the chart envelope on 404 for unknown symbols;
            // prefer its description when it parses.
            if let Ok(Some(desc)) = provider_error(&body) {
                anyhow::bail!("Yahoo chart for {ticker} returned {status}: {desc}");
            }
            anyhow::bail!("Yahoo chart for {ticker} returned {status}: {body}");
        }

        let chart = parse_chart_response(&body)
            .with_context(|| format!("invalid chart response for {ticker}"))?;

        debug!(ticker, period = %period, count = chart.bars.len(), "chart fetched");
        Ok(chart)
    }

    // -------------------------------------------------------------------------
    // Authenticated fundamentals
    // -------------------------------------------------------------------------

    /// GET /v10/finance/quoteSummary/{ticker}. A 401 drops the cached crumb
    /// and retries once with a fresh one.
    #[instrument(skip(self), name = "yahoo::get_profile")]
    pub async fn get_profile(&self, ticker: &str) -> Result<CompanyProfile> {
        let crumb = self.crumbs.get(&self.client).await?;
        let (mut status, mut body) = self.send_quote_summary(ticker, &crumb).await?;

        if status == StatusCode::UNAUTHORIZED {
            warn!(ticker, "crumb rejected, refreshing");
            self.crumbs.invalidate().await;
            let crumb = self.crumbs.get(&self.client).await?;
            (status, body) = self.send_quote_summary(ticker, &crumb).await?;
        }

        if !status.is_success() {
            let desc = quote_summary::summary_error(&body).unwrap_or(body);
            anyhow::bail!("Yahoo quoteSummary for {ticker} returned {status}: {desc}");
        }

        let profile = parse_quote_summary(&body)
            .with_context(|| format!("invalid quoteSummary response for {ticker}"))?;
        debug!(ticker, has_summary = profile.business_summary.is_some(), "profile fetched");
        Ok(profile)
    }

    async fn send_quote_summary(&self, ticker: &str, crumb: &str) -> Result<(StatusCode, String)> {
        let resp = self
            .client
            .get(self.quote_summary_url(ticker))
            .query(&[("modules", quote_summary::MODULES), ("crumb", crumb)])
            .header(REFERER, FINANCE_REFERER)
            .send()
            .await
            .context("GET /v10/finance/quoteSummary request failed")?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read quoteSummary response body")?;
        Ok((status, body))
    }
}

impl ChartSource for YahooClient {
    fn name(&self) -> &'static str {
        "Yahoo Finance"
    }

    fn fetch_chart<'a>(&'a self, ticker: &'a str, period: Period) -> ChartFuture<'a> {
        Box::pin(self.get_chart(ticker, period))
    }

    fn fetch_profile<'a>(&'a self, ticker: &'a str) -> ProfileFuture<'a> {
        Box::pin(self.get_profile(ticker))
    }
}

impl std::fmt::Debug for YahooClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Response parsing
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ProviderError>,
}

/// Error object shared by the chart and quoteSummary envelopes.
#[derive(Debug, Deserialize)]
pub(super) struct ProviderError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ProviderError {
    pub(super) fn describe(self) -> String {
        self.description
            .or(self.code)
            .unwrap_or_else(|| "unknown provider error".to_string())
    }
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: RawMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMeta {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    exchange_name: Option<String>,
    #[serde(default)]
    full_exchange_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    previous_close: Option<f64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
    #[serde(default)]
    fifty_two_week_high: Option<f64>,
    #[serde(default)]
    fifty_two_week_low: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteArrays>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteArrays {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Extract the provider's error description from a chart envelope, if any.
fn provider_error(body: &str) -> Result<Option<String>> {
    let parsed: ChartResponse = serde_json::from_str(body).context("failed to parse chart JSON")?;
    Ok(parsed.chart.error.map(ProviderError::describe))
}

/// Parse a v8 chart body into bars (oldest first) plus instrument metadata.
pub fn parse_chart_response(body: &str) -> Result<ChartData> {
    let parsed: ChartResponse = serde_json::from_str(body).context("failed to parse chart JSON")?;

    if let Some(err) = parsed.chart.error {
        anyhow::bail!("chart API error: {}", err.describe());
    }

    let result = parsed
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .context("no chart data in response")?;

    let timestamps = result.timestamp.context("no timestamp data")?;
    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .context("no quote data")?;

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let field = |v: &[Option<f64>]| v.get(i).copied().flatten();
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open),
            field(&quote.high),
            field(&quote.low),
            field(&quote.close),
        ) else {
            continue;
        };

        let Some(timestamp) = DateTime::<Utc>::from_timestamp(ts, 0) else {
            warn!(ts, "skipping bar with out-of-range timestamp");
            continue;
        };

        let volume = field(&quote.volume).unwrap_or(0.0);
        bars.push(Bar::new(timestamp, open, high, low, close, volume));
    }

    if bars.is_empty() {
        anyhow::bail!("no data: every bar in the response was empty");
    }
    bars.sort_by_key(|b| b.timestamp);

    let raw = result.meta;
    let meta = ChartMeta {
        symbol: raw.symbol.unwrap_or_default(),
        currency: raw.currency,
        exchange: raw.full_exchange_name.or(raw.exchange_name),
        long_name: raw.long_name.or(raw.short_name),
        regular_market_price: raw.regular_market_price,
        previous_close: raw.previous_close.or(raw.chart_previous_close),
        fifty_two_week_high: raw.fifty_two_week_high,
        fifty_two_week_low: raw.fifty_two_week_low,
    };

    Ok(ChartData { meta, bars })
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {
                    "currency": "USD",
                    "symbol": "AAPL",
                    "exchangeName": "NMS",
                    "fullExchangeName": "NasdaqGS",
                    "longName": "Apple Inc.",
                    "regularMarketPrice": 191.5,
                    "chartPreviousClose": 185.2,
                    "fiftyTwoWeekHigh": 199.62,
                    "fiftyTwoWeekLow": 164.08
                },
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open":   [187.15, null, 182.15],
                        "high":   [188.44, 185.88, 183.09],
                        "low":    [183.89, 183.43, 180.88],
                        "close":  [185.64, 184.25, 181.91],
                        "volume": [82488700, 58414500, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_bars_and_meta() {
        let chart = parse_chart_response(SAMPLE).unwrap();
        assert_eq!(chart.bars.len(), 2, "row with null open is skipped");
        assert_eq!(chart.meta.symbol, "AAPL");
        assert_eq!(chart.meta.exchange.as_deref(), Some("NasdaqGS"));
        assert_eq!(chart.meta.long_name.as_deref(), Some("Apple Inc."));
        assert_eq!(chart.meta.previous_close, Some(185.2));
        assert_eq!(chart.meta.fifty_two_week_high, Some(199.62));
        assert_eq!(chart.meta.fifty_two_week_low, Some(164.08));

        let first = &chart.bars[0];
        assert_eq!(first.timestamp.timestamp(), 1704205800);
        assert!((first.close - 185.64).abs() < 1e-9);
        assert!((first.volume - 82_488_700.0).abs() < 1e-3);
    }

    #[test]
    fn missing_volume_becomes_zero() {
        let chart = parse_chart_response(SAMPLE).unwrap();
        assert_eq!(chart.bars[1].volume, 0.0);
    }

    #[test]
    fn provider_error_is_reported() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart_response(body).unwrap_err();
        assert!(err.to_string().contains("symbol may be delisted"), "{err}");
        assert_eq!(
            provider_error(body).unwrap().as_deref(),
            Some("No data found, symbol may be delisted")
        );
    }

    #[test]
    fn empty_result_is_error() {
        let body = r#"{"chart":{"result":[],"error":null}}"#;
        assert!(parse_chart_response(body).is_err());
    }

    #[test]
    fn all_null_rows_is_error() {
        let body = r#"{"chart":{"result":[{"meta":{},"timestamp":[1],
            "indicators":{"quote":[{"open":[null],"high":[null],"low":[null],"close":[null],"volume":[null]}]}}],
            "error":null}}"#;
        let err = parse_chart_response(body).unwrap_err();
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn chart_url_uses_period_range() {
        let mut cfg = DashboardConfig::default();
        cfg.yahoo_base_url = "http://localhost:9/".to_string();
        let client = YahooClient::new(&cfg).unwrap();
        assert_eq!(
            client.chart_url("msft", Period::SixMonths),
            "http://localhost:9/v8/finance/chart/MSFT?range=6mo&interval=1d&includePrePost=false"
        );
        assert_eq!(
            client.quote_summary_url(" aapl"),
            "http://localhost:9/v10/finance/quoteSummary/AAPL"
        );
    }
}
