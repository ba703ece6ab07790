// =============================================================================
// Central Application State: Stock Dashboard
// =============================================================================
//
// Shared across axum handlers via `Arc<AppState>`: the configuration, the
// market-data source, and the short-lived caches sitting in front of it.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::companies::Company;
use crate::dashboard::{self, DashboardView};
use crate::market_data::{
    ChartCache, ChartData, ChartKey, ChartSource, CompanyProfile, ProfileCache,
};
use crate::runtime_config::DashboardConfig;
use crate::types::Period;

pub struct AppState {
    pub config: DashboardConfig,
    pub source: Arc<dyn ChartSource>,
    pub cache: ChartCache,
    pub profiles: ProfileCache,
    /// One gate per chart key with a fetch in flight; concurrent misses wait
    /// on it and then read the cache.
    inflight: Mutex<HashMap<ChartKey, Arc<tokio::sync::Mutex<()>>>>,
    /// Number of chart round-trips to the provider since start-up.
    pub fetch_count: AtomicU64,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(config: DashboardConfig, source: Arc<dyn ChartSource>) -> Self {
        let ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            config,
            source,
            cache: ChartCache::new(ttl),
            profiles: ProfileCache::new(ttl),
            inflight: Mutex::new(HashMap::new()),
            fetch_count: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        }
    }

    /// Cached chart for (ticker, period), fetching from the source on a miss.
    pub async fn load_chart(&self, ticker: &str, period: Period) -> Result<Arc<ChartData>> {
        let key = ChartKey::new(ticker, period);
        if let Some(chart) = self.cache.get(&key) {
            debug!(key = %key, "chart cache hit");
            return Ok(chart);
        }

        let gate = self.inflight.lock().entry(key.clone()).or_default().clone();
        let result = {
            let _guard = gate.lock().await;
            match self.cache.get(&key) {
                Some(chart) => {
                    debug!(key = %key, "chart filled by concurrent fetch");
                    Ok(chart)
                }
                None => self.fetch_chart(&key).await,
            }
        };

        let mut inflight = self.inflight.lock();
        // Map plus this task: nobody else is waiting.
        if Arc::strong_count(&gate) <= 2 {
            inflight.remove(&key);
        }
        result
    }

    async fn fetch_chart(&self, key: &ChartKey) -> Result<Arc<ChartData>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let chart = Arc::new(self.source.fetch_chart(&key.ticker, key.period).await?);
        info!(key = %key, bars = chart.bars.len(), source = self.source.name(), "chart fetched");
        self.cache.insert(key.clone(), chart.clone());
        Ok(chart)
    }

    /// Cached company profile. A failed fetch is logged and yields `None`
    /// so the page still renders.
    pub async fn load_profile(&self, ticker: &str) -> Option<Arc<CompanyProfile>> {
        let key = ticker.trim().to_uppercase();
        if let Some(profile) = self.profiles.get(&key) {
            debug!(ticker = %key, "profile cache hit");
            return Some(profile);
        }

        match self.source.fetch_profile(&key).await {
            Ok(profile) => {
                let profile = Arc::new(profile);
                self.profiles.insert(key, profile.clone());
                Some(profile)
            }
            Err(e) => {
                warn!(ticker = %key, error = %e, "profile fetch failed, showing charts only");
                None
            }
        }
    }

    /// Fetch (or reuse) the chart and profile and assemble the page payload.
    pub async fn dashboard(&self, company: Company, period: Period) -> Result<DashboardView> {
        let (chart, profile) = tokio::join!(
            self.load_chart(company.ticker, period),
            self.load_profile(company.ticker)
        );
        let chart = chart?;
        Ok(dashboard::build_dashboard(
            company,
            period,
            &chart,
            profile.as_deref(),
            self.source.name(),
        ))
    }

    /// Drop both caches. Returns how many entries were removed.
    pub fn clear_caches(&self) -> usize {
        self.cache.clear() + self.profiles.clear()
    }

    pub fn fetches(&self) -> u64 {
        self.fetch_count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::analysis::tests::bars_from_closes;
    use crate::companies;
    use crate::market_data::{ChartFuture, ChartMeta, ProfileFuture};
    use std::sync::atomic::AtomicUsize;

    /// In-memory source: serves a fixed rising series and a canned profile,
    /// or fails for tickers listed in `failing`.
    #[derive(Default)]
    pub(crate) struct StaticSource {
        pub failing: Vec<&'static str>,
        /// Every profile request fails.
        pub profile_down: bool,
        /// Latency added to each chart fetch.
        pub delay: Duration,
        pub profile_calls: AtomicUsize,
    }

    impl ChartSource for StaticSource {
        fn name(&self) -> &'static str {
            "Static"
        }

        fn fetch_chart<'a>(&'a self, ticker: &'a str, _period: Period) -> ChartFuture<'a> {
            Box::pin(async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                if self.failing.iter().any(|f| *f == ticker) {
                    anyhow::bail!("provider unavailable for {ticker}");
                }
                let closes: Vec<f64> = (1..=60).map(|x| x as f64).collect();
                Ok(ChartData {
                    meta: ChartMeta {
                        symbol: ticker.to_string(),
                        currency: Some("USD".into()),
                        ..ChartMeta::default()
                    },
                    bars: bars_from_closes(&closes),
                })
            })
        }

        fn fetch_profile<'a>(&'a self, ticker: &'a str) -> ProfileFuture<'a> {
            Box::pin(async move {
                self.profile_calls.fetch_add(1, Ordering::Relaxed);
                if self.profile_down || self.failing.iter().any(|f| *f == ticker) {
                    anyhow::bail!("quoteSummary unavailable for {ticker}");
                }
                Ok(CompanyProfile {
                    market_cap: Some(1.0e12),
                    trailing_pe: Some(25.0),
                    business_summary: Some(format!("{ticker} makes things.")),
                    ..CompanyProfile::default()
                })
            })
        }
    }

    pub(crate) fn state_with(source: StaticSource) -> Arc<AppState> {
        Arc::new(AppState::new(DashboardConfig::default(), Arc::new(source)))
    }

    pub(crate) fn test_state(failing: Vec<&'static str>) -> Arc<AppState> {
        state_with(StaticSource {
            failing,
            ..StaticSource::default()
        })
    }

    #[tokio::test]
    async fn second_load_hits_cache() {
        let state = test_state(vec![]);
        let a = state.load_chart("aapl", Period::OneYear).await.unwrap();
        let b = state.load_chart("AAPL", Period::OneYear).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(state.fetches(), 1);

        state.load_chart("AAPL", Period::FiveYears).await.unwrap();
        assert_eq!(state.fetches(), 2);
    }

    #[tokio::test]
    async fn clearing_cache_forces_refetch() {
        let state = test_state(vec![]);
        state.load_chart("MSFT", Period::OneMonth).await.unwrap();
        assert_eq!(state.cache.clear(), 1);
        state.load_chart("MSFT", Period::OneMonth).await.unwrap();
        assert_eq!(state.fetches(), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let state = test_state(vec!["TSLA"]);
        assert!(state.load_chart("TSLA", Period::OneYear).await.is_err());
        assert_eq!(state.cache.len(), 0);
        assert!(state.inflight.lock().is_empty());
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_fetch() {
        let state = state_with(StaticSource {
            delay: Duration::from_millis(20),
            ..StaticSource::default()
        });
        let (a, b) = tokio::join!(
            state.load_chart("AAPL", Period::OneYear),
            state.load_chart("aapl", Period::OneYear)
        );
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(state.fetches(), 1);
        assert!(state.inflight.lock().is_empty());
    }

    #[tokio::test]
    async fn dashboard_includes_cached_profile() {
        let source = Arc::new(StaticSource::default());
        let state = AppState::new(DashboardConfig::default(), source.clone());
        let company = companies::default_company();

        let view = state.dashboard(company, Period::OneYear).await.unwrap();
        assert_eq!(view.company.market_cap, Some(1.0e12));
        assert_eq!(view.company.about.as_deref(), Some("AAPL makes things."));

        state.dashboard(company, Period::SixMonths).await.unwrap();
        assert_eq!(source.profile_calls.load(Ordering::Relaxed), 1);
        assert_eq!(state.clear_caches(), 3);
    }

    #[tokio::test]
    async fn profile_failure_keeps_charts() {
        let state = state_with(StaticSource {
            profile_down: true,
            ..StaticSource::default()
        });
        let view = state
            .dashboard(companies::default_company(), Period::OneYear)
            .await
            .unwrap();
        assert_eq!(view.bar_count, 60);
        assert_eq!(view.company.market_cap, None);
        assert_eq!(view.company.about, None);
        assert_eq!(state.profiles.len(), 0);
    }
}
