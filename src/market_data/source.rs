use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

use super::{ChartData, CompanyProfile};
use crate::types::Period;

/// Boxed future returned by [`ChartSource`] so the trait stays object safe.
pub type ChartFuture<'a> = Pin<Box<dyn Future<Output = Result<ChartData>> + Send + 'a>>;

pub type ProfileFuture<'a> = Pin<Box<dyn Future<Output = Result<CompanyProfile>> + Send + 'a>>;

/// Anything that can produce daily OHLCV history and a company profile for a
/// ticker.
///
/// The live implementation is [`crate::yahoo::client::YahooClient`]; tests
/// plug in an in-memory source.
pub trait ChartSource: Send + Sync {
    /// Short provider name shown as the data attribution.
    fn name(&self) -> &'static str;

    fn fetch_chart<'a>(&'a self, ticker: &'a str, period: Period) -> ChartFuture<'a>;

    /// Fundamentals and description. Failure here never blocks the charts.
    fn fetch_profile<'a>(&'a self, ticker: &'a str) -> ProfileFuture<'a>;
}
