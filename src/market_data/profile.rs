use serde::Serialize;

/// Fundamentals and business description for a company, as reported by the
/// provider. Any field may be missing; the page shows "N/A" for those.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompanyProfile {
    pub market_cap: Option<f64>,
    pub trailing_pe: Option<f64>,
    /// Provider's average daily volume (typically three months).
    pub average_volume: Option<f64>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub business_summary: Option<String>,
}
