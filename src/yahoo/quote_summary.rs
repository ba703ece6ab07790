// =============================================================================
// Yahoo quoteSummary parsing: market cap, P/E, average volume, profile
// =============================================================================
//
//   GET {base}/v10/finance/quoteSummary/{ticker}
//       ?modules=price,summaryDetail,assetProfile&crumb={crumb}
//
// Numeric fields arrive wrapped as `{"raw": 123.4, "fmt": "123.40"}` and as
// `{}` when the provider has no value.
// =============================================================================

use anyhow::{Context, Result};
use serde::Deserialize;

use super::client::ProviderError;
use crate::market_data::CompanyProfile;

pub const MODULES: &str = "price,summaryDetail,assetProfile";

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryEnvelope,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryEnvelope {
    #[serde(default)]
    result: Option<Vec<QuoteSummaryResult>>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    asset_profile: Option<AssetProfileModule>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    #[serde(default)]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    #[serde(default)]
    market_cap: Option<RawValue>,
    #[serde(default, rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(default)]
    average_volume: Option<RawValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfileModule {
    #[serde(default)]
    sector: Option<String>,
    #[serde(default)]
    industry: Option<String>,
    #[serde(default)]
    website: Option<String>,
    #[serde(default)]
    long_business_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

/// Zero stands in for "unknown" in these modules.
fn raw(value: Option<&RawValue>) -> Option<f64> {
    value?.raw.filter(|v| v.is_finite() && *v != 0.0)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Provider error description from a quoteSummary envelope, if any.
pub fn summary_error(body: &str) -> Option<String> {
    let parsed: QuoteSummaryResponse = serde_json::from_str(body).ok()?;
    parsed.quote_summary.error.map(ProviderError::describe)
}

/// Parse a quoteSummary body into a [`CompanyProfile`].
pub fn parse_quote_summary(body: &str) -> Result<CompanyProfile> {
    let parsed: QuoteSummaryResponse =
        serde_json::from_str(body).context("failed to parse quoteSummary JSON")?;

    if let Some(err) = parsed.quote_summary.error {
        anyhow::bail!("quoteSummary API error: {}", err.describe());
    }

    let result = parsed
        .quote_summary
        .result
        .and_then(|r| r.into_iter().next())
        .context("no quoteSummary result in response")?;

    let detail = result.summary_detail.as_ref();
    let market_cap = raw(result.price.as_ref().and_then(|p| p.market_cap.as_ref()))
        .or_else(|| raw(detail.and_then(|d| d.market_cap.as_ref())));

    let profile = result.asset_profile;
    let (sector, industry, website, business_summary) = match profile {
        Some(p) => (
            non_empty(p.sector),
            non_empty(p.industry),
            non_empty(p.website),
            non_empty(p.long_business_summary),
        ),
        None => (None, None, None, None),
    };

    Ok(CompanyProfile {
        market_cap,
        trailing_pe: raw(detail.and_then(|d| d.trailing_pe.as_ref())),
        average_volume: raw(detail.and_then(|d| d.average_volume.as_ref())),
        sector,
        industry,
        website,
        business_summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "quoteSummary": {
            "result": [{
                "price": {
                    "marketCap": { "raw": 2950000000000, "fmt": "2.95T" },
                    "currency": "USD"
                },
                "summaryDetail": {
                    "trailingPE": { "raw": 30.12, "fmt": "30.12" },
                    "averageVolume": { "raw": 58414500, "fmt": "58.41M" },
                    "fiftyTwoWeekHigh": { "raw": 199.62 }
                },
                "assetProfile": {
                    "sector": "Technology",
                    "industry": "Consumer Electronics",
                    "website": "https://www.apple.com",
                    "longBusinessSummary": "Apple Inc. designs, manufactures, and markets smartphones."
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parses_fundamentals_and_profile() {
        let profile = parse_quote_summary(SAMPLE).unwrap();
        assert_eq!(profile.market_cap, Some(2.95e12));
        assert_eq!(profile.trailing_pe, Some(30.12));
        assert_eq!(profile.average_volume, Some(58_414_500.0));
        assert_eq!(profile.sector.as_deref(), Some("Technology"));
        assert_eq!(profile.industry.as_deref(), Some("Consumer Electronics"));
        assert!(profile.business_summary.unwrap().starts_with("Apple Inc."));
    }

    #[test]
    fn empty_values_are_none() {
        let body = r#"{"quoteSummary":{"result":[{
            "price": { "marketCap": {} },
            "summaryDetail": { "marketCap": { "raw": 1.5e9 }, "trailingPE": {}, "averageVolume": { "raw": 0 } },
            "assetProfile": { "sector": "", "longBusinessSummary": "   " }
        }],"error":null}}"#;
        let profile = parse_quote_summary(body).unwrap();
        assert_eq!(profile.market_cap, Some(1.5e9), "falls back to summaryDetail");
        assert_eq!(profile.trailing_pe, None);
        assert_eq!(profile.average_volume, None);
        assert_eq!(profile.sector, None);
        assert_eq!(profile.business_summary, None);
    }

    #[test]
    fn missing_modules_give_empty_profile() {
        let body = r#"{"quoteSummary":{"result":[{}],"error":null}}"#;
        assert_eq!(parse_quote_summary(body).unwrap(), CompanyProfile::default());
    }

    #[test]
    fn provider_error_is_reported() {
        let body = r#"{"quoteSummary":{"result":null,"error":{"code":"Unauthorized","description":"Invalid Crumb"}}}"#;
        let err = parse_quote_summary(body).unwrap_err();
        assert!(err.to_string().contains("Invalid Crumb"), "{err}");
        assert_eq!(summary_error(body).as_deref(), Some("Invalid Crumb"));
        assert_eq!(summary_error("not json"), None);
    }
}
