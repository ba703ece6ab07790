// =============================================================================
// Yahoo Cookie / Crumb Handshake
// =============================================================================
//
// The quoteSummary endpoint rejects requests that lack a session cookie and a
// matching crumb token:
//
//   1. GET https://fc.yahoo.com            -> sets the session cookie
//   2. GET {base}/v1/test/getcrumb         -> plain-text crumb for that cookie
//
// The cookie lives in the reqwest client's cookie store; the crumb is cached
// here for an hour and dropped early when the provider answers 401.
// =============================================================================

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, REFERER};
use tokio::sync::Mutex;
use tracing::{debug, info};

const CRUMB_TTL: Duration = Duration::from_secs(3600);
const MAX_CRUMB_LEN: usize = 100;
pub(super) const FINANCE_REFERER: &str = "https://finance.yahoo.com/";

struct Crumb {
    value: String,
    fetched_at: Instant,
}

/// Caches the crumb. The async mutex keeps concurrent callers from running
/// the handshake twice.
pub struct CrumbStore {
    cookie_url: String,
    crumb_url: String,
    cached: Mutex<Option<Crumb>>,
}

impl CrumbStore {
    pub fn new(cookie_url: &str, base_url: &str) -> Self {
        Self {
            cookie_url: cookie_url.to_string(),
            crumb_url: format!("{base_url}/v1/test/getcrumb"),
            cached: Mutex::new(None),
        }
    }

    /// Current crumb, running the handshake when none is cached or it aged out.
    pub async fn get(&self, client: &reqwest::Client) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(crumb) = cached.as_ref().filter(|c| c.fetched_at.elapsed() < CRUMB_TTL) {
            return Ok(crumb.value.clone());
        }

        let value = self.handshake(client).await?;
        info!("Yahoo crumb refreshed");
        *cached = Some(Crumb {
            value: value.clone(),
            fetched_at: Instant::now(),
        });
        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn handshake(&self, client: &reqwest::Client) -> Result<String> {
        // Only the Set-Cookie matters; fc.yahoo.com usually answers 404.
        let resp = client
            .get(&self.cookie_url)
            .header(REFERER, FINANCE_REFERER)
            .send()
            .await
            .context("failed to fetch Yahoo session cookie")?;
        debug!(status = %resp.status(), "session cookie request done");

        let resp = client
            .get(&self.crumb_url)
            .header(ACCEPT, "text/plain, */*")
            .header(REFERER, FINANCE_REFERER)
            .send()
            .await
            .context("GET /v1/test/getcrumb request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("failed to read crumb body")?;
        if !status.is_success() {
            anyhow::bail!("crumb endpoint returned {status}");
        }
        parse_crumb(&body)
    }
}

/// Validate the crumb body. HTML error pages and rate-limit notices come back
/// with 200 too, so anything long or containing spaces / markup is rejected.
pub fn parse_crumb(body: &str) -> Result<String> {
    let crumb = body.trim();
    if crumb.is_empty()
        || crumb.len() >= MAX_CRUMB_LEN
        || crumb.contains(char::is_whitespace)
        || crumb.contains('<')
    {
        anyhow::bail!("unexpected crumb response: {}", crumb.chars().take(60).collect::<String>());
    }
    Ok(crumb.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_crumb() {
        assert_eq!(parse_crumb("  aBc.D3f/Gh9\n").unwrap(), "aBc.D3f/Gh9");
    }

    #[test]
    fn rejects_html_and_rate_limit_bodies() {
        assert!(parse_crumb("<!DOCTYPE html><html></html>").is_err());
        assert!(parse_crumb("Too Many Requests").is_err());
        assert!(parse_crumb("").is_err());
        assert!(parse_crumb(&"x".repeat(120)).is_err());
    }

    #[test]
    fn crumb_url_follows_base() {
        let store = CrumbStore::new("https://fc.yahoo.com", "http://localhost:9");
        assert_eq!(store.crumb_url, "http://localhost:9/v1/test/getcrumb");
    }
}
