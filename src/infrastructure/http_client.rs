//! HTTP client for page fetches with rate limiting and error handling
//!
//! One client is built per run and shared by every item the selector
//! handler processes. The governor quota is a ceiling on top of the runner's
//! fixed per-item delay.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT},
};
use url::Url;

use crate::infrastructure::config::HttpSettings;

/// HTTP client configuration for page fetches
#[derive(Debug, Clone, serde::Serialize)]
pub struct HttpClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub follow_redirects: bool,
}

impl From<&HttpSettings> for HttpClientConfig {
    fn from(settings: &HttpSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            timeout_seconds: settings.timeout_seconds,
            max_requests_per_second: settings.max_requests_per_second,
            follow_redirects: settings.follow_redirects,
        }
    }
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self::from(&HttpSettings::default())
    }
}

const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5";

/// Whether a response body can be handed to the HTML parser.
fn is_markup(content_type: Option<&str>) -> bool {
    content_type.is_none_or(|ct| {
        let ct = ct.to_ascii_lowercase();
        ct.starts_with("text/") || ct.contains("html") || ct.contains("xml")
    })
}

/// A fetched page: final URL after redirects plus body text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub body: String,
}

pub struct HttpClient {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(PAGE_ACCEPT));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .default_headers(headers)
            .cookie_store(true)
            .gzip(true)
            .redirect(if config.follow_redirects {
                reqwest::redirect::Policy::limited(10)
            } else {
                reqwest::redirect::Policy::none()
            })
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            config,
        })
    }

    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Fetch a page as text, failing on non-success status or a non-markup body.
    pub async fn get_page(&self, url: &Url) -> Result<FetchedPage> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("Opening page: {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to open page: {url}"))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Page {} answered {}", url, status);
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        if !is_markup(content_type.as_deref()) {
            anyhow::bail!(
                "Page {} is not markup (content-type {})",
                url,
                content_type.unwrap_or_default()
            );
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read page body: {url}"))?;
        tracing::debug!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }
}
