//! HTTP fetcher implementation
//!
//! Fetches chapter pages with reqwest, following redirects and reporting the final
//! URL so relative links on the page resolve correctly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{redirect, Client as ReqwestClient};
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, instrument, warn, Instrument};
use url::Url;

use super::{FetchConfig, FetchError, FetchTarget, FetchedPage, Fetcher};

/// reqwest-backed [`Fetcher`]
#[derive(Clone)]
pub struct HttpFetcher {
    /// The underlying reqwest client
    client: ReqwestClient,

    /// Headers merged under every target's own headers
    default_headers: HashMap<String, String>,

    /// Shared request quota, when configured
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl HttpFetcher {
    /// Create a fetcher from the given configuration
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let client = ReqwestClient::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .redirect(redirect::Policy::limited(config.max_redirects))
            .build()?;
        let limiter = config
            .requests_per_minute
            .map(|quota| Arc::new(RateLimiter::direct(Quota::per_minute(quota))));

        Ok(Self {
            client,
            default_headers: config.default_headers,
            limiter,
        })
    }

    fn build_headers(&self, target: &FetchTarget) -> Result<HeaderMap, FetchError> {
        let mut headers = HeaderMap::new();
        for (name, value) in self.default_headers.iter().chain(target.headers.iter()) {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }
        Ok(headers)
    }
}

impl std::fmt::Debug for HttpFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFetcher")
            .field("default_headers", &self.default_headers)
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[instrument(skip(self, target, cancel), fields(url = %target.url), level = "debug")]
    async fn fetch(
        &self,
        target: &FetchTarget,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, FetchError> {
        if let Some(limiter) = &self.limiter {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = limiter.until_ready().instrument(debug_span!("limiter")) => {}
            }
        }

        let url = Url::parse(&target.url)?;
        let request = self.client.get(url).headers(self.build_headers(target)?);

        debug!("Sending GET request");
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            response = request.send() => response?,
        };

        let final_url = response.url().to_string();
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "request failed");
            return Err(FetchError::Status {
                url: target.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            body = response.text() => body?,
        };
        debug!(final_url = %final_url, bytes = body.len(), "received page");

        Ok(FetchedPage::new(
            target.url.clone(),
            final_url,
            (!body.is_empty()).then_some(body),
        ))
    }
}
