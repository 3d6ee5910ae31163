//! # Page Fetching Module
//!
//! The network side of chapter assembly. Everything else in the crate talks to the
//! network through the [`Fetcher`] trait, so tests and embedders can substitute their
//! own transport.
//!
//! ## Key Components
//!
//! - `Fetcher`: async trait resolving a [`FetchTarget`] into a [`FetchedPage`]
//! - `HttpFetcher`: reqwest-backed implementation with optional rate limiting
//! - `FetchConfig`: user agent, timeout, redirect and quota settings

mod config;
mod error;
mod http;

pub use config::{FetchConfig, FetchConfigBuilder};
pub use error::FetchError;
pub use http::HttpFetcher;

use std::collections::HashMap;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// A URL to request plus the headers to send with it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub headers: HashMap<String, String>,
}

impl FetchTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
        }
    }

    /// Replace the request headers
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }
}

/// Result of one successful request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPage {
    /// URL that was asked for
    pub requested_url: String,

    /// URL the response was served from, after redirects
    pub final_url: String,

    /// Response body; `None` when the server sent nothing
    pub body: Option<String>,
}

impl FetchedPage {
    pub fn new(
        requested_url: impl Into<String>,
        final_url: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        Self {
            requested_url: requested_url.into(),
            final_url: final_url.into(),
            body,
        }
    }
}

/// Performs requests for chapter pages
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `target`, giving up with [`FetchError::Cancelled`] once `cancel` fires
    async fn fetch(
        &self,
        target: &FetchTarget,
        cancel: &CancellationToken,
    ) -> Result<FetchedPage, FetchError>;
}
