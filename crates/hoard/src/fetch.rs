//! # Origin Fetcher
//!
//! One reqwest client per proxy, bound to the origin base URL. Issues
//! exactly one upstream GET per client request and classifies what
//! came back; retries and backoff are deliberately absent.

use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use crate::config::ProxyConfig;
use crate::error::ProxyError;

/// How an upstream fetch failed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The origin answered, but with an error status. The status is
    /// passed through to the client untouched.
    #[error("origin returned status {0}")]
    Status(StatusCode),

    /// The origin could not be reached at all (refused, DNS, timeout).
    #[error("origin unreachable: {0}")]
    Unreachable(reqwest::Error),

    /// Anything else.
    #[error("origin request failed: {0}")]
    Other(reqwest::Error),
}

/// HTTP client for the configured origin.
#[derive(Debug, Clone)]
pub struct OriginClient {
    client: Client,
    base: Url,
}

/// Build the upstream reqwest client from the proxy configuration.
pub fn create_client(config: &ProxyConfig) -> Result<Client, ProxyError> {
    let mut builder = Client::builder()
        .pool_max_idle_per_host(5)
        .user_agent(&config.user_agent)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        builder = builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        builder = builder.connect_timeout(config.connect_timeout);
    }

    builder.build().map_err(ProxyError::from)
}

impl OriginClient {
    pub fn new(config: &ProxyConfig) -> Result<Self, ProxyError> {
        match config.origin.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ProxyError::InvalidOrigin(format!(
                    "unsupported scheme '{other}'"
                )));
            }
        }
        Ok(Self {
            client: create_client(config)?,
            base: config.origin.clone(),
        })
    }

    /// Upstream URL for the raw path-and-query of an inbound request.
    ///
    /// The path is applied onto a clone of the base URL rather than
    /// resolved against it: URL reference resolution would let a
    /// protocol-relative path like `//host/x` replace the origin
    /// authority.
    fn upstream_url(&self, path_and_query: &str) -> Url {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };
        let mut url = self.base.clone();
        url.set_path(path);
        url.set_query(query);
        url
    }

    /// GET the origin at the raw path-and-query the client sent,
    /// asking for a streamable body.
    pub async fn fetch(&self, path_and_query: &str) -> Result<Response, FetchError> {
        let url = self.upstream_url(path_and_query);

        debug!(url = %url, "fetching origin");
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() || e.is_request() => {
                return Err(FetchError::Unreachable(e));
            }
            Err(e) => return Err(FetchError::Other(e)),
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(response)
    }
}
