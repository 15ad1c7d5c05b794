use std::path::PathBuf;
use std::time::Duration;

use url::Url;

const DEFAULT_USER_AGENT: &str = concat!("hoard/", env!("CARGO_PKG_VERSION"));

/// Configurable options for the proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the origin server whose responses are cached
    pub origin: Url,

    /// Store root under which all cache entries live
    pub cache_dir: PathBuf,

    /// Overall timeout for one upstream request; zero means none
    pub timeout: Duration,

    /// Connection timeout for upstream requests
    pub connect_timeout: Duration,

    /// Whether the upstream client follows redirects
    pub follow_redirects: bool,

    /// User agent sent on upstream requests
    pub user_agent: String,

    /// Deduplicate concurrent misses for the same path so the origin
    /// is fetched at most once per path at a time
    pub single_flight: bool,
}

impl ProxyConfig {
    pub fn new(origin: Url, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            origin,
            cache_dir: cache_dir.into(),
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            single_flight: true,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled;
        self
    }
}
