//! # Hoard Engine
//!
//! A read-through caching reverse proxy. The proxy sits in front of a
//! single HTTP origin, forwards GET requests it has not seen before,
//! persists the origin's body to a filesystem store, and serves every
//! later request for the same path from that store without contacting
//! the origin again. Responses carry an `X-Cache` header set to `HIT`
//! or `MISS`.
//!
//! The store mirrors URL paths: `/public/style.css` lands at
//! `<root>/public/style.css`, while an extensionless path such as
//! `/api/widgets` lands at `<root>/api/widgets/index.<ext>` with the
//! extension derived from the upstream content type.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
mod flight;
pub mod proxy;

pub use cache::{clear_store, CacheStatus, CACHE_STATUS_HEADER};
pub use config::ProxyConfig;
pub use error::{ClearError, ProxyError};
pub use proxy::CacheProxy;
