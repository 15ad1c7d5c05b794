//! # Cache Store
//!
//! Filesystem-backed response store. An entry's location mirrors its
//! URL path; extensionless paths store an `index.<ext>` file whose
//! extension is derived from the upstream content type. The disk is
//! the source of truth: there is no in-memory cache state to keep
//! consistent across restarts.

mod admin;
mod location;
mod mime;
pub mod reader;
mod types;
pub mod writer;

pub use admin::clear_store;
pub use location::CacheLocation;
pub use mime::{content_type_for, extension_for};
pub use reader::CacheHit;
pub use types::{CacheStatus, CACHE_STATUS_HEADER};
