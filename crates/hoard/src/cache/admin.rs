//! # Cache Administrator
//!
//! The only component that ever deletes store contents, and it only
//! deletes the whole tree at once.

use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::error::ClearError;

/// Remove the entire store root recursively.
///
/// A missing root reports [`ClearError::NoCache`] rather than
/// succeeding silently; any other failure surfaces as-is.
pub async fn clear_store(store_root: &Path) -> Result<(), ClearError> {
    match fs::remove_dir_all(store_root).await {
        Ok(()) => {
            info!(root = %store_root.display(), "cache store cleared");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ClearError::NoCache),
        Err(e) => Err(e.into()),
    }
}
