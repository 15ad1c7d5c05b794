//! # Cache Reader
//!
//! Decides HIT or MISS for a resolved location with zero origin I/O.
//! Probe failures of any kind degrade to MISS so that a broken store
//! never blocks traffic to the origin.

use std::path::PathBuf;

use tokio::fs;
use tracing::{debug, warn};

use super::location::CacheLocation;
use super::mime;

/// A cache entry selected to serve a request, opened and ready to
/// stream. Opening happens here so a HIT can never turn into a
/// half-served response when the file vanishes after the probe.
#[derive(Debug)]
pub struct CacheHit {
    pub file: fs::File,
    pub path: PathBuf,
    pub content_type: &'static str,
}

/// Probe the store for an entry at `location`.
///
/// Extensioned locations hit iff the exact file exists. Extensionless
/// locations hit iff their directory holds an entry whose name starts
/// with `index`; the first such entry in iteration order is served.
pub async fn lookup(location: &CacheLocation) -> Option<CacheHit> {
    let path = match location.entry_path() {
        Some(path) => path,
        None => find_index_entry(location).await?,
    };

    let content_type = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(mime::content_type_for)
        .unwrap_or("application/octet-stream");

    match fs::File::open(&path).await {
        Ok(file) => {
            debug!(path = %path.display(), content_type, "cache hit");
            Some(CacheHit {
                file,
                path,
                content_type,
            })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cache probe failed, treating as miss");
            None
        }
    }
}

async fn find_index_entry(location: &CacheLocation) -> Option<PathBuf> {
    let mut entries = match fs::read_dir(location.dir()).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(dir = %location.dir().display(), error = %e, "cache directory listing failed, treating as miss");
            return None;
        }
    };

    loop {
        match entries.next_entry().await {
            Ok(Some(entry)) => {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                // The writer parks in-flight bodies in `.tmp` siblings
                // next to the final entry; those are not entries yet.
                if name.starts_with("index") && !name.ends_with(".tmp") {
                    return Some(entry.path());
                }
            }
            Ok(None) => return None,
            Err(e) => {
                warn!(dir = %location.dir().display(), error = %e, "cache directory listing failed, treating as miss");
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn resolved(root: &Path, url_path: &str) -> CacheLocation {
        CacheLocation::resolve(root, url_path).unwrap()
    }

    #[tokio::test]
    async fn extensioned_hit_requires_exact_file() {
        let store = tempfile::tempdir().unwrap();
        let loc = resolved(store.path(), "/public/style.css");
        assert!(lookup(&loc).await.is_none());

        tokio::fs::create_dir_all(store.path().join("public"))
            .await
            .unwrap();
        tokio::fs::write(store.path().join("public/style.css"), b"body{}")
            .await
            .unwrap();

        let hit = lookup(&loc).await.expect("hit after write");
        assert_eq!(hit.content_type, "text/css");
        assert_eq!(hit.path, store.path().join("public/style.css"));
    }

    #[tokio::test]
    async fn extensionless_hit_picks_index_entry() {
        let store = tempfile::tempdir().unwrap();
        let loc = resolved(store.path(), "/api/widgets");
        assert!(lookup(&loc).await.is_none());

        tokio::fs::create_dir_all(store.path().join("api/widgets"))
            .await
            .unwrap();
        tokio::fs::write(store.path().join("api/widgets/index.json"), b"{}")
            .await
            .unwrap();

        let hit = lookup(&loc).await.expect("hit after write");
        assert_eq!(hit.content_type, "application/json");
    }

    #[tokio::test]
    async fn extensionless_directory_without_index_is_a_miss() {
        let store = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(store.path().join("api/widgets"))
            .await
            .unwrap();
        tokio::fs::write(store.path().join("api/widgets/other.json"), b"{}")
            .await
            .unwrap();

        let loc = resolved(store.path(), "/api/widgets");
        assert!(lookup(&loc).await.is_none());
    }

    #[tokio::test]
    async fn in_flight_tmp_file_is_not_served() {
        let store = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(store.path().join("api/widgets"))
            .await
            .unwrap();
        tokio::fs::write(
            store.path().join("api/widgets/index.json.tmp"),
            b"{\"partial",
        )
        .await
        .unwrap();

        // A write in progress must stay invisible to readers.
        let loc = resolved(store.path(), "/api/widgets");
        assert!(lookup(&loc).await.is_none());

        // Once the finished entry exists it is found even with a
        // fresh temporary sitting next to it.
        tokio::fs::write(store.path().join("api/widgets/index.json"), b"{}")
            .await
            .unwrap();
        let hit = lookup(&loc).await.expect("completed entry wins");
        assert_eq!(hit.path, store.path().join("api/widgets/index.json"));
    }

    #[tokio::test]
    async fn missing_store_root_is_a_miss() {
        let loc = resolved(Path::new("/definitely/not/here"), "/api/widgets");
        assert!(lookup(&loc).await.is_none());
    }
}
