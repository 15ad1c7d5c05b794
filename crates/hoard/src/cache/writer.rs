//! # Cache Writer
//!
//! Persists an upstream body to the store as it arrives. The bytes
//! stream into a temporary sibling file that is renamed into place
//! only once the stream completes, so a truncated download can never
//! surface as a HIT later. Callers respond to the client only after
//! `store` returns.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use super::location::CacheLocation;
use super::mime;
use crate::error::ProxyError;

/// Stream `body` into the entry for `location`, returning the final
/// entry path on success.
///
/// For extensionless locations the file name is finalized here as
/// `index.<ext>` with the extension derived from `content_type`; an
/// unmappable content type fails the request before anything touches
/// disk.
pub async fn store<S, E>(
    location: &CacheLocation,
    content_type: &str,
    mut body: S,
) -> Result<PathBuf, ProxyError>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    ProxyError: From<E>,
{
    let entry_path = match location.entry_path() {
        Some(path) => path,
        None => {
            let ext = mime::extension_for(content_type)
                .ok_or_else(|| ProxyError::UnmappedContentType(content_type.to_string()))?;
            location.index_path(ext)
        }
    };

    if let Some(parent) = entry_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let tmp_path = tmp_sibling(&entry_path);
    let mut file = fs::File::create(&tmp_path).await?;

    while let Some(chunk) = body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                discard(&tmp_path).await;
                return Err(ProxyError::from(e));
            }
        };
        if let Err(e) = file.write_all(&bytes).await {
            discard(&tmp_path).await;
            return Err(e.into());
        }
    }

    if let Err(e) = file.flush().await {
        discard(&tmp_path).await;
        return Err(e.into());
    }
    drop(file);

    if let Err(e) = fs::rename(&tmp_path, &entry_path).await {
        discard(&tmp_path).await;
        return Err(e.into());
    }

    debug!(path = %entry_path.display(), "cached entry written");
    Ok(entry_path)
}

fn tmp_sibling(entry_path: &Path) -> PathBuf {
    let mut os = entry_path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

async fn discard(tmp_path: &Path) {
    if let Err(e) = fs::remove_file(tmp_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %tmp_path.display(), error = %e, "failed to remove partial cache file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::io;

    fn body_of(chunks: Vec<Result<Bytes, io::Error>>) -> impl Stream<Item = Result<Bytes, io::Error>> + Unpin {
        stream::iter(chunks)
    }

    #[tokio::test]
    async fn extensionless_entry_lands_at_index_with_derived_extension() {
        let store_dir = tempfile::tempdir().unwrap();
        let loc = CacheLocation::resolve(store_dir.path(), "/api/widgets").unwrap();

        let body = body_of(vec![Ok(Bytes::from_static(b"{\"a\":1"))]);
        let path = store(&loc, "application/json; charset=utf-8", body)
            .await
            .unwrap();

        assert_eq!(path, store_dir.path().join("api/widgets/index.json"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"{\"a\":1");
    }

    #[tokio::test]
    async fn extensioned_entry_is_stored_verbatim() {
        let store_dir = tempfile::tempdir().unwrap();
        let loc = CacheLocation::resolve(store_dir.path(), "/public/style.css").unwrap();

        let body = body_of(vec![
            Ok(Bytes::from_static(b"body{")),
            Ok(Bytes::from_static(b"}")),
        ]);
        let path = store(&loc, "text/css", body).await.unwrap();

        assert_eq!(path, store_dir.path().join("public/style.css"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"body{}");
    }

    #[tokio::test]
    async fn unmapped_content_type_fails_before_touching_disk() {
        let store_dir = tempfile::tempdir().unwrap();
        let loc = CacheLocation::resolve(store_dir.path(), "/api/widgets").unwrap();

        let body = body_of(vec![Ok(Bytes::from_static(b"x"))]);
        let err = store(&loc, "application/x-unknowable", body)
            .await
            .unwrap_err();

        assert!(matches!(err, ProxyError::UnmappedContentType(_)));
        assert!(!store_dir.path().join("api").exists());
    }

    #[tokio::test]
    async fn mid_stream_failure_leaves_no_entry_behind() {
        let store_dir = tempfile::tempdir().unwrap();
        let loc = CacheLocation::resolve(store_dir.path(), "/api/widgets").unwrap();

        let body = body_of(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(io::Error::other("upstream hung up")),
        ]);
        let err = store(&loc, "application/json", body).await.unwrap_err();
        assert!(matches!(err, ProxyError::Io(_)));

        let dir = store_dir.path().join("api/widgets");
        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none(), "no file, not even a .tmp, may remain");
    }
}
