//! # Cache Location
//!
//! Maps a percent-decoded URL path to the spot in the store that a
//! cache entry for it would occupy. Extensionless ("directory-style")
//! paths cannot be fully resolved until the upstream content type is
//! known, so they carry only the directory portion.

use std::path::{Path, PathBuf};

use crate::error::ProxyError;

/// Resolved storage location for one URL path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLocation {
    /// Directory that holds (or will hold) the entry file.
    dir: PathBuf,
    /// Entry file name; `None` for extensionless paths, where the
    /// name becomes `index.<ext>` once the content type is known.
    file_name: Option<String>,
    /// The decoded URL path this location was resolved from.
    key: String,
}

impl CacheLocation {
    /// Resolve a decoded URL path against the store root.
    ///
    /// Empty and `.` segments are dropped; any `..` segment is
    /// rejected so a crafted path can never escape the store.
    pub fn resolve(store_root: &Path, decoded_path: &str) -> Result<Self, ProxyError> {
        let mut segments = Vec::new();
        for segment in decoded_path.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(ProxyError::RejectedPath(decoded_path.to_string())),
                seg => {
                    // A decoded segment that still smuggles a
                    // separator or drive-style prefix is refused.
                    if seg.contains('\\') || seg.contains(':') || seg.contains('\0') {
                        return Err(ProxyError::RejectedPath(decoded_path.to_string()));
                    }
                    segments.push(seg);
                }
            }
        }

        let has_extension = segments
            .last()
            .is_some_and(|seg| seg.rfind('.').is_some_and(|i| i > 0));

        let (dir_segments, file_name) = if has_extension {
            let (last, rest) = segments.split_last().expect("non-empty when extensioned");
            (rest, Some((*last).to_string()))
        } else {
            (segments.as_slice(), None)
        };

        let mut dir = store_root.to_path_buf();
        for seg in dir_segments {
            dir.push(seg);
        }

        Ok(Self {
            dir,
            file_name,
            key: decoded_path.to_string(),
        })
    }

    /// Directory that contains (or will contain) the entry file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The decoded URL path, used as the single-flight key.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_extensionless(&self) -> bool {
        self.file_name.is_none()
    }

    /// Fully resolved entry path, if the URL path carried an extension.
    pub fn entry_path(&self) -> Option<PathBuf> {
        self.file_name.as_ref().map(|name| self.dir.join(name))
    }

    /// Entry path for an extensionless location once the extension is
    /// known from the content type.
    pub fn index_path(&self, extension: &str) -> PathBuf {
        self.dir.join(format!("index.{extension}"))
    }
}
