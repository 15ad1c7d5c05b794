//! # MIME Table
//!
//! Maps between content types and file extensions. The same table is
//! used when finalizing a storage path on a MISS and when re-deriving
//! the content type of a stored entry on a HIT, so the two directions
//! stay consistent.

/// Preferred extensions for common media types.
///
/// `mime_guess` returns every registered extension for a type and its
/// ordering is not useful as a canonical choice (e.g. `text/plain`
/// maps to dozens of extensions). Pin the usual suspects and fall
/// back to the registry for the rest.
const PREFERRED: &[(&str, &str)] = &[
    ("application/json", "json"),
    ("text/html", "html"),
    ("text/plain", "txt"),
    ("text/css", "css"),
    ("text/javascript", "js"),
    ("application/javascript", "js"),
    ("application/xml", "xml"),
    ("text/xml", "xml"),
    ("image/jpeg", "jpg"),
    ("image/svg+xml", "svg"),
    ("application/octet-stream", "bin"),
];

/// Extension for an upstream `Content-Type` header value.
///
/// Parameters (`; charset=...`) are ignored. Returns `None` when the
/// media type is unknown to both the preferred table and the registry.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();

    if let Some((_, ext)) = PREFERRED.iter().find(|(ct, _)| *ct == essence) {
        return Some(ext);
    }

    mime_guess::get_mime_extensions_str(&essence)
        .and_then(|exts| exts.first().copied())
}

/// Content type for a stored entry, derived from its file extension.
///
/// Unknown extensions degrade to `application/octet-stream` rather
/// than failing the HIT.
pub fn content_type_for(extension: &str) -> &'static str {
    mime_guess::from_ext(extension)
        .first_raw()
        .unwrap_or("application/octet-stream")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_types_map_to_expected_extensions() {
        assert_eq!(extension_for("application/json"), Some("json"));
        assert_eq!(extension_for("text/html"), Some("html"));
        assert_eq!(extension_for("text/css"), Some("css"));
        assert_eq!(extension_for("text/plain"), Some("txt"));
    }

    #[test]
    fn parameters_are_ignored() {
        assert_eq!(
            extension_for("application/json; charset=utf-8"),
            Some("json")
        );
        assert_eq!(extension_for("Text/HTML;charset=ISO-8859-1"), Some("html"));
    }

    #[test]
    fn unknown_type_yields_none() {
        assert_eq!(extension_for("application/x-definitely-not-a-thing"), None);
    }

    #[test]
    fn extension_round_trips_to_content_type() {
        assert_eq!(content_type_for("json"), "application/json");
        assert_eq!(content_type_for("css"), "text/css");
        assert_eq!(content_type_for("html"), "text/html");
    }

    #[test]
    fn unknown_extension_degrades_to_octet_stream() {
        assert_eq!(content_type_for("xyzzy"), "application/octet-stream");
    }
}
