//! URL checks and artifact naming.
//!
//! Artifacts are stored as `<unixMillis>_<basename>` where the basename is the
//! last path segment of the requested URL, sanitized for Linux filesystems.

use url::Url;

/// Fallback basename when the URL path yields nothing usable.
pub const DEFAULT_BASENAME: &str = "download.bin";

/// Parses `raw` and accepts only `http` and `https` URLs.
pub fn parse_http_url(raw: &str) -> Option<Url> {
    let parsed = Url::parse(raw.trim()).ok()?;
    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

/// Last non-empty path segment of `url`, or `None` for root paths and unparseable input.
pub fn basename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    if segment == "." || segment == ".." {
        return None;
    }
    Some(segment.to_string())
}

/// Destination file name for a transfer started at `unix_millis`.
pub fn destination_name(unix_millis: i64, url: &str) -> String {
    let base = basename(url)
        .map(|b| sanitize_file_name(&b))
        .filter(|b| !b.is_empty() && b != "." && b != "..")
        .unwrap_or_else(|| DEFAULT_BASENAME.to_string());
    format!("{unix_millis}_{base}")
}

/// Replaces separators, NUL, control characters and whitespace with `_`
/// (collapsing runs), trims leading/trailing dots, and caps the length so the
/// timestamp prefix still fits in NAME_MAX.
pub fn sanitize_file_name(name: &str) -> String {
    const MAX_BASENAME: usize = 200;

    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let unsafe_char = c == '/' || c == '\\' || c.is_control() || c.is_whitespace();
        if unsafe_char {
            if !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(c);
        }
    }

    let trimmed = out.trim_matches(|c| c == '.' || c == '_');
    let mut take = trimmed.len().min(MAX_BASENAME);
    while !trimmed.is_char_boundary(take) {
        take -= 1;
    }
    trimmed[..take].to_string()
}
