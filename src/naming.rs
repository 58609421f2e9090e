//! Centralized parsing of asset file references.
//!
//! Every declared asset is identified by a short name derived from its file
//! reference, and every file reference is either local (resolved against the
//! configured directories) or remote. This module keeps those rules in one
//! place so the registry, the cache and the renderer agree on them.
//!
//! ## Derived Names
//!
//! The name is the basename with the kind's extension stripped. Any other
//! dots are kept, so minified vendor files keep a distinct name:
//! - `app.js` → `app`
//! - `vendor/jquery.min.js` → `jquery.min`
//! - `https://cdn.example.com/lib/x.js?ver=3` → `x`
//! - `print.css` (style) → `print`

use crate::types::AssetKind;

/// True when a file reference points at a remote location.
///
/// Matches `http://`, `https://` and protocol-relative `//` prefixes.
pub fn is_remote(file_ref: &str) -> bool {
    file_ref.starts_with("http://") || file_ref.starts_with("https://") || file_ref.starts_with("//")
}

/// Derive an asset name from its file reference.
///
/// Query strings and fragments are ignored; only the kind's own extension is
/// stripped. Returns an empty string for an empty reference.
pub fn derive_asset_name(file_ref: &str, kind: AssetKind) -> String {
    let without_query = file_ref
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let basename = without_query
        .rsplit('/')
        .next()
        .unwrap_or(without_query);
    let suffix = format!(".{}", kind.extension());
    match basename.strip_suffix(&suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => basename.to_string(),
    }
}

/// Join a base URL with path segments using single slashes.
///
/// Empty segments are skipped and surrounding slashes are normalized:
/// - `("/", ["js", "app.js"])` → `/js/app.js`
/// - `("https://x.com/static/", ["css/", "/a.css"])` → `https://x.com/static/css/a.css`
/// - `("", ["cache"])` → `/cache`
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        url.push('/');
        url.push_str(segment);
    }
    if url.is_empty() {
        url.push('/');
    }
    url
}

/// Same as [`join_url`] but always ends with a slash (directory URL).
pub fn dir_url(base: &str, segments: &[&str]) -> String {
    let mut url = join_url(base, segments);
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
