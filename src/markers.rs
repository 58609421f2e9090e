//! Placeholder tokens substituted into asset contents before minification.
//!
//! Source files can reference deployment URLs without hardcoding them:
//!
//! | Token | Replaced with |
//! |-------|---------------|
//! | `{base_url}` | `base_url` |
//! | `{script_url}` | script directory URL |
//! | `{style_url}` | stylesheet directory URL |
//! | `{cache_url}` | cache directory URL |
//!
//! Every replacement ends with `/`, so `url({style_url}img/bg.png)` works
//! whatever the configured base looks like.

use crate::config::AssetsConfig;
use crate::naming::dir_url;

/// Token/replacement pairs for the given configuration.
pub fn marker_table(config: &AssetsConfig) -> [(&'static str, String); 4] {
    [
        ("{base_url}", dir_url(&config.base_url, &[])),
        ("{script_url}", dir_url(&config.base_url, &[config.script_dir.as_str()])),
        ("{style_url}", dir_url(&config.base_url, &[config.style_dir.as_str()])),
        ("{cache_url}", dir_url(&config.base_url, &[config.cache_dir.as_str()])),
    ]
}

/// Replace every known token in `contents`.
pub fn substitute(contents: &str, config: &AssetsConfig) -> String {
    let mut out = contents.to_string();
    for (token, value) in marker_table(config) {
        if out.contains(token) {
            out = out.replace(token, &value);
        }
    }
    out
}
