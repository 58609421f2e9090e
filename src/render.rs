//! HTML tag formatting and stylesheet media ordering.
//!
//! Pure functions: no I/O, no configuration. The tag shapes are part of the
//! crate's output contract:
//!
//! ```text
//! <script type='text/javascript' src='/cache/app.parsed.min.js?v=20240101'></script>
//! <link rel='stylesheet' type='text/css' href='/css/site.css?v=20240101' media='all' />
//! ```

use crate::types::MEDIA_PRECEDENCE;
use indexmap::IndexMap;

/// Escape a value for use inside a single-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Append the cache-busting `v` parameter.
pub fn versioned(url: &str, version: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}v={version}")
}

pub fn script_tag(src: &str) -> String {
    format!(
        "<script type='text/javascript' src='{}'></script>",
        escape_attr(src)
    )
}

pub fn style_tag(href: &str, media: &str) -> String {
    format!(
        "<link rel='stylesheet' type='text/css' href='{}' media='{}' />",
        escape_attr(href),
        escape_attr(media)
    )
}

/// Partition items by media, keeping each partition's order and recording
/// media in first-encountered order.
pub fn partition_by_media<T, F>(items: impl IntoIterator<Item = T>, media_of: F) -> IndexMap<String, Vec<T>>
where
    F: Fn(&T) -> &str,
{
    let mut partitions: IndexMap<String, Vec<T>> = IndexMap::new();
    for item in items {
        let media = media_of(&item).to_string();
        partitions.entry(media).or_default().push(item);
    }
    partitions
}

/// Reorder media partitions: `all`, `screen`, `print`, then the rest in
/// encountered order.
pub fn order_by_media<T>(mut partitions: IndexMap<String, Vec<T>>) -> Vec<(String, Vec<T>)> {
    let mut ordered = Vec::with_capacity(partitions.len());
    for media in MEDIA_PRECEDENCE {
        if let Some(items) = partitions.shift_remove(media) {
            ordered.push((media.to_string(), items));
        }
    }
    ordered.extend(partitions);
    ordered
}

/// Concatenate tags, one per line.
pub fn join_tags(tags: &[String]) -> String {
    tags.iter().map(|t| format!("{t}\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_tag_shape() {
        assert_eq!(
            script_tag("/js/a.js?v=20240101"),
            "<script type='text/javascript' src='/js/a.js?v=20240101'></script>"
        );
    }

    #[test]
    fn style_tag_shape() {
        assert_eq!(
            style_tag("/css/a.css?v=20240101", "screen"),
            "<link rel='stylesheet' type='text/css' href='/css/a.css?v=20240101' media='screen' />"
        );
    }

    #[test]
    fn attributes_escaped() {
        assert_eq!(escape_attr("a'b&c<d>\""), "a&#39;b&amp;c&lt;d&gt;&quot;");
        assert!(style_tag("/x.css", "screen and (min-width: 1px)").contains("media='screen and (min-width: 1px)'"));
    }

    #[test]
    fn versioned_picks_separator() {
        assert_eq!(versioned("/a.js", "20240101"), "/a.js?v=20240101");
        assert_eq!(versioned("/a.js?x=1", "20240101"), "/a.js?x=1&v=20240101");
    }

    #[test]
    fn media_precedence_regardless_of_declaration() {
        let items = vec![("p", "print"), ("s", "screen"), ("a", "all")];
        let ordered = order_by_media(partition_by_media(items, |i| i.1));
        let media: Vec<&str> = ordered.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(media, vec!["all", "screen", "print"]);
    }

    #[test]
    fn unknown_media_follow_in_encountered_order() {
        let items = vec![
            ("h", "handheld"),
            ("p", "print"),
            ("t", "tv"),
            ("a1", "all"),
            ("a2", "all"),
        ];
        let ordered = order_by_media(partition_by_media(items, |i| i.1));
        let media: Vec<&str> = ordered.iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(media, vec!["all", "print", "handheld", "tv"]);
        let all: Vec<&str> = ordered[0].1.iter().map(|i| i.0).collect();
        assert_eq!(all, vec!["a1", "a2"]);
    }

    #[test]
    fn join_tags_one_per_line() {
        assert_eq!(join_tags(&["<a>".into(), "<b>".into()]), "<a>\n<b>\n");
        assert_eq!(join_tags(&[]), "");
    }
}
