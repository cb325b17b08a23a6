//! Maps an absolute URL and its content type onto a relative path inside the
//! mirror root.
//!
//! URLs that already end in an extension keep their path. Extensionless
//! ("pretty") URLs need the content type: HTML becomes a directory holding an
//! `index.html`, anything else becomes a file named after the last segment
//! with an extension derived from the MIME subtype.
//!
//! The mapping is not injective. Two extensionless URLs that differ only in
//! content type, or a page and an asset sharing a stem, can land on the same
//! path; callers that need uniqueness pin those URLs in an [`OverrideMap`].

use once_cell::sync::Lazy;
use regex::Regex;
use url::{Position, Url};

use crate::error::Result;
use crate::state::OverrideMap;

static SLASH_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new("/+").expect("valid slash pattern"));

/// Relative mirror path for `url`, or `None` when the URL carries no
/// extension and no content type is known yet.
///
/// An entry in `overrides` wins over inference. With `include_host` the path
/// starts with `host[:port]/`.
pub fn map_to_path(
    url: &str,
    content_type: Option<&str>,
    overrides: Option<&OverrideMap>,
    include_host: bool,
) -> Result<Option<String>> {
    if let Some(path) = overrides.and_then(|map| map.get(url)) {
        return Ok(Some(path.clone()));
    }

    let parsed = Url::parse(url)?;
    let prefix = if include_host {
        format!("{}/", &parsed[Position::BeforeHost..Position::AfterPort])
    } else {
        String::new()
    };

    let mut path = parsed.path().to_string();
    if path.is_empty() {
        path.push('/');
    }

    let query = parsed
        .query()
        .filter(|q| !q.is_empty())
        .map(|q| format!("?{}", q))
        .unwrap_or_default();

    if has_extension(&path) {
        return Ok(Some(clean_path(&format!("{}{}{}", prefix, path, query))));
    }

    let Some(content_type) = content_type else {
        return Ok(None);
    };

    let extension = if content_type == "text/html" {
        "/index.html".to_string()
    } else {
        // the last segment names the file, not a directory
        if path.ends_with('/') {
            path.pop();
        }
        extension_for(content_type)
    };

    Ok(Some(clean_path(&format!(
        "{}{}{}{}",
        prefix, path, extension, query
    ))))
}

/// True when the text after the last dot stays inside the final segment.
fn has_extension(path: &str) -> bool {
    path.rsplit('.')
        .next()
        .map_or(false, |candidate| !candidate.contains('/'))
}

fn extension_for(content_type: &str) -> String {
    match content_type {
        "image/jpeg" => ".jpg".to_string(),
        "image/svg+xml" => ".svg".to_string(),
        "text/javascript" | "application/javascript" => ".js".to_string(),
        // pseudo types such as "broken-link" carry no subtype
        other => other
            .split('/')
            .nth(1)
            .map(|subtype| format!(".{}", subtype))
            .unwrap_or_default(),
    }
}

fn clean_path(path: &str) -> String {
    SLASH_RUNS
        .replace_all(path, "/")
        .trim_start_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(url: &str, content_type: Option<&str>) -> Option<String> {
        map_to_path(url, content_type, None, true).unwrap()
    }

    #[test]
    fn test_html_pretty_url() {
        assert_eq!(
            map("https://x.com/foo/bar", Some("text/html")).as_deref(),
            Some("x.com/foo/bar/index.html")
        );
        assert_eq!(
            map("https://x.com/foo/bar/", Some("text/html")).as_deref(),
            Some("x.com/foo/bar/index.html")
        );
        assert_eq!(
            map("https://x.com", Some("text/html")).as_deref(),
            Some("x.com/index.html")
        );
    }

    #[test]
    fn test_existing_extension_ignores_content_type() {
        assert_eq!(
            map("https://x.com/img.png", Some("image/png")).as_deref(),
            Some("x.com/img.png")
        );
        assert_eq!(
            map("https://x.com/report.pdf", Some("text/html")).as_deref(),
            Some("x.com/report.pdf")
        );
        assert_eq!(map("https://x.com/img.png", None).as_deref(), Some("x.com/img.png"));
    }

    #[test]
    fn test_trailing_slash_stripped_for_assets() {
        assert_eq!(
            map("https://x.com/foo/", Some("image/jpeg")).as_deref(),
            Some("x.com/foo.jpg")
        );
    }

    #[test]
    fn test_unmappable_without_content_type() {
        assert_eq!(map("https://x.com/a?q=1", None), None);
        assert_eq!(map("https://x.com/", None), None);
    }

    #[test]
    fn test_extension_table() {
        let cases = [
            ("image/svg+xml", "x.com/logo.svg"),
            ("text/javascript", "x.com/logo.js"),
            ("application/javascript", "x.com/logo.js"),
            ("application/pdf", "x.com/logo.pdf"),
            ("text/css", "x.com/logo.css"),
            ("broken-link", "x.com/logo"),
        ];
        for (content_type, expected) in cases {
            assert_eq!(
                map("https://x.com/logo", Some(content_type)).as_deref(),
                Some(expected),
                "content type {}",
                content_type
            );
        }
    }

    #[test]
    fn test_dot_in_directory_segment() {
        assert_eq!(
            map("https://x.com/v1.2/docs", Some("text/html")).as_deref(),
            Some("x.com/v1.2/docs/index.html")
        );
        assert_eq!(map("https://x.com/v1.2/docs", None), None);
    }

    #[test]
    fn test_query_kept_last() {
        assert_eq!(
            map("https://x.com/search?q=rust", Some("text/html")).as_deref(),
            Some("x.com/search/index.html?q=rust")
        );
        assert_eq!(
            map("https://x.com/thumb.php?id=7", None).as_deref(),
            Some("x.com/thumb.php?id=7")
        );
    }

    #[test]
    fn test_port_and_no_host() {
        assert_eq!(
            map("http://localhost:8080/a", Some("text/html")).as_deref(),
            Some("localhost:8080/a/index.html")
        );
        assert_eq!(
            map_to_path("https://x.com/a/b", Some("text/html"), None, false)
                .unwrap()
                .as_deref(),
            Some("a/b/index.html")
        );
    }

    #[test]
    fn test_override_wins() {
        let mut overrides = OverrideMap::new();
        overrides.insert(
            "https://x.com/download".to_string(),
            "x.com/download-page.html".to_string(),
        );

        let mapped = map_to_path("https://x.com/download", None, Some(&overrides), true).unwrap();
        assert_eq!(mapped.as_deref(), Some("x.com/download-page.html"));

        let other = map_to_path("https://x.com/other", None, Some(&overrides), true).unwrap();
        assert_eq!(other, None);
    }

    #[test]
    fn test_no_doubled_separators() {
        let urls = [
            "https://x.com//a//b",
            "https://x.com/a//b.png",
            "https://x.com///",
            "https://x.com/a/?x=1",
        ];
        for url in urls {
            for content_type in ["text/html", "image/png"] {
                let path = map(url, Some(content_type)).unwrap();
                assert!(!path.contains("//"), "{} mapped to {}", url, path);
                assert!(!path.starts_with('/'), "{} mapped to {}", url, path);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let first = map("https://x.com/a/b", Some("image/webp"));
        let second = map("https://x.com/a/b", Some("image/webp"));
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("x.com/a/b.webp"));
    }

    #[test]
    fn test_parse_error() {
        assert!(map_to_path("/relative/only", Some("text/html"), None, true).is_err());
    }
}
