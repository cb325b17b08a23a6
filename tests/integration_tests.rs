use basic_spider::matcher::{source_domain_to_regex, RuleConfig};
use basic_spider::state::{read_json_file, write_json_file};
use basic_spider::{
    filter_by_type, map_to_path, normalize, should_ignore, should_include, to_relative,
    FileManager, HtmlParser, MatchRule, OverrideMap, SiteUrls, SpiderError, UrlRecord,
};
use tempfile::tempdir;

#[test]
fn test_mapping_examples() {
    let cases = [
        ("https://x.com/foo/bar", Some("text/html"), Some("x.com/foo/bar/index.html")),
        ("https://x.com/img.png", Some("image/png"), Some("x.com/img.png")),
        ("https://x.com/foo/", Some("image/jpeg"), Some("x.com/foo.jpg")),
        ("https://x.com/a?q=1", None, None),
    ];

    for (url, content_type, expected) in cases {
        let mapped = map_to_path(url, content_type, None, true).unwrap();
        assert_eq!(mapped.as_deref(), expected, "Failed for URL: {}", url);
    }
}

#[test]
fn test_relative_examples() {
    assert_eq!(
        to_relative("https://x.com/a/b", "https://x.com/a/c").unwrap(),
        "c"
    );
    assert!(matches!(
        to_relative("https://x.com/a", "https://y.com/b"),
        Err(SpiderError::CrossOrigin { .. })
    ));
}

#[test]
fn test_normalize_then_map_is_stable() {
    let urls = [
        "https://x.com//docs//intro#top",
        "https://x.com/docs/intro",
        "https://x.com/docs/intro/",
    ];

    let paths: Vec<String> = urls
        .iter()
        .map(|url| {
            let canonical = normalize(url).unwrap();
            assert_eq!(normalize(&canonical).unwrap(), canonical);
            map_to_path(&canonical, Some("text/html"), None, true)
                .unwrap()
                .unwrap()
        })
        .collect();

    assert!(paths.iter().all(|p| p == "x.com/docs/intro/index.html"));
}

#[test]
fn test_links_between_mapped_pages() {
    let page = map_to_path("https://x.com/blog/2024/post", Some("text/html"), None, true)
        .unwrap()
        .unwrap();
    let image = map_to_path("https://x.com/media/cover", Some("image/jpeg"), None, true)
        .unwrap()
        .unwrap();

    let link = to_relative(&page, &image).unwrap();
    assert_eq!(link, "../../../media/cover.jpg");
    assert!(!link.contains("//"));
}

#[test]
fn test_override_map_from_disk() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("url_map.json");

    let mut overrides = OverrideMap::new();
    overrides.insert(
        "https://x.com/files/get?id=9".to_string(),
        "x.com/files/manual.pdf".to_string(),
    );
    write_json_file(&overrides, &path, false).unwrap();

    let loaded: OverrideMap = read_json_file(&path).unwrap();
    let mapped = map_to_path("https://x.com/files/get?id=9", None, Some(&loaded), true).unwrap();
    assert_eq!(mapped.as_deref(), Some("x.com/files/manual.pdf"));
}

#[test]
fn test_rule_precedence() {
    let include = source_domain_to_regex(&["x.com"]).unwrap();
    let exclude = vec![MatchRule::literal("https://x.com/admin")];
    let ignore = vec![MatchRule::literal("https://x.com/logout")];

    assert!(should_include("https://x.com/docs", &include, &exclude));
    assert!(!should_include("https://x.com/admin/users", &include, &exclude));
    assert!(!should_include("https://y.com/docs", &include, &exclude));

    assert!(should_ignore("https://x.com/logout", &ignore));
    assert!(!should_ignore("https://x.com/logout/now", &ignore));
}

#[test]
fn test_rules_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("rules.json");
    std::fs::write(
        &path,
        r#"{
  "include": [{"kind": "regex", "pattern": "https?://x\\.com/"}],
  "exclude": [{"kind": "prefix", "pattern": "https://x.com/private"}]
}
"#,
    )
    .unwrap();

    let config: RuleConfig = read_json_file(&path).unwrap();
    let rules = config.compile().unwrap();

    assert!(rules.admits("http://x.com/a"));
    assert!(!rules.admits("https://x.com/private/a"));
}

#[test]
fn test_filter_crawl_state() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("site_urls.json");
    std::fs::write(
        &path,
        r#"{
  "https://x.com/": {"content-type": "text/html", "content-length": "1200"},
  "https://x.com/docs/a": {"content-type": "text/html", "content-length": 800},
  "https://x.com/docs/logo": {"content-type": "image/png", "content-length": 90},
  "https://x.com/broken": {"content-type": "broken-link"}
}
"#,
    )
    .unwrap();

    let records: SiteUrls = read_json_file(&path).unwrap();
    let pages = filter_by_type(&records, Some("text/html"), &[r"https://x\.com/docs/"]).unwrap();

    assert_eq!(pages.len(), 1);
    assert_eq!(
        pages.get("https://x.com/docs/a"),
        Some(&UrlRecord::new(Some("text/html"), Some(800)))
    );
}

#[test]
fn test_rewrite_saved_page() {
    let temp_dir = tempdir().unwrap();
    let manager = FileManager::new(temp_dir.path()).unwrap();

    let mut records = SiteUrls::new();
    records.insert(
        "https://x.com/".to_string(),
        UrlRecord::new(Some("text/html"), None),
    );
    records.insert(
        "https://x.com/about".to_string(),
        UrlRecord::new(Some("text/html"), None),
    );

    let page_path = map_to_path("https://x.com/", Some("text/html"), None, true)
        .unwrap()
        .unwrap();
    manager
        .write_text(&page_path, r#"<a href="/about">About</a>"#)
        .unwrap();

    let html = manager.read_text(&page_path).unwrap();
    let parser = HtmlParser::new("https://x.com/", Some("text/html")).unwrap();
    let rewritten = parser.rewrite_links(&html, &records, None).unwrap();
    manager.write_text(&page_path, &rewritten).unwrap();

    assert_eq!(
        manager.read_text("x.com/index.html").unwrap(),
        r#"<a href="about/index.html">About</a>"#
    );
}
