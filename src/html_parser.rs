use select::document::Document;
use select::predicate::Name;
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::error::Result;
use crate::normalize::normalize;
use crate::path_mapper::map_to_path;
use crate::relative::to_relative;
use crate::state::{OverrideMap, SiteUrls};

/// Elements whose attribute points at another mirrored resource.
const LINK_ATTRIBUTES: [(&str, &str); 4] = [
    ("a", "href"),
    ("link", "href"),
    ("img", "src"),
    ("script", "src"),
];

/// Rewrites the links of one mirrored page so they point at the mirrored
/// copies of their targets.
#[derive(Clone, Debug)]
pub struct HtmlParser {
    page_url: Url,
    page_content_type: Option<String>,
}

impl HtmlParser {
    pub fn new(page_url: &str, page_content_type: Option<&str>) -> Result<Self> {
        Ok(Self {
            page_url: Url::parse(page_url)?,
            page_content_type: page_content_type.map(str::to_string),
        })
    }

    /// Replaces every link whose target is a known crawl record (or has an
    /// override) with a path relative to this page's mirror location.
    ///
    /// Unknown targets, non-HTTP links and targets that cannot be mapped are
    /// left as they are. When the page itself cannot be mapped the HTML is
    /// returned unchanged.
    pub fn rewrite_links(
        &self,
        html: &str,
        records: &SiteUrls,
        overrides: Option<&OverrideMap>,
    ) -> Result<String> {
        let Some(page_path) = map_to_path(
            self.page_url.as_str(),
            self.page_content_type.as_deref(),
            overrides,
            true,
        )?
        else {
            debug!(page = %self.page_url, "page has no mirror path, links left as-is");
            return Ok(html.to_string());
        };

        let document = Document::from(html);
        let mut rewritten = html.to_string();
        let mut seen = HashSet::new();

        for (tag, attribute) in LINK_ATTRIBUTES {
            for node in document.find(Name(tag)) {
                let Some(value) = node.attr(attribute) else {
                    continue;
                };
                if !seen.insert((attribute, value.to_string())) {
                    continue;
                }

                if let Some(local) = self.local_link(value, &page_path, records, overrides) {
                    let replacement = format!("{}=\"{}\"", attribute, escape_attribute(&local));
                    for written in source_forms(attribute, value) {
                        rewritten = rewritten.replace(&written, &replacement);
                    }
                }
            }
        }

        Ok(rewritten)
    }

    fn local_link(
        &self,
        link: &str,
        page_path: &str,
        records: &SiteUrls,
        overrides: Option<&OverrideMap>,
    ) -> Option<String> {
        let absolute = self.page_url.join(link).ok()?;
        if !matches!(absolute.scheme(), "http" | "https") {
            return None;
        }
        let fragment = absolute
            .fragment()
            .map(|f| format!("#{}", f))
            .unwrap_or_default();

        let target = normalize(absolute.as_str()).ok()?;
        let record = records.get(&target);
        let overridden = overrides.map_or(false, |map| map.contains_key(&target));
        if record.is_none() && !overridden {
            return None;
        }

        let content_type = record.and_then(|r| r.content_type.as_deref());
        let target_path = map_to_path(&target, content_type, overrides, true).ok()??;

        // the query is part of the file name on disk
        let target_path = target_path.replace('?', "%3F");
        match to_relative(page_path, &target_path) {
            Ok(relative) => Some(format!("{}{}", relative, fragment)),
            Err(e) => {
                debug!(link, error = %e, "link left as-is");
                None
            }
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

// `select` hands back attribute values with entities decoded, so the text to
// replace may be written with `&amp;` and with either quote style.
fn source_forms(attribute: &str, value: &str) -> Vec<String> {
    let mut values = vec![value.to_string()];
    let escaped = value.replace('&', "&amp;");
    if escaped != value {
        values.push(escaped);
    }

    let mut forms = Vec::with_capacity(values.len() * 2);
    for written in &values {
        forms.push(format!("{}=\"{}\"", attribute, written));
        forms.push(format!("{}='{}'", attribute, written));
    }
    forms
}
