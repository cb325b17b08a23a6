use std::collections::HashMap;

use crate::error::Result;
use crate::matcher::{compile_regex_list, matches_at_start};
use crate::state::UrlRecord;

/// Records of exactly `content_type` whose URL matches any of `patterns`
/// from the first character.
pub fn filter_by_type<S: AsRef<str>>(
    records: &HashMap<String, UrlRecord>,
    content_type: Option<&str>,
    patterns: &[S],
) -> Result<HashMap<String, UrlRecord>> {
    let regexes = compile_regex_list(patterns)?;

    Ok(records
        .iter()
        .filter(|(_, record)| record.content_type.as_deref() == content_type)
        .filter(|(url, _)| regexes.iter().any(|regex| matches_at_start(regex, url)))
        .map(|(url, record)| (url.clone(), record.clone()))
        .collect())
}
