//! Include / exclude / ignore decisions for URLs.
//!
//! A rule list is scanned in order and the first matching rule decides.
//! Literal rules match as prefixes for include and exclude lists and by
//! equality for ignore lists. Regex rules must match at the start of the URL
//! but may stop anywhere.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use url::{Position, Url};

use crate::error::{Result, SpiderError};

pub type UrlPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum MatchRule {
    LiteralPrefix(String),
    Regex(Regex),
    Predicate(UrlPredicate),
}

impl MatchRule {
    pub fn literal(text: impl Into<String>) -> Self {
        MatchRule::LiteralPrefix(text.into())
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        Ok(MatchRule::Regex(Regex::new(pattern)?))
    }

    pub fn predicate<F>(predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        MatchRule::Predicate(Arc::new(predicate))
    }

    /// With `exact`, literal rules compare for equality instead of prefix.
    pub fn matches(&self, url: &str, exact: bool) -> bool {
        match self {
            MatchRule::LiteralPrefix(text) if exact => url == text.as_str(),
            MatchRule::LiteralPrefix(text) => url.starts_with(text.as_str()),
            MatchRule::Regex(regex) => matches_at_start(regex, url),
            MatchRule::Predicate(predicate) => predicate(url),
        }
    }
}

impl fmt::Debug for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::LiteralPrefix(text) => f.debug_tuple("LiteralPrefix").field(text).finish(),
            MatchRule::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            MatchRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Leftmost-first search: a match at 0 exists iff the first match starts there.
pub(crate) fn matches_at_start(regex: &Regex, text: &str) -> bool {
    regex.find(text).map_or(false, |m| m.start() == 0)
}

pub fn matches(url: &str, rules: &[MatchRule], exact: bool) -> bool {
    rules.iter().any(|rule| rule.matches(url, exact))
}

/// Included by some rule and excluded by none. Exclusion always wins.
pub fn should_include(url: &str, include: &[MatchRule], exclude: &[MatchRule]) -> bool {
    matches(url, include, false) && !matches(url, exclude, false)
}

/// Ignore lists hold exact URLs: a literal rule only ignores itself.
pub fn should_ignore(url: &str, ignore: &[MatchRule]) -> bool {
    matches(url, ignore, true)
}

pub fn compile_regex_list<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern.as_ref()).map_err(SpiderError::from))
        .collect()
}

/// One start-anchored rule per source domain.
///
/// `https://docs.x.com` pins the scheme; a bare `docs.x.com` accepts both
/// http and https.
pub fn source_domain_to_regex<S: AsRef<str>>(domains: &[S]) -> Result<Vec<MatchRule>> {
    let mut rules = Vec::with_capacity(domains.len());
    for domain in domains {
        let domain = domain.as_ref();
        let pattern = if domain.contains("://") {
            let parsed = Url::parse(domain)?;
            let netloc = &parsed[Position::BeforeHost..Position::AfterPort];
            let host = if netloc.is_empty() { domain } else { netloc };
            format!("^{}://{}", regex::escape(parsed.scheme()), regex::escape(host))
        } else {
            format!("^https?://{}", regex::escape(domain))
        };
        rules.push(MatchRule::regex(&pattern)?);
    }
    Ok(rules)
}

/// A rule as written in a rules file: `{"kind": "prefix", "pattern": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub kind: String,
    pub pattern: String,
}

impl TryFrom<&RuleSpec> for MatchRule {
    type Error = SpiderError;

    fn try_from(spec: &RuleSpec) -> Result<Self> {
        match spec.kind.as_str() {
            "prefix" | "literal" => Ok(MatchRule::literal(spec.pattern.clone())),
            "regex" => MatchRule::regex(&spec.pattern),
            other => Err(SpiderError::Configuration(format!(
                "unrecognized rule kind {:?} for {:?}, expected \"prefix\" or \"regex\"",
                other, spec.pattern
            ))),
        }
    }
}

/// Contents of a rules file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    #[serde(default)]
    pub include: Vec<RuleSpec>,
    #[serde(default)]
    pub exclude: Vec<RuleSpec>,
    #[serde(default)]
    pub ignore: Vec<RuleSpec>,
}

impl RuleConfig {
    pub fn compile(&self) -> Result<RuleSets> {
        fn build(specs: &[RuleSpec]) -> Result<Vec<MatchRule>> {
            specs.iter().map(MatchRule::try_from).collect()
        }

        Ok(RuleSets {
            include: build(&self.include)?,
            exclude: build(&self.exclude)?,
            ignore: build(&self.ignore)?,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RuleSets {
    pub include: Vec<MatchRule>,
    pub exclude: Vec<MatchRule>,
    pub ignore: Vec<MatchRule>,
}

impl RuleSets {
    /// Not ignored, included, and not excluded.
    pub fn admits(&self, url: &str) -> bool {
        !should_ignore(url, &self.ignore) && should_include(url, &self.include, &self.exclude)
    }
}
