use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::*;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use basic_spider::cli::{Action, FetchArgs, SpiderCommand};
use basic_spider::downloader::{find_page_not_found, Downloader, FetchOptions};
use basic_spider::filter::filter_by_type;
use basic_spider::human::human_readable;
use basic_spider::matcher::{source_domain_to_regex, MatchRule, RuleConfig, RuleSets};
use basic_spider::normalize::normalize;
use basic_spider::path_mapper::map_to_path;
use basic_spider::relative::to_relative;
use basic_spider::state::{read_json_file, OverrideMap, SiteUrls};

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_overrides(path: Option<&Path>) -> Result<Option<OverrideMap>> {
    path.map(|p| {
        read_json_file(p).with_context(|| format!("Failed to read overrides: {:?}", p))
    })
    .transpose()
}

fn load_state(path: &Path) -> Result<SiteUrls> {
    read_json_file(path).with_context(|| format!("Failed to read crawl state: {:?}", path))
}

fn load_rules(args: &FetchArgs) -> Result<RuleSets> {
    let mut rules = match &args.rules {
        Some(path) => {
            let config: RuleConfig = read_json_file(path)
                .with_context(|| format!("Failed to read rules: {:?}", path))?;
            config.compile()?
        }
        None => RuleSets::default(),
    };

    rules.include.extend(source_domain_to_regex(args.domains.as_slice())?);
    if rules.include.is_empty() {
        // no include list means every URL is a candidate
        rules.include.push(MatchRule::literal(""));
    }
    Ok(rules)
}

async fn fetch(args: FetchArgs) -> Result<()> {
    let records = load_state(&args.state)?;
    let overrides = load_overrides(args.overrides.as_deref())?;
    let rules = load_rules(&args)?;

    let selected = filter_by_type(
        &records,
        Some(args.content_type.as_str()),
        args.patterns.as_slice(),
    )?;
    let mut urls: Vec<String> = selected
        .keys()
        .filter(|url| rules.admits(url))
        .cloned()
        .collect();
    urls.sort();

    println!(
        "🚀 Fetching {} of {} crawled URLs as {}",
        urls.len().to_string().bold(),
        records.len(),
        args.content_type.blue()
    );
    println!("📁 Output directory: {:?}", args.output_dir);

    let options = FetchOptions {
        output_dir: args.output_dir.clone(),
        max_concurrent: usize::from(args.max_concurrent),
        user_agent: args.user_agent.clone(),
        timeout: Duration::from_secs(args.timeout),
        follow_redirects: !args.no_redirects,
        show_progress: true,
    };
    let downloader = Downloader::new(&options)?;
    let report = downloader
        .download_urls(urls.as_slice(), &args.content_type, overrides.as_ref(), args.refresh)
        .await?;

    let bytes: u64 = report
        .downloaded
        .iter()
        .filter_map(|(_, path)| std::fs::metadata(path).ok())
        .map(|meta| meta.len())
        .sum();

    for (url, error) in &report.failed {
        eprintln!("{} {}: {}", "❌".red(), url, error);
    }
    println!(
        "✅ Downloaded {} files ({}B), skipped {}, failed {}",
        report.downloaded.len().to_string().green(),
        human_readable(bytes as f64),
        report.skipped.len(),
        report.failed.len().to_string().red()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args = SpiderCommand::parse();

    match args.action {
        Action::Normalize { url } => println!("{}", normalize(&url)?),
        Action::Map {
            url,
            content_type,
            no_host,
            overrides,
        } => {
            let overrides = load_overrides(overrides.as_deref())?;
            match map_to_path(&url, content_type.as_deref(), overrides.as_ref(), !no_host)? {
                Some(path) => println!("{}", path),
                None => bail!("{} has no extension; pass --content-type to map it", url),
            }
        }
        Action::Relative { base, target } => println!("{}", to_relative(&base, &target)?),
        Action::Filter {
            state,
            content_type,
            patterns,
        } => {
            let records = load_state(&state)?;
            let selected =
                filter_by_type(&records, Some(content_type.as_str()), patterns.as_slice())?;
            let mut urls: Vec<String> = selected.into_keys().collect();
            urls.sort();
            for url in urls {
                println!("{}", url);
            }
        }
        Action::Fetch(fetch_args) => fetch(fetch_args).await?,
        Action::NotFound { site_url, state } => {
            let records = load_state(&state)?;
            let downloader = Downloader::new(&FetchOptions {
                output_dir: std::env::temp_dir(),
                ..FetchOptions::default()
            })?;
            let fingerprint = downloader.probe_page_not_found(&site_url).await?;
            let length = fingerprint
                .content_length
                .map(|len| human_readable(len as f64))
                .unwrap_or_else(|| "unknown".to_string());
            println!("🔍 Not-found page size: {}B", length.yellow());
            for url in find_page_not_found(&records, &fingerprint) {
                println!("{}", url);
            }
        }
    }

    Ok(())
}
