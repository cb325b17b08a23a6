use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "basic-spider",
    about = "Map URLs onto a local mirror and fetch crawled URLs into it",
    version,
    long_about = "Normalizes URLs, maps them to filesystem paths that mirror the site structure, computes relative links between mirrored pages and downloads crawled URLs selected by content type and URL rules."
)]
pub struct SpiderCommand {
    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug)]
pub enum Action {
    /// Print the canonical form of a URL
    Normalize { url: String },

    /// Print the mirror path of a URL
    Map {
        url: String,

        /// Content type of the URL, e.g. text/html
        #[arg(short = 't', long)]
        content_type: Option<String>,

        /// Leave the host out of the path
        #[arg(long)]
        no_host: bool,

        /// JSON file of URL -> path overrides
        #[arg(long)]
        overrides: Option<PathBuf>,
    },

    /// Print the relative link from one page to another
    Relative { base: String, target: String },

    /// List crawled URLs of one content type matching any pattern
    Filter {
        /// Crawl state JSON (URL -> record)
        #[arg(short, long)]
        state: PathBuf,

        #[arg(short = 't', long)]
        content_type: String,

        /// Regex matched from the start of the URL; repeatable
        #[arg(short, long = "pattern", required = true)]
        patterns: Vec<String>,
    },

    /// Download crawled URLs of one content type into the mirror
    Fetch(FetchArgs),

    /// Fingerprint a site's "not found" page and list crawled URLs that match it
    NotFound {
        site_url: String,

        #[arg(short, long)]
        state: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Crawl state JSON (URL -> record)
    #[arg(short, long)]
    pub state: PathBuf,

    #[arg(short = 't', long)]
    pub content_type: String,

    /// Regex matched from the start of the URL; repeatable
    #[arg(short, long = "pattern", default_value = "https?://")]
    pub patterns: Vec<String>,

    /// JSON rules file with include / exclude / ignore lists
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Only fetch URLs on this domain; repeatable
    #[arg(long = "domain")]
    pub domains: Vec<String>,

    /// Output directory for the mirror
    #[arg(short, long, default_value = "./mirrored_site")]
    pub output_dir: PathBuf,

    /// JSON file of URL -> path overrides
    #[arg(long)]
    pub overrides: Option<PathBuf>,

    /// Download again even when the file exists
    #[arg(long)]
    pub refresh: bool,

    /// Maximum concurrent downloads
    #[arg(short = 'c', long, default_value = "10", value_parser = clap::value_parser!(u16).range(1..))]
    pub max_concurrent: u16,

    /// Timeout for requests in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// User agent string to use for requests
    #[arg(long, default_value = concat!("basic-spider/", env!("CARGO_PKG_VERSION")))]
    pub user_agent: String,

    /// Do not follow redirects
    #[arg(long)]
    pub no_redirects: bool,
}
