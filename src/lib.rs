pub mod cli;
pub mod downloader;
pub mod error;
pub mod file_manager;
pub mod filter;
pub mod html_parser;
pub mod human;
pub mod matcher;
pub mod normalize;
pub mod path_mapper;
pub mod relative;
pub mod state;

// Re-export main types for convenience
pub use downloader::{DownloadReport, Downloader, FetchOptions, PageNotFound, SkipReason};
pub use error::{Result, SpiderError};
pub use file_manager::FileManager;
pub use filter::filter_by_type;
pub use html_parser::HtmlParser;
pub use matcher::{matches, should_ignore, should_include, MatchRule};
pub use normalize::normalize;
pub use path_mapper::map_to_path;
pub use relative::to_relative;
pub use state::{OverrideMap, SiteUrls, UrlRecord};
