use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{redirect, Client, ClientBuilder};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::file_manager::FileManager;
use crate::path_mapper::map_to_path;
use crate::state::{OverrideMap, UrlRecord};

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output_dir: PathBuf,
    pub max_concurrent: usize,
    pub user_agent: String,
    pub timeout: Duration,
    pub follow_redirects: bool,
    pub show_progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./mirrored_site"),
            max_concurrent: 10,
            user_agent: format!("basic-spider/{}", env!("CARGO_PKG_VERSION")),
            timeout: Duration::from_secs(30),
            follow_redirects: true,
            show_progress: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No extension in the URL and no usable content type
    Unmappable,
    /// The target file exists and refresh was not requested
    AlreadyMirrored,
    /// Another URL in the batch already claimed the same path
    DuplicatePath { claimed_by: String },
}

#[derive(Debug, Default)]
pub struct DownloadReport {
    pub downloaded: Vec<(String, PathBuf)>,
    pub skipped: Vec<(String, SkipReason)>,
    pub failed: Vec<(String, String)>,
}

/// Body and size of the page a site serves for a URL that cannot exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNotFound {
    pub html: String,
    pub content_length: Option<u64>,
}

/// `type/subtype` of a Content-Type header, parameters dropped.
pub fn content_type_essence(header: &str) -> Option<String> {
    header
        .parse::<mime::Mime>()
        .ok()
        .map(|m| m.essence_str().to_string())
}

fn is_text(content_type: &str) -> bool {
    content_type.starts_with("text/") || content_type == "application/javascript"
}

pub struct Downloader {
    client: Client,
    file_manager: FileManager,
    max_concurrent: usize,
    show_progress: bool,
}

impl Downloader {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        let client = Self::build_http_client(options)?;
        let file_manager = FileManager::new(&options.output_dir)?;

        Ok(Self {
            client,
            file_manager,
            max_concurrent: options.max_concurrent.max(1),
            show_progress: options.show_progress,
        })
    }

    fn build_http_client(options: &FetchOptions) -> Result<Client> {
        let redirects = if options.follow_redirects {
            redirect::Policy::limited(10)
        } else {
            redirect::Policy::none()
        };

        let client = ClientBuilder::new()
            .use_rustls_tls()
            .user_agent(options.user_agent.as_str())
            .timeout(options.timeout)
            .redirect(redirects)
            .build()?;

        Ok(client)
    }

    pub fn file_manager(&self) -> &FileManager {
        &self.file_manager
    }

    /// Mirrors every URL of a single content type.
    ///
    /// Each URL is mapped to its mirror path first. Unmappable URLs, files
    /// already on disk (unless `refresh`) and URLs whose path another URL of
    /// the batch already claimed are skipped, so no two requests ever write
    /// the same file. A failed request is reported and does not stop the
    /// batch.
    pub async fn download_urls<S: AsRef<str>>(
        &self,
        urls: &[S],
        content_type: &str,
        overrides: Option<&OverrideMap>,
        refresh: bool,
    ) -> Result<DownloadReport> {
        let mut report = DownloadReport::default();
        let mut claimed: HashMap<String, String> = HashMap::new();
        let mut planned = Vec::new();

        for url in urls {
            let url = url.as_ref();
            let path = match map_to_path(url, Some(content_type), overrides, true) {
                Ok(Some(path)) => path,
                Ok(None) => {
                    report.skipped.push((url.to_string(), SkipReason::Unmappable));
                    continue;
                }
                Err(e) => {
                    warn!(url, error = %e, "cannot map URL");
                    report.failed.push((url.to_string(), e.to_string()));
                    continue;
                }
            };

            if let Some(owner) = claimed.get(&path) {
                debug!(url, path = %path, claimed_by = %owner, "path already claimed");
                report.skipped.push((
                    url.to_string(),
                    SkipReason::DuplicatePath {
                        claimed_by: owner.clone(),
                    },
                ));
                continue;
            }
            if !refresh && self.file_manager.exists(&path) {
                report
                    .skipped
                    .push((url.to_string(), SkipReason::AlreadyMirrored));
                continue;
            }

            claimed.insert(path.clone(), url.to_string());
            planned.push((url.to_string(), path));
        }

        info!(
            planned = planned.len(),
            skipped = report.skipped.len(),
            content_type,
            "starting downloads"
        );

        let progress = self.progress_bar(planned.len() as u64);
        let as_text = is_text(content_type);

        let results: Vec<_> = stream::iter(planned)
            .map(|(url, path)| {
                let progress = progress.clone();
                async move {
                    progress.set_message(url.clone());
                    let result = self.fetch_one(&url, &path, as_text).await;
                    progress.inc(1);
                    (url, result)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;

        progress.finish_and_clear();

        for (url, result) in results {
            match result {
                Ok(saved) => report.downloaded.push((url, saved)),
                Err(e) => {
                    warn!(url = %url, error = %e, "download failed");
                    report.failed.push((url, e.to_string()));
                }
            }
        }

        info!(
            downloaded = report.downloaded.len(),
            failed = report.failed.len(),
            "downloads finished"
        );
        Ok(report)
    }

    /// Streams the body into a partial file that only replaces the mirror
    /// path once complete. A failed transfer leaves nothing behind.
    async fn fetch_one(&self, url: &str, mirror_path: &str, as_text: bool) -> Result<PathBuf> {
        debug!(url, path = mirror_path, "downloading");
        let response = self.client.get(url).send().await?.error_for_status()?;

        let (mut file, _) = self.file_manager.create_partial(mirror_path).await?;
        let written = Self::write_body(response, &mut file, as_text).await;
        drop(file);

        match written {
            Ok(()) => self.file_manager.persist(mirror_path).await,
            Err(e) => {
                self.file_manager.discard_partial(mirror_path).await;
                Err(e)
            }
        }
    }

    async fn write_body(
        response: reqwest::Response,
        file: &mut tokio::fs::File,
        as_text: bool,
    ) -> Result<()> {
        if as_text {
            // bodies are decoded as UTF-8 whatever the server declares
            let bytes = response.bytes().await?;
            let text = String::from_utf8_lossy(&bytes);
            file.write_all(text.as_bytes()).await?;
        } else {
            let mut body = response.bytes_stream();
            while let Some(chunk) = body.next().await {
                file.write_all(&chunk?).await?;
            }
        }
        file.flush().await?;
        Ok(())
    }

    /// Requests a random path below `site_url` to fingerprint the site's
    /// "not found" page.
    pub async fn probe_page_not_found(&self, site_url: &str) -> Result<PageNotFound> {
        let mut probe = site_url.to_string();
        if !probe.ends_with('/') {
            probe.push('/');
        }
        probe.push_str(&Uuid::new_v4().to_string());

        debug!(url = %probe, "probing not-found page");
        let response = self.client.get(&probe).send().await?;
        let content_length = response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let html = response.text().await?;

        Ok(PageNotFound {
            html,
            content_length,
        })
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let progress = ProgressBar::new(len);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner} [{bar:40}] {pos}/{len} {wide_msg}")
        {
            progress.set_style(style.progress_chars("=> "));
        }
        progress
    }
}

/// URLs whose recorded size equals the not-found page's, sorted.
///
/// Sizes within 1000 bytes are logged as likely soft 404s but not returned.
pub fn find_page_not_found(
    records: &HashMap<String, UrlRecord>,
    fingerprint: &PageNotFound,
) -> Vec<String> {
    let Some(expected) = fingerprint.content_length else {
        return Vec::new();
    };

    let mut found: Vec<String> = records
        .iter()
        .filter_map(|(url, record)| {
            let size = record.content_length?;
            if size == expected {
                return Some(url.clone());
            }
            if size.abs_diff(expected) <= 1000 {
                debug!(url = %url, size, expected, "size close to not-found page");
            }
            None
        })
        .collect();
    found.sort();
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_essence() {
        assert_eq!(
            content_type_essence("text/html; charset=UTF-8").as_deref(),
            Some("text/html")
        );
        assert_eq!(
            content_type_essence("image/svg+xml").as_deref(),
            Some("image/svg+xml")
        );
        assert_eq!(content_type_essence("broken"), None);
    }

    #[test]
    fn test_text_types() {
        assert!(is_text("text/html"));
        assert!(is_text("text/css"));
        assert!(is_text("application/javascript"));
        assert!(!is_text("image/png"));
        assert!(!is_text("application/pdf"));
    }

    #[test]
    fn test_find_page_not_found() {
        let mut records = HashMap::new();
        records.insert(
            "https://x.com/gone".to_string(),
            UrlRecord::new(Some("text/html"), Some(8690)),
        );
        records.insert(
            "https://x.com/also-gone".to_string(),
            UrlRecord::new(Some("text/html"), Some(8690)),
        );
        records.insert(
            "https://x.com/real".to_string(),
            UrlRecord::new(Some("text/html"), Some(8200)),
        );
        records.insert("https://x.com/unknown".to_string(), UrlRecord::default());

        let fingerprint = PageNotFound {
            html: String::new(),
            content_length: Some(8690),
        };
        assert_eq!(
            find_page_not_found(&records, &fingerprint),
            vec!["https://x.com/also-gone", "https://x.com/gone"]
        );

        let no_length = PageNotFound {
            html: String::new(),
            content_length: None,
        };
        assert!(find_page_not_found(&records, &no_length).is_empty());
    }
}
