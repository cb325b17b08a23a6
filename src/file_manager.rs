use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::Result;

const PARTIAL_SUFFIX: &str = ".part";

/// Owns the mirror root and turns mapped relative paths into files under it.
#[derive(Clone, Debug)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    pub fn new(base_dir: &Path) -> Result<Self> {
        let base_dir = base_dir.to_path_buf();
        fs::create_dir_all(&base_dir)?;

        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Location of a mirror path on disk. Empty, `.` and `..` segments are
    /// dropped so the result always stays below the root.
    pub fn local_path(&self, mirror_path: &str) -> PathBuf {
        let mut path = self.base_dir.clone();
        for segment in mirror_path
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        {
            path.push(segment);
        }
        path
    }

    pub fn exists(&self, mirror_path: &str) -> bool {
        self.local_path(mirror_path).is_file()
    }

    pub fn write_text(&self, mirror_path: &str, text: &str) -> Result<PathBuf> {
        let path = self.prepare(mirror_path)?;
        fs::write(&path, text)?;
        Ok(path)
    }

    pub fn read_text(&self, mirror_path: &str) -> Result<String> {
        Ok(fs::read_to_string(self.local_path(mirror_path))?)
    }

    /// Creates (or truncates) the file for `mirror_path`, making parent
    /// directories as needed.
    pub async fn create_file(&self, mirror_path: &str) -> Result<(tokio::fs::File, PathBuf)> {
        let path = self.local_path(mirror_path);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::File::create(&path).await?;
        Ok((file, path))
    }

    /// Opens `<mirror_path>.part` for an in-progress download. The mirror
    /// path itself only appears once [`FileManager::persist`] is called.
    pub async fn create_partial(&self, mirror_path: &str) -> Result<(tokio::fs::File, PathBuf)> {
        self.create_file(&format!("{}{}", mirror_path, PARTIAL_SUFFIX))
            .await
    }

    pub async fn persist(&self, mirror_path: &str) -> Result<PathBuf> {
        let path = self.local_path(mirror_path);
        tokio::fs::rename(self.partial_path(mirror_path), &path).await?;
        Ok(path)
    }

    pub async fn discard_partial(&self, mirror_path: &str) {
        let partial = self.partial_path(mirror_path);
        if let Err(e) = tokio::fs::remove_file(&partial).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(path = ?partial, error = %e, "cannot remove partial download");
            }
        }
    }

    fn partial_path(&self, mirror_path: &str) -> PathBuf {
        self.local_path(&format!("{}{}", mirror_path, PARTIAL_SUFFIX))
    }

    fn prepare(&self, mirror_path: &str) -> Result<PathBuf> {
        let path = self.local_path(mirror_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}
