use once_cell::sync::Lazy;
use std::path::{Component, Path, PathBuf};
use url::{Position, Url};

use crate::error::{Result, SpiderError};

// Relative references (mirror paths such as `x.com/a/index.html`) are
// resolved against an empty root so only their path matters.
static ROOT: Lazy<Url> = Lazy::new(|| Url::parse("file:///").expect("valid root URL"));

struct Reference {
    netloc: Option<String>,
    path: String,
}

impl Reference {
    fn parse(input: &str) -> Result<Self> {
        let url = if input.contains("://") {
            Url::parse(input)?
        } else if input.starts_with('/') {
            ROOT.join(input)?
        } else {
            // keeps `host:port/...` mirror paths from reading as a scheme
            ROOT.join(&format!("./{}", input))?
        };

        let netloc = &url[Position::BeforeHost..Position::AfterPort];
        Ok(Self {
            netloc: (!netloc.is_empty()).then(|| netloc.to_string()),
            path: url.path().to_string(),
        })
    }

    fn directory(&self) -> &str {
        self.path
            .rfind('/')
            .map_or("", |slash| &self.path[..slash])
    }
}

/// Relative link from the page at `base` to `target`, POSIX style.
///
/// Either side may be an absolute URL or a path relative to the mirror root.
/// Both carrying a host that differs is a [`SpiderError::CrossOrigin`].
/// Query and fragment do not take part.
pub fn to_relative(base: &str, target: &str) -> Result<String> {
    let base_ref = Reference::parse(base)?;
    let target_ref = Reference::parse(target)?;

    if let (Some(base_host), Some(target_host)) = (&base_ref.netloc, &target_ref.netloc) {
        if base_host != target_host {
            return Err(SpiderError::CrossOrigin {
                base: base.to_string(),
                target: target.to_string(),
            });
        }
    }

    let from = PathBuf::from(format!(".{}", base_ref.directory()));
    let to = PathBuf::from(format!(".{}", target_ref.path));

    let relative = pathdiff::diff_paths(&to, &from).unwrap_or_else(|| climb_to_root(&from, &to));
    Ok(to_posix(&relative))
}

// Used only when pathdiff cannot relate the two paths: leave the base
// directory entirely, then descend into the target.
fn climb_to_root(from: &Path, to: &Path) -> PathBuf {
    let depth = from
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count();
    let mut path: PathBuf = std::iter::repeat("..").take(depth).collect();
    path.extend(to.components().filter(|c| matches!(c, Component::Normal(_))));
    path
}

fn to_posix(path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if segments.is_empty() {
        ".".to_string()
    } else {
        segments.join("/")
    }
}
