use url::Url;

use crate::error::Result;

/// Canonical form of `url`: fragment dropped and doubled slashes in the
/// path collapsed. Scheme, host and query are left alone.
pub fn normalize(url: &str) -> Result<String> {
    Ok(normalize_url(url)?.into())
}

pub fn normalize_url(url: &str) -> Result<Url> {
    let mut parsed = Url::parse(url)?;
    parsed.set_fragment(None);

    if parsed.path().contains("//") {
        let path = collapse_double_slashes(parsed.path());
        parsed.set_path(&path);
    }

    Ok(parsed)
}

// Repeated until stable so that `///` does not survive as `//`.
fn collapse_double_slashes(path: &str) -> String {
    let mut collapsed = path.to_string();
    while collapsed.contains("//") {
        collapsed = collapsed.replace("//", "/");
    }
    collapsed
}
