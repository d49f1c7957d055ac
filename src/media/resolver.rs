use url::Url;

use crate::error::Result;

/// Reduce a media source reference to `scheme://host[:port]/path`.
///
/// CDN links carry expiring signatures in the query string, so the same file
/// shows up under a different raw URL on every run. The canonical form is
/// only used as a dedup key; the raw reference is what gets fetched.
pub fn canonicalize(raw: &str) -> Result<String> {
    let url = Url::parse(raw.trim())?;

    let mut canonical = format!("{}://", url.scheme());
    if let Some(host) = url.host_str() {
        canonical.push_str(host);
    }
    if let Some(port) = url.port() {
        canonical.push_str(&format!(":{}", port));
    }
    canonical.push_str(url.path());

    Ok(canonical)
}
