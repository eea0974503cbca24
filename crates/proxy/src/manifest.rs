//! Precache manifest.

use lownet_client::ProxyRequest;
use lownet_client::fetch::resolve;
use lownet_core::Error;
use url::Url;

/// Paths stored into a fresh bucket at install time.
pub const PRECACHE: &[&str] = &["/toolkit.html", "/"];

/// Fixed ordered list of paths to precache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecacheManifest {
    paths: Vec<String>,
}

impl PrecacheManifest {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// GET requests for every path, resolved against the origin.
    pub fn requests(&self, origin: &Url) -> Result<Vec<ProxyRequest>, Error> {
        self.paths
            .iter()
            .map(|p| {
                resolve(origin, p)
                    .map(ProxyRequest::get)
                    .map_err(|e| Error::InvalidUrl(format!("{p}: {e}")))
            })
            .collect()
    }
}

impl Default for PrecacheManifest {
    fn default() -> Self {
        Self::new(PRECACHE.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = PrecacheManifest::default();
        assert_eq!(manifest.paths(), &["/toolkit.html".to_string(), "/".to_string()]);
        assert_eq!(manifest.len(), 2);
    }

    #[test]
    fn test_requests_resolve_against_origin() {
        let origin = Url::parse("https://lownet.test").unwrap();
        let requests = PrecacheManifest::default().requests(&origin).unwrap();
        let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://lownet.test/toolkit.html", "https://lownet.test/"]);
        assert!(requests.iter().all(|r| r.method == reqwest::Method::GET));
    }

    #[test]
    fn test_requests_reject_bad_entry() {
        let origin = Url::parse("https://lownet.test").unwrap();
        let manifest = PrecacheManifest::new(["/", "ftp://files.example.com/a"]);
        assert!(matches!(manifest.requests(&origin), Err(Error::InvalidUrl(_))));
    }
}
