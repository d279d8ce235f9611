//! CASE package loading.
//!
//! Packages come from a CASE server (`CFPackages/<id>` endpoints) over HTTP or
//! from a JSON file exported earlier. Either way the result is a
//! [`CasePackage`] ready for the conversion pipeline.

mod parser;

use std::path::Path;
use std::time::Duration;

use casegraph_shared::{CaseGraphError, CasePackage, Result};
use reqwest::Client;
use tracing::{debug, info, instrument};
use url::Url;

pub use parser::{flatten, package_from_value, parse_package};

/// Default timeout in seconds for fetching a package.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for fetch requests.
const USER_AGENT: &str = concat!("casegraph/", env!("CARGO_PKG_VERSION"));

/// Configuration for fetching packages.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Where a package is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    Url(Url),
    File(std::path::PathBuf),
}

impl PackageSource {
    /// Anything that looks like a URL is fetched; everything else is a path.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.contains("://") {
            let url = Url::parse(raw)
                .map_err(|e| CaseGraphError::validation(format!("invalid package URL '{raw}': {e}")))?;
            Ok(Self::Url(url))
        } else {
            Ok(Self::File(raw.into()))
        }
    }
}

impl std::fmt::Display for PackageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Load a package from either source.
pub async fn load(source: &PackageSource, opts: &LoadOptions) -> Result<CasePackage> {
    match source {
        PackageSource::Url(url) => fetch_package(url, opts).await,
        PackageSource::File(path) => load_from_path(path),
    }
}

/// Fetch and parse a package over HTTP(S).
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_package(url: &Url, opts: &LoadOptions) -> Result<CasePackage> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CaseGraphError::validation(format!(
            "package URL must use http or https: {url}"
        )));
    }

    info!("fetching CASE package");
    let client = build_client(opts)?;
    let response = client
        .get(url.as_str())
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| CaseGraphError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CaseGraphError::Network(format!("{url}: HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| CaseGraphError::Network(format!("{url}: failed to read body: {e}")))?;
    debug!(bytes = body.len(), "package downloaded");

    let package = parse_package(&body)?;
    info!(
        items = package.items.len(),
        associations = package.associations.len(),
        "CASE package loaded"
    );
    Ok(package)
}

/// Read and parse a package from a local JSON file.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_from_path(path: &Path) -> Result<CasePackage> {
    let body = std::fs::read_to_string(path).map_err(|e| CaseGraphError::io(path, e))?;
    let package = parse_package(&body)?;
    info!(
        items = package.items.len(),
        associations = package.associations.len(),
        "CASE package loaded"
    );
    Ok(package)
}

/// Build a reqwest client with appropriate settings.
fn build_client(opts: &LoadOptions) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(opts.timeout_secs))
        .build()
        .map_err(|e| CaseGraphError::Network(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use casegraph_shared::ItemKind;

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../../fixtures/json/case_package.fixture.json"
    );

    fn fixture() -> String {
        std::fs::read_to_string(FIXTURE).expect("read CASE fixture")
    }

    #[test]
    fn source_parsing() {
        assert!(matches!(
            PackageSource::parse("https://case.example.org/ims/case/v1p0/CFPackages/abc").unwrap(),
            PackageSource::Url(_)
        ));
        assert_eq!(
            PackageSource::parse(" exports/pkg.json ").unwrap(),
            PackageSource::File("exports/pkg.json".into())
        );
        assert!(PackageSource::parse("http://[bad").is_err());
    }

    #[test]
    fn fixture_loads_from_disk() {
        let pkg = load_from_path(Path::new(FIXTURE)).unwrap();
        assert_eq!(pkg.document.language.as_deref(), Some("en"));
        assert_eq!(pkg.items.iter().filter(|i| i.kind == ItemKind::Course).count(), 2);
        assert_eq!(pkg.items.iter().filter(|i| i.kind == ItemKind::Pathway).count(), 1);
        assert!(!pkg.associations.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let path = std::env::temp_dir().join(format!("casegraph-missing-{}.json", uuid::Uuid::now_v7()));
        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, CaseGraphError::Io { .. }));
    }

    #[tokio::test]
    async fn fetch_with_mock_server() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/ims/case/v1p0/CFPackages/doc-1"))
            .and(wiremock::matchers::header_exists("user-agent"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(fixture()))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/ims/case/v1p0/CFPackages/doc-1", server.uri())).unwrap();
        let pkg = fetch_package(&url, &LoadOptions::default()).await.unwrap();

        assert_eq!(pkg.document.title.as_deref(), Some("Health Science Course Catalog"));
        assert_eq!(pkg, load_from_path(Path::new(FIXTURE)).unwrap());
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = Url::parse(&format!("{}/CFPackages/missing", server.uri())).unwrap();
        let err = fetch_package(&url, &LoadOptions::default()).await.unwrap_err();
        assert!(matches!(err, CaseGraphError::Network(ref msg) if msg.contains("404")));
    }

    #[tokio::test]
    async fn invalid_body_is_a_parse_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let url = Url::parse(&server.uri()).unwrap();
        let err = fetch_package(&url, &LoadOptions::default()).await.unwrap_err();
        assert!(matches!(err, CaseGraphError::Parse { .. }));
    }

    #[tokio::test]
    async fn non_http_scheme_is_rejected() {
        let url = Url::parse("ftp://case.example.org/pkg.json").unwrap();
        let err = fetch_package(&url, &LoadOptions::default()).await.unwrap_err();
        assert!(matches!(err, CaseGraphError::Validation { .. }));
    }
}
