/// Where leaderboard data comes from.
///
/// `HttpSource` does an HTTP/1 GET with the hyper-util client over a
/// rustls connector, so both `http://` and `https://` URLs work.
/// `FileSource` reads a local JSON file, which is what debug builds and
/// offline setups use. Both return a JSON array of `{name, score}`.

use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::header::ACCEPT;
use hyper::{Request, Uri};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::debug;

use super::{LeaderboardEntry, LeaderboardError};

#[async_trait(?Send)]
pub trait LeaderboardSource {
    async fn fetch(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError>;
}

fn parse(body: &[u8]) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
    Ok(serde_json::from_slice(body)?)
}

/// Pick a source for `location`: a URL goes over HTTP, anything else is a
/// file path.
pub fn source_from_location(
    location: &str,
    timeout: Duration,
) -> Result<Rc<dyn LeaderboardSource>, LeaderboardError> {
    if location.contains("://") {
        Ok(Rc::new(HttpSource::new(location, timeout)?))
    } else {
        Ok(Rc::new(FileSource::new(location)))
    }
}

// ── HTTP ──

pub struct HttpSource {
    uri: Uri,
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    timeout: Duration,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, LeaderboardError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| LeaderboardError::InvalidUrl(format!("{url}: {e}")))?;
        match uri.scheme_str() {
            Some("http" | "https") => {}
            Some(other) => return Err(LeaderboardError::UnsupportedScheme(other.to_string())),
            None => return Err(LeaderboardError::InvalidUrl(url.to_string())),
        }
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(provider)
            .map_err(|e| LeaderboardError::Tls(e.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Ok(HttpSource { uri, client, timeout })
    }
}

#[async_trait(?Send)]
impl LeaderboardSource for HttpSource {
    async fn fetch(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        debug!(uri = %self.uri, "fetching leaderboard");
        let req = Request::get(self.uri.clone())
            .header(ACCEPT, "application/json")
            .body(Empty::<Bytes>::new())
            .map_err(|e| LeaderboardError::Request(e.to_string()))?;

        let response = tokio::time::timeout(self.timeout, self.client.request(req))
            .await
            .map_err(|_| LeaderboardError::Timeout)?
            .map_err(|e| LeaderboardError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeaderboardError::Status(status.as_u16()));
        }

        let body = tokio::time::timeout(self.timeout, response.into_body().collect())
            .await
            .map_err(|_| LeaderboardError::Timeout)?
            .map_err(|e| LeaderboardError::Transport(e.to_string()))?
            .to_bytes();
        parse(&body)
    }
}

// ── File ──

pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }
}

#[async_trait(?Send)]
impl LeaderboardSource for FileSource {
    async fn fetch(&self) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
        debug!(path = %self.path.display(), "reading leaderboard");
        let body = tokio::fs::read(&self.path)
            .await
            .map_err(|source| LeaderboardError::Io { path: self.path.clone(), source })?;
        parse(&body)
    }
}
