//! HTTP access to source APIs

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Credential;
use crate::errors::SourceError;

/// Resolves `path` relative to `base`, treating `base` as a directory even
/// without a trailing slash.
pub fn endpoint(base: &Url, path: &str) -> Result<Url, SourceError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let dir = format!("{}/", base.path());
        base.set_path(&dir);
    }

    base.join(path.trim_start_matches('/'))
        .map_err(|source| SourceError::InvalidUrl {
            value: path.to_owned(),
            source,
        })
}

/// An authenticated JSON client for one upstream API.
#[derive(Clone, Debug)]
pub struct SourceClient {
    http: Client,
    credential: Credential,
    headers: HeaderMap,
}

impl SourceClient {
    pub fn new(credential: Credential) -> Self {
        Self::with_client(Client::new(), credential)
    }

    fn with_client(http: Client, credential: Credential) -> Self {
        let mut headers = HeaderMap::new();
        drop(headers.insert(ACCEPT, HeaderValue::from_static("application/json")));

        Self {
            http,
            credential,
            headers,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        drop(self.headers.insert(name, value));
        self
    }

    /// Fetches `url` as JSON.
    ///
    /// Returns `Ok(None)` when the API answers 400 Bad Request: some listing
    /// endpoints reject filters they do not recognize, and that must not fail
    /// the whole run. Every other non-success status is an error.
    pub async fn get_json(&self, url: &Url) -> Result<Option<Value>, SourceError> {
        debug!(%url, "Fetching page");

        let request = self.http.get(url.clone()).headers(self.headers.clone());
        let response = self
            .credential
            .apply(request)
            .send()
            .await
            .map_err(|source| SourceError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| SourceError::Request {
                url: url.clone(),
                source,
            })?;

        if status == StatusCode::BAD_REQUEST {
            warn!(
                %url,
                body = %String::from_utf8_lossy(&body),
                "Source rejected the request, treating it as an empty page"
            );
            return Ok(None);
        }

        if !status.is_success() {
            return Err(SourceError::Status {
                url: url.clone(),
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| SourceError::Decode {
                url: url.clone(),
                source,
            })
    }
}
