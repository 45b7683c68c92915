//! REST access to the search cluster
//!
//! Only the handful of endpoints the reconciler needs are covered: index
//! existence and creation, the scroll API and `_bulk`.

use core::future::Future;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use searchsync_source::Credential;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::errors::IndexError;

/// Keep-alive of a scroll context between two page requests.
pub const SCROLL_TTL: &str = "1m";

/// A buffered response.
#[derive(Debug)]
pub struct Response {
    pub url: Url,
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl Response {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, IndexError> {
        serde_json::from_slice(&self.body).map_err(|source| IndexError::Decode {
            url: self.url.clone(),
            source,
        })
    }

    fn error_for_status(self) -> Result<Self, IndexError> {
        if self.status.is_success() {
            return Ok(self);
        }

        Err(IndexError::Status {
            status: self.status,
            body: self.text(),
            url: self.url,
        })
    }
}

/// One page of a scroll search.
#[derive(Debug, Deserialize)]
pub struct ScrollPage {
    #[serde(rename = "_scroll_id", default)]
    pub scroll_id: Option<String>,
    #[serde(default)]
    pub hits: Hits,
}

#[derive(Debug, Default, Deserialize)]
pub struct Hits {
    #[serde(default)]
    pub hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
pub struct Hit {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Clone, Debug)]
pub struct ElasticClient {
    http: Client,
    base_url: Url,
    credential: Credential,
}

impl ElasticClient {
    pub fn new(base_url: Url, username: String, password: String) -> Self {
        Self::with_client(Client::new(), base_url, username, password)
    }

    /// A client that skips certificate verification, for clusters serving
    /// self-signed certificates.
    pub fn insecure(base_url: Url, username: String, password: String) -> Result<Self, IndexError> {
        let http = Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(IndexError::Client)?;

        Ok(Self::with_client(http, base_url, username, password))
    }

    pub const fn with_client(http: Client, base_url: Url, username: String, password: String) -> Self {
        Self {
            http,
            base_url,
            credential: Credential::Basic { username, password },
        }
    }

    fn url(&self, path: &str) -> Result<Url, IndexError> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let dir = format!("{}/", base.path());
            base.set_path(&dir);
        }

        base.join(path).map_err(|source| IndexError::InvalidUrl {
            value: path.to_owned(),
            source,
        })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.credential.apply(self.http.request(method, url))
    }

    async fn send(&self, url: Url, builder: RequestBuilder) -> Result<Response, IndexError> {
        let response = builder.send().await.map_err(|source| IndexError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| IndexError::Request {
                url: url.clone(),
                source,
            })?
            .to_vec();

        debug!(%url, %status, "Received response");

        Ok(Response { url, status, body })
    }

    async fn send_json(&self, method: Method, url: Url, body: &Value) -> Result<Response, IndexError> {
        let builder = self.request(method, url.clone()).json(body);
        self.send(url, builder).await
    }

    /// `HEAD <index>`: any success means the index exists.
    pub async fn index_exists(&self, index: &str) -> Result<bool, IndexError> {
        let url = self.url(index)?;
        let response = self.send(url.clone(), self.request(Method::HEAD, url)).await?;

        match response.status {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => response.error_for_status().map(|_| false),
        }
    }

    pub async fn create_index(&self, index: &str, body: &Value) -> Result<(), IndexError> {
        let url = self.url(index)?;
        let _response = self
            .send_json(Method::PUT, url, body)
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// `PUT <index>/_mapping`: adds `body` to the mapping of an existing
    /// index.
    pub async fn put_mapping(&self, index: &str, body: &Value) -> Result<(), IndexError> {
        let url = self.url(&format!("{index}/_mapping"))?;
        let _response = self
            .send_json(Method::PUT, url, body)
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Opens a scroll over every document id in `index`.
    ///
    /// Returns `None` when the index does not exist.
    pub async fn open_scroll(
        &self,
        index: &str,
        page_size: usize,
    ) -> Result<Option<ScrollPage>, IndexError> {
        let mut url = self.url(&format!("{index}/_search"))?;
        let _ignored = url.query_pairs_mut().append_pair("scroll", SCROLL_TTL);

        let body = json!({
            "size": page_size,
            "stored_fields": [],
            "_source": false,
            "sort": ["_doc"],
        });

        let response = self.send_json(Method::POST, url, &body).await?;
        if response.status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        response.error_for_status()?.json().map(Some)
    }

    pub async fn scroll(&self, scroll_id: &str) -> Result<ScrollPage, IndexError> {
        let url = self.url("_search/scroll")?;
        let body = json!({ "scroll": SCROLL_TTL, "scroll_id": scroll_id });

        self.send_json(Method::POST, url, &body)
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexError> {
        let url = self.url("_search/scroll")?;
        let body = json!({ "scroll_id": [scroll_id] });

        let _response = self
            .send_json(Method::DELETE, url, &body)
            .await?
            .error_for_status()?;

        Ok(())
    }

    /// Sends one NDJSON bulk body. The response is returned whatever its
    /// status so the caller decides how to report it.
    pub async fn bulk(&self, body: Vec<u8>) -> Result<Response, IndexError> {
        let url = self.url("_bulk")?;
        let builder = self
            .request(Method::POST, url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        self.send(url, builder).await
    }
}

/// Runs `future` unless `cancel` fires first.
pub(crate) async fn cancellable<T>(
    cancel: &CancellationToken,
    future: impl Future<Output = Result<T, IndexError>>,
) -> Result<T, IndexError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(IndexError::Cancelled),
        result = future => result,
    }
}
