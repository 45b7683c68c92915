//! Registration of synced indices with an enterprise search meta engine
//!
//! Every index gets its own engine, `engine-<index>`, which is attached as a
//! source to a shared meta engine. Registration is best effort: failures are
//! logged and reported as `false`.
//!
//! Documents of crawler engines live in an index enterprise search manages
//! itself; [`update_crawl_engine_mapping`] adds title completion to it.

use reqwest::{Client, Method, StatusCode};
use searchsync_primitives::CompletionTree;
use searchsync_source::Credential;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

use crate::client::{cancellable, ElasticClient};
use crate::errors::IndexError;

const ENGINES_V0: &str = "api/as/v0/engines/";
const ENGINES_V1: &str = "api/as/v1/engines/";
const ENGINE_LANGUAGE: &str = "nl";
const ENGINE_DOCUMENTS_PREFIX: &str = ".ent-search-engine-documents-";

#[derive(Clone, Debug)]
pub struct EngineRegistrar {
    http: Client,
    base_url: Url,
    credential: Credential,
    meta_engine: String,
}

impl EngineRegistrar {
    pub fn new(http: Client, mut base_url: Url, api_key: String, meta_engine: String) -> Self {
        if !base_url.path().ends_with('/') {
            let dir = format!("{}/", base_url.path());
            base_url.set_path(&dir);
        }

        Self {
            http,
            base_url,
            credential: Credential::Bearer(api_key),
            meta_engine,
        }
    }

    /// Name of the engine fronting `index`.
    pub fn engine_name(index: &str) -> String {
        format!("engine-{index}")
    }

    /// Makes `index` searchable through the meta engine.
    pub async fn register(&self, index: &str, cancel: &CancellationToken) -> bool {
        let engine = Self::engine_name(index);

        let registered = self.ensure_engine(&engine, index, cancel).await
            && self.ensure_meta_engine(&engine, cancel).await
            && self.attach(&engine, cancel).await;

        if registered {
            info!(%index, %engine, meta_engine = %self.meta_engine, "Registered engine");
        }

        registered
    }

    async fn ensure_engine(
        &self,
        engine: &str,
        index: &str,
        cancel: &CancellationToken,
    ) -> bool {
        if self.exists(engine, cancel).await {
            return true;
        }

        let body = json!({
            "name": engine,
            "search_index": { "type": "elasticsearch", "index_name": index },
            "language": ENGINE_LANGUAGE,
        });

        self.post(ENGINES_V0, &body, cancel).await
    }

    async fn ensure_meta_engine(&self, first_engine: &str, cancel: &CancellationToken) -> bool {
        if self.exists(&self.meta_engine, cancel).await {
            return true;
        }

        let body = json!({
            "name": self.meta_engine,
            "type": "meta",
            "source_engines": [first_engine],
        });

        self.post(ENGINES_V1, &body, cancel).await
    }

    async fn attach(&self, engine: &str, cancel: &CancellationToken) -> bool {
        let path = format!("{ENGINES_V1}{}/source_engines", self.meta_engine);

        self.post(&path, &json!([engine]), cancel).await
    }

    async fn exists(&self, engine: &str, cancel: &CancellationToken) -> bool {
        let path = format!("{ENGINES_V1}{engine}");

        match cancellable(cancel, self.send(Method::HEAD, &path, None)).await {
            Ok((status, _)) => status.is_success(),
            Err(err) => {
                warn!(%engine, %err, "Failed to look up engine");
                false
            }
        }
    }

    async fn post(&self, path: &str, body: &Value, cancel: &CancellationToken) -> bool {
        match cancellable(cancel, self.send(Method::POST, path, Some(body))).await {
            Ok((status, _)) if status.is_success() => true,
            Ok((status, body)) => {
                warn!(%path, %status, %body, "Engine request failed");
                false
            }
            Err(err) => {
                warn!(%path, %err, "Engine request failed");
                false
            }
        }
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, String), IndexError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|source| IndexError::InvalidUrl {
                value: path.to_owned(),
                source,
            })?;

        let mut builder = self
            .credential
            .apply(self.http.request(method, url.clone()));
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|source| IndexError::Request {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|source| IndexError::Request { url, source })?;

        Ok((status, text))
    }
}

/// Adds search-as-you-type completion to the titles of the documents crawled
/// by `engine`.
///
/// Returns `false` when the engine has no document index on the cluster or
/// the mapping update is refused; both are logged.
pub async fn update_crawl_engine_mapping(
    client: &ElasticClient,
    engine: &str,
    cancel: &CancellationToken,
) -> bool {
    let index = format!("{ENGINE_DOCUMENTS_PREFIX}{engine}");

    match cancellable(cancel, client.index_exists(&index)).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(%engine, %index, "Crawler engine has no document index");
            return false;
        }
        Err(err) => {
            warn!(%engine, %index, %err, "Failed to look up crawler engine documents");
            return false;
        }
    }

    let body = CompletionTree::from_paths(["title"]).to_mapping();

    match cancellable(cancel, client.put_mapping(&index, &body)).await {
        Ok(()) => {
            info!(%engine, %index, "Updated crawler engine mapping");
            true
        }
        Err(err) => {
            warn!(%engine, %index, %err, "Failed to update crawler engine mapping");
            false
        }
    }
}
