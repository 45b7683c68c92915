//! The paginated listing protocol shared by every source API
//!
//! A response is either a bare JSON array, which is the only page, or an
//! object holding a `results` array and an optional `next` link to the
//! following page. Anything else ends the enumeration.

use async_stream::try_stream;
use futures_util::Stream;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use crate::errors::SourceError;
use crate::http::SourceClient;

/// One parsed page of a listing.
#[derive(Debug, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    pub next: Option<String>,
}

impl Page {
    /// Returns `None` when the body matches neither page shape.
    pub fn parse(body: Value) -> Option<Self> {
        match body {
            Value::Array(records) => Some(Self {
                records,
                next: None,
            }),
            Value::Object(mut object) => {
                let Some(Value::Array(records)) = object.remove("results") else {
                    return None;
                };

                let next = match object.remove("next") {
                    Some(Value::String(next)) if !next.trim().is_empty() => Some(next),
                    _ => None,
                };

                Some(Self { records, next })
            }
            _ => None,
        }
    }
}

/// Forward-only enumeration of every item behind a listing URL.
///
/// Pages are fetched one at a time as the stream is polled, so memory use is
/// bounded by a single page. The enumeration cannot be rewound; a fresh
/// cursor always starts from the first page.
#[derive(Clone, Debug)]
pub struct PagedCursor {
    client: SourceClient,
    start: Url,
}

impl PagedCursor {
    pub const fn new(client: SourceClient, start: Url) -> Self {
        Self { client, start }
    }

    pub fn records(
        self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Value, SourceError>> + Send {
        try_stream! {
            let mut next = Some(self.start);

            while let Some(url) = next.take() {
                let body = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(SourceError::Cancelled),
                    body = self.client.get_json(&url) => body,
                }?;

                let Some(body) = body else {
                    break;
                };

                let Some(page) = Page::parse(body) else {
                    debug!(%url, "Response is not a recognized page, ending enumeration");
                    break;
                };

                if let Some(link) = page.next.as_deref() {
                    next = Some(url.join(link).map_err(|source| SourceError::InvalidUrl {
                        value: link.to_owned(),
                        source,
                    })?);
                }

                for record in page.records {
                    yield record;
                }
            }
        }
    }
}
