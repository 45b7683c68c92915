//! Knowledge articles from the SDG products API

use futures_util::{StreamExt, TryStreamExt};
use searchsync_primitives::Record;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::non_blank;
use crate::adapter::{RecordStream, SourceAdapter};
use crate::auth::Credential;
use crate::errors::SourceError;
use crate::http::{endpoint, SourceClient};
use crate::paged::PagedCursor;

const SOURCE: &str = "Kennisartikel";
const PRODUCTS_PATH: &str = "api/v1/producten";
const ID_PREFIX: &str = "kennisartikel_";

const COMPLETION_FIELDS: &[&str] = &[
    "vertalingen.productTitelDecentraal",
    "vertalingen.specifiekeTekst",
];

#[derive(Clone, Debug)]
pub struct KennisartikelSource {
    cursor: PagedCursor,
}

impl KennisartikelSource {
    pub fn new(base_url: &Url, api_key: String) -> Result<Self, SourceError> {
        let start = endpoint(base_url, PRODUCTS_PATH)?;
        let client = SourceClient::new(Credential::Token(api_key));

        Ok(Self {
            cursor: PagedCursor::new(client, start),
        })
    }

    /// Title and meta come from the first translation of the product.
    fn to_record(product: Value) -> Option<Record> {
        let uuid = product.get("uuid").and_then(Value::as_str)?;
        let id = format!("{ID_PREFIX}{uuid}");

        let translation = product.get("vertalingen").and_then(|v| v.get(0));
        let title = translation
            .and_then(|t| non_blank(t, "productTitelDecentraal"))
            .map(str::to_owned);
        let meta = translation
            .and_then(|t| non_blank(t, "specifiekeTekst"))
            .map(str::to_owned);

        Some(Record::new(id, product).with_title(title).with_meta(meta))
    }
}

impl SourceAdapter for KennisartikelSource {
    fn source(&self) -> &str {
        SOURCE
    }

    fn completion_fields(&self) -> &[&str] {
        COMPLETION_FIELDS
    }

    fn records(&self, cancel: CancellationToken) -> RecordStream<'_> {
        self.cursor
            .clone()
            .records(cancel)
            .try_filter_map(|product| async move { Ok(Self::to_record(product)) })
            .boxed()
    }
}
