//! Clients for the Objecten and Objecttypen registers
//!
//! Objects are listed per object type, identified by the URL of the type in
//! the Objecttypen API.

use async_stream::try_stream;
use futures_util::{pin_mut, Stream, TryStreamExt};
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::auth::Credential;
use crate::errors::SourceError;
use crate::http::{endpoint, SourceClient};
use crate::paged::PagedCursor;

const OBJECTS_PATH: &str = "api/v2/objects";
const OBJECT_TYPES_PATH: &str = "api/v2/objecttypes";

/// An object from the Objecten API, reduced to its id and current data.
#[derive(Debug)]
pub struct OverigObject {
    pub uuid: Option<String>,
    pub data: Value,
}

impl OverigObject {
    /// Returns `None` when the item has no object at `record.data`.
    pub fn from_item(mut item: Value) -> Option<Self> {
        let data = item
            .pointer_mut("/record/data")
            .filter(|data| data.is_object())?
            .take();

        let uuid = item.get("uuid").and_then(Value::as_str).map(str::to_owned);

        Some(Self { uuid, data })
    }
}

#[derive(Clone, Debug)]
pub struct ObjectenClient {
    client: SourceClient,
    base_url: Url,
}

impl ObjectenClient {
    pub fn new(base_url: Url, credential: Credential) -> Self {
        let client = SourceClient::new(credential).with_header(
            HeaderName::from_static("content-crs"),
            HeaderValue::from_static("EPSG:4326"),
        );

        Self { client, base_url }
    }

    /// Every object of the given type, in listing order.
    pub fn objects(
        &self,
        object_type: &Url,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = Result<OverigObject, SourceError>> + Send, SourceError> {
        let mut url = endpoint(&self.base_url, OBJECTS_PATH)?;
        let _ignored = url
            .query_pairs_mut()
            .append_pair("type", object_type.as_str());

        let objects = PagedCursor::new(self.client.clone(), url)
            .records(cancel)
            .try_filter_map(|item| async move { Ok(OverigObject::from_item(item)) });

        Ok(objects)
    }
}

#[derive(Clone, Debug)]
pub struct ObjectTypesClient {
    client: SourceClient,
    base_url: Url,
}

impl ObjectTypesClient {
    pub fn new(base_url: Url, credential: Credential) -> Self {
        Self {
            client: SourceClient::new(credential),
            base_url,
        }
    }

    /// URLs of the object types called `name`, compared case-insensitively.
    pub fn type_urls<'a>(
        &'a self,
        name: &'a str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Url, SourceError>> + Send + 'a {
        try_stream! {
            let start = endpoint(&self.base_url, OBJECT_TYPES_PATH)?;
            let types = PagedCursor::new(self.client.clone(), start).records(cancel);
            pin_mut!(types);

            while let Some(object_type) = types.try_next().await? {
                let matches = object_type
                    .get("name")
                    .and_then(Value::as_str)
                    .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name));

                let Some(url) = object_type.get("url").and_then(Value::as_str) else {
                    continue;
                };

                if matches && !url.trim().is_empty() {
                    yield Url::parse(url).map_err(|source| SourceError::InvalidUrl {
                        value: url.to_owned(),
                        source,
                    })?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn overig_object_requires_record_data() {
        let object = OverigObject::from_item(json!({
            "uuid": "0f7c",
            "record": { "data": { "vraag": "Hoe?" } },
        }))
        .unwrap();

        assert_eq!(object.uuid.as_deref(), Some("0f7c"));
        assert_eq!(object.data, json!({ "vraag": "Hoe?" }));

        assert!(OverigObject::from_item(json!({ "uuid": "1", "record": {} })).is_none());
        assert!(OverigObject::from_item(json!({ "uuid": "1", "record": { "data": "x" } })).is_none());
    }
}
