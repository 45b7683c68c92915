//! Frequently asked questions ("vraag-antwoordcombinaties") stored as objects

use async_stream::try_stream;
use futures_util::{pin_mut, Stream, StreamExt, TryStreamExt};
use searchsync_primitives::Record;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::non_blank;
use super::objecten::{ObjectTypesClient, ObjectenClient, OverigObject};
use crate::adapter::{RecordStream, SourceAdapter};
use crate::errors::SourceError;

const SOURCE: &str = "VAC";
const ID_PREFIX: &str = "vac_";

const COMPLETION_FIELDS: &[&str] = &["vraag", "trefwoorden.trefwoord"];

/// Where the object types holding questions come from.
#[derive(Clone, Debug)]
pub enum VacObjectTypes {
    /// A single, configured object type.
    Fixed(Url),
    /// Every object type named `VAC`.
    Lookup(ObjectTypesClient),
}

#[derive(Clone, Debug)]
pub struct VacSource {
    objecten: ObjectenClient,
    object_types: VacObjectTypes,
}

impl VacSource {
    pub const fn new(objecten: ObjectenClient, object_types: VacObjectTypes) -> Self {
        Self {
            objecten,
            object_types,
        }
    }

    fn to_record(object: OverigObject) -> Option<Record> {
        let id = format!("{ID_PREFIX}{}", object.uuid?);
        let title = non_blank(&object.data, "vraag").map(str::to_owned);

        Some(Record::new(id, object.data).with_title(title))
    }

    fn questions<'a>(
        &'a self,
        object_type: &'a Url,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Record, SourceError>> + Send + 'a {
        try_stream! {
            let objects = self.objecten.objects(object_type, cancel)?;
            pin_mut!(objects);

            while let Some(object) = objects.try_next().await? {
                if let Some(record) = Self::to_record(object) {
                    yield record;
                }
            }
        }
    }

    fn looked_up<'a>(
        &'a self,
        object_types: &'a ObjectTypesClient,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Record, SourceError>> + Send + 'a {
        try_stream! {
            let types = object_types.type_urls(SOURCE, cancel.clone());
            pin_mut!(types);

            while let Some(object_type) = types.try_next().await? {
                let questions = self.questions(&object_type, cancel.clone());
                pin_mut!(questions);

                while let Some(record) = questions.try_next().await? {
                    yield record;
                }
            }
        }
    }
}

impl SourceAdapter for VacSource {
    fn source(&self) -> &str {
        SOURCE
    }

    fn completion_fields(&self) -> &[&str] {
        COMPLETION_FIELDS
    }

    fn records(&self, cancel: CancellationToken) -> RecordStream<'_> {
        match &self.object_types {
            VacObjectTypes::Fixed(object_type) => self.questions(object_type, cancel).boxed(),
            VacObjectTypes::Lookup(client) => self.looked_up(client, cancel).boxed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn question_maps_to_record() {
        let data = json!({ "vraag": "Hoe vraag ik een paspoort aan?", "trefwoorden": [] });

        let record = VacSource::to_record(OverigObject {
            uuid: Some("9b1c".to_owned()),
            data: data.clone(),
        })
        .unwrap();

        assert_eq!(record.id, "vac_9b1c");
        assert_eq!(record.title.as_deref(), Some("Hoe vraag ik een paspoort aan?"));
        assert_eq!(record.meta, None);
        assert_eq!(record.payload, data);
    }

    #[test]
    fn question_without_uuid_is_skipped() {
        let object = OverigObject {
            uuid: None,
            data: json!({ "vraag": "?" }),
        };

        assert!(VacSource::to_record(object).is_none());
    }
}
