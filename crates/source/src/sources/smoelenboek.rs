//! Employee directory backed by `Medewerker` objects

use async_stream::try_stream;
use futures_util::{pin_mut, Stream, StreamExt, TryStreamExt};
use searchsync_primitives::Record;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::objecten::{ObjectTypesClient, ObjectenClient, OverigObject};
use super::join_fields;
use crate::adapter::{RecordStream, SourceAdapter};
use crate::errors::SourceError;

const SOURCE: &str = "Smoelenboek";
const OBJECT_TYPE: &str = "Medewerker";
const ID_PREFIX: &str = "smoelenboek_";

const NAME_FIELDS: &[&str] = &["voornaam", "voorvoegselAchternaam", "achternaam"];
const META_FIELDS: &[&str] = &["function", "department", "skills"];

#[derive(Clone, Debug)]
pub struct SmoelenboekSource {
    objecten: ObjectenClient,
    object_types: ObjectTypesClient,
}

impl SmoelenboekSource {
    pub const fn new(objecten: ObjectenClient, object_types: ObjectTypesClient) -> Self {
        Self {
            objecten,
            object_types,
        }
    }

    fn to_record(object: OverigObject) -> Option<Record> {
        let data = object.data;
        let id = data.get("id").and_then(Value::as_str)?;
        let id = format!("{ID_PREFIX}{id}");

        // Without contact details the name is empty, not absent.
        let title = join_fields(data.get("contact").unwrap_or(&Value::Null), NAME_FIELDS);
        let meta = join_fields(&data, META_FIELDS);

        Some(
            Record::new(id, data)
                .with_title(Some(title))
                .with_meta(Some(meta)),
        )
    }

    fn employees(
        &self,
        cancel: CancellationToken,
    ) -> impl Stream<Item = Result<Record, SourceError>> + Send + '_ {
        try_stream! {
            let object_type = {
                let types = self.object_types.type_urls(OBJECT_TYPE, cancel.clone());
                pin_mut!(types);
                types.try_next().await?
            };

            let object_type = object_type.ok_or(SourceError::ObjectTypeNotFound(OBJECT_TYPE))?;

            debug!(%object_type, "Resolved employee object type");

            let objects = self.objecten.objects(&object_type, cancel)?;
            pin_mut!(objects);

            while let Some(object) = objects.try_next().await? {
                if let Some(record) = Self::to_record(object) {
                    yield record;
                }
            }
        }
    }
}

impl SourceAdapter for SmoelenboekSource {
    fn source(&self) -> &str {
        SOURCE
    }

    fn completion_fields(&self) -> &[&str] {
        &[]
    }

    fn records(&self, cancel: CancellationToken) -> RecordStream<'_> {
        self.employees(cancel).boxed()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn employee_maps_to_record() {
        let data = json!({
            "id": "42",
            "contact": { "voornaam": "Jan", "voorvoegselAchternaam": "de", "achternaam": "Vries" },
            "function": "Adviseur",
            "department": "Burgerzaken",
        });

        let record = SmoelenboekSource::to_record(OverigObject {
            uuid: None,
            data: data.clone(),
        })
        .unwrap();

        assert_eq!(record.id, "smoelenboek_42");
        assert_eq!(record.title.as_deref(), Some("Jan de Vries"));
        assert_eq!(record.meta.as_deref(), Some("Adviseur Burgerzaken"));
        assert_eq!(record.payload, data);
    }

    #[test]
    fn employee_without_string_id_is_skipped() {
        let object = OverigObject {
            uuid: Some("1".to_owned()),
            data: json!({ "id": 42 }),
        };

        assert!(SmoelenboekSource::to_record(object).is_none());
    }

    #[test]
    fn employee_without_contact_has_an_empty_title() {
        let object = OverigObject {
            uuid: None,
            data: json!({ "id": "7", "function": "Adviseur" }),
        };

        let record = SmoelenboekSource::to_record(object).unwrap();

        assert_eq!(record.title.as_deref(), Some(""));
        assert_eq!(record.meta.as_deref(), Some("Adviseur"));
        assert_eq!(serde_json::to_value(record.document("Smoelenboek")).unwrap()["title"], "");
    }
}
