use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// A normalized document produced by a source adapter.
///
/// `id` is the upsert key in the index, so it must be stable across runs and
/// unique across every source sharing the index.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: String,
    pub title: Option<String>,
    pub meta: Option<String>,
    pub payload: Value,
}

impl Record {
    pub fn new(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            title: None,
            meta: None,
            payload,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: Option<String>) -> Self {
        self.meta = meta;
        self
    }

    /// The body stored in the index for this record, with the payload nested
    /// under the source name.
    pub const fn document<'a>(&'a self, source: &'a str) -> Document<'a> {
        Document {
            record: self,
            source,
        }
    }
}

/// Serializable view of a [`Record`] as an index document.
#[derive(Clone, Copy, Debug)]
pub struct Document<'a> {
    record: &'a Record,
    source: &'a str,
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry("id", &self.record.id)?;
        map.serialize_entry("title", &self.record.title)?;
        map.serialize_entry("object_meta", &self.record.meta)?;
        map.serialize_entry("object_bron", self.source)?;
        map.serialize_entry(self.source, &self.record.payload)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn document_nests_payload_under_source() {
        let record = Record::new("kennisartikel_1", json!({ "uuid": "1" }))
            .with_title(Some("Paspoort aanvragen".to_owned()));

        let document = serde_json::to_value(record.document("Kennisartikel")).unwrap();

        assert_eq!(
            document,
            json!({
                "id": "kennisartikel_1",
                "title": "Paspoort aanvragen",
                "object_meta": null,
                "object_bron": "Kennisartikel",
                "Kennisartikel": { "uuid": "1" },
            })
        );
    }
}
