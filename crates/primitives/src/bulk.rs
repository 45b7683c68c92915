//! NDJSON encoding of bulk actions
//!
//! Every action is an action header line, followed by the document line for
//! index actions. Each line ends with a single `\n`.

use serde::Serialize;

use crate::record::Document;

const NEWLINE: u8 = b'\n';

/// One action in a bulk request body.
#[derive(Clone, Copy, Debug)]
pub enum BulkOperation<'a> {
    Index {
        index: &'a str,
        id: &'a str,
        document: Document<'a>,
    },
    Delete {
        index: &'a str,
        id: &'a str,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
enum ActionHeader<'a> {
    Index(Target<'a>),
    Delete(Target<'a>),
}

#[derive(Serialize)]
struct Target<'a> {
    #[serde(rename = "_index")]
    index: &'a str,
    #[serde(rename = "_id")]
    id: &'a str,
}

impl BulkOperation<'_> {
    pub const fn id(&self) -> &str {
        match *self {
            Self::Index { id, .. } | Self::Delete { id, .. } => id,
        }
    }

    /// Appends the serialized lines to `out` and returns the number of bytes
    /// written, separators included.
    pub fn write_to(&self, out: &mut Vec<u8>) -> serde_json::Result<usize> {
        let start = out.len();

        match *self {
            Self::Index {
                index,
                id,
                document,
            } => {
                serde_json::to_writer(&mut *out, &ActionHeader::Index(Target { index, id }))?;
                out.push(NEWLINE);
                serde_json::to_writer(&mut *out, &document)?;
                out.push(NEWLINE);
            }
            Self::Delete { index, id } => {
                serde_json::to_writer(&mut *out, &ActionHeader::Delete(Target { index, id }))?;
                out.push(NEWLINE);
            }
        }

        Ok(out.len() - start)
    }
}
