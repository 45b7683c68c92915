//! Size-bounded NDJSON bulk bodies
//!
//! Records are written as index operations first. Only once the record stream
//! is exhausted are the ids left in the existing set written as deletes, so a
//! record that is both in the index and in the source is always an update.

use core::mem;
use core::num::NonZeroUsize;
use std::collections::{hash_set, HashSet};

use futures_util::{Stream, StreamExt};
use searchsync_primitives::{BulkOperation, Record};
use searchsync_source::SourceError;

use crate::errors::IndexError;

/// Default upper bound of a bulk body, in bytes.
pub const DEFAULT_MAX_BYTES: NonZeroUsize = match NonZeroUsize::new(50_000_000) {
    Some(bytes) => bytes,
    None => unreachable!(),
};

/// One bulk request body and what it contains.
#[derive(Debug, Default)]
pub struct Batch {
    pub body: Vec<u8>,
    pub indexed: usize,
    pub deleted: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug)]
pub struct BulkBatchWriter<'a, S> {
    index: &'a str,
    source: &'a str,
    records: S,
    exhausted: bool,
    existing: &'a mut HashSet<String>,
    stale: Option<hash_set::IntoIter<String>>,
    max_bytes: NonZeroUsize,
}

impl<'a, S> BulkBatchWriter<'a, S>
where
    S: Stream<Item = Result<Record, SourceError>> + Unpin,
{
    /// `existing` is drained as records are written; whatever remains once
    /// the stream ends is deleted.
    pub fn new(
        index: &'a str,
        source: &'a str,
        records: S,
        existing: &'a mut HashSet<String>,
        max_bytes: NonZeroUsize,
    ) -> Self {
        Self {
            index,
            source,
            records,
            exhausted: false,
            existing,
            stale: None,
            max_bytes,
        }
    }

    /// Builds the next batch, or `None` once every record has been written
    /// and every stale id deleted.
    ///
    /// The size cap is checked before each operation, so a batch only
    /// exceeds it by its last operation, or when a single record is larger
    /// than the cap on its own.
    pub async fn next_batch(&mut self) -> Result<Option<Batch>, IndexError> {
        let mut batch = Batch::default();
        let max_bytes = self.max_bytes.get();

        while !self.exhausted && batch.len() < max_bytes {
            let Some(record) = self.records.next().await.transpose()? else {
                self.exhausted = true;
                break;
            };

            let _existed = self.existing.remove(&record.id);

            let operation = BulkOperation::Index {
                index: self.index,
                id: &record.id,
                document: record.document(self.source),
            };
            Self::append(&mut batch, operation)?;
            batch.indexed += 1;
        }

        if self.exhausted {
            // Whatever is left in the set was not seen in the source.
            let stale = self
                .stale
                .get_or_insert_with(|| mem::take(&mut *self.existing).into_iter());

            while batch.len() < max_bytes {
                let Some(id) = stale.next() else {
                    break;
                };

                Self::append(&mut batch, BulkOperation::Delete { index: self.index, id: &id })?;
                batch.deleted += 1;
            }
        }

        Ok((!batch.is_empty()).then_some(batch))
    }

    fn append(batch: &mut Batch, operation: BulkOperation<'_>) -> Result<(), IndexError> {
        let _written = operation
            .write_to(&mut batch.body)
            .map_err(|source| IndexError::Serialize {
                id: operation.id().to_owned(),
                source,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;
    use serde_json::{json, Value};

    use super::*;

    const ONE_BYTE: NonZeroUsize = NonZeroUsize::MIN;

    fn cap(bytes: usize) -> NonZeroUsize {
        NonZeroUsize::new(bytes).unwrap()
    }

    fn record(id: &str) -> Result<Record, SourceError> {
        Ok(Record::new(id, json!({ "n": id })))
    }

    fn lines(batch: &Batch) -> Vec<Value> {
        batch
            .body
            .split(|b| *b == b'\n')
            .filter(|line| !line.is_empty())
            .map(|line| serde_json::from_slice(line).unwrap())
            .collect()
    }

    async fn drain<S>(mut writer: BulkBatchWriter<'_, S>) -> Vec<Batch>
    where
        S: Stream<Item = Result<Record, SourceError>> + Unpin,
    {
        let mut batches = Vec::new();
        while let Some(batch) = writer.next_batch().await.unwrap() {
            batches.push(batch);
        }
        batches
    }

    #[tokio::test]
    async fn updates_are_not_deleted() {
        let mut existing: HashSet<String> = ["1", "2", "3"].map(str::to_owned).into();
        let records = stream::iter([record("2"), record("3"), record("4")]);

        let batches = drain(BulkBatchWriter::new(
            "search-test",
            "Test",
            records,
            &mut existing,
            DEFAULT_MAX_BYTES,
        ))
        .await;

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].indexed, 3);
        assert_eq!(batches[0].deleted, 1);

        let lines = lines(&batches[0]);
        assert_eq!(lines[0], json!({ "index": { "_index": "search-test", "_id": "2" } }));
        assert_eq!(lines[1]["Test"], json!({ "n": "2" }));
        assert_eq!(lines[6], json!({ "delete": { "_index": "search-test", "_id": "1" } }));
        assert_eq!(lines.len(), 7);
        assert!(existing.is_empty());
    }

    #[tokio::test]
    async fn batches_respect_the_cap() {
        let mut existing = HashSet::new();
        let records = stream::iter((0..20).map(|n| record(&format!("record-{n:02}"))));

        let single = {
            let mut body = Vec::new();
            let one = Record::new("record-00", json!({ "n": "record-00" }));
            BulkOperation::Index {
                index: "search-test",
                id: &one.id,
                document: one.document("Test"),
            }
            .write_to(&mut body)
            .unwrap()
        };
        let limit = single * 3;

        let batches = drain(BulkBatchWriter::new("search-test", "Test", records, &mut existing, cap(limit))).await;

        assert_eq!(batches.iter().map(|b| b.indexed).sum::<usize>(), 20);
        assert!(batches.len() >= 7);
        for batch in &batches {
            // The cap is checked before each operation, so at most one
            // operation spills over.
            assert!(batch.len() < limit + single);
        }
    }

    #[tokio::test]
    async fn oversized_record_gets_its_own_batch() {
        let mut existing = HashSet::new();
        let big = "x".repeat(1024);
        let records = stream::iter([
            Ok(Record::new("big", json!({ "text": big }))),
            record("small"),
        ]);

        let batches = drain(BulkBatchWriter::new("search-test", "Test", records, &mut existing, cap(64))).await;

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].indexed, 1);
        assert!(batches[0].len() > 64);
        assert_eq!(batches[1].indexed, 1);
    }

    #[tokio::test]
    async fn deletes_wait_for_the_stream_to_end() {
        let mut existing: HashSet<String> = ["old"].map(str::to_owned).into();
        let records = stream::iter([record("a"), record("b")]);

        // A cap of one byte forces one operation per batch.
        let batches = drain(BulkBatchWriter::new("search-test", "Test", records, &mut existing, ONE_BYTE)).await;

        let kinds: Vec<_> = batches.iter().map(|b| (b.indexed, b.deleted)).collect();
        assert_eq!(kinds, [(1, 0), (1, 0), (0, 1)]);
    }

    #[tokio::test]
    async fn nothing_to_do_yields_no_batch() {
        let mut existing = HashSet::new();
        let records = stream::iter(Vec::<Result<Record, SourceError>>::new());

        let batches = drain(BulkBatchWriter::new("search-test", "Test", records, &mut existing, ONE_BYTE)).await;

        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn source_errors_are_propagated() {
        let mut existing = HashSet::new();
        let records = stream::iter([record("a"), Err(SourceError::Cancelled)]);
        let mut writer = BulkBatchWriter::new("search-test", "Test", records, &mut existing, DEFAULT_MAX_BYTES);

        let error = writer.next_batch().await.unwrap_err();

        assert!(error.is_cancelled());
    }

    #[tokio::test]
    async fn many_stale_ids_are_deleted_in_one_batch() {
        let mut existing: HashSet<String> = (0..100_000).map(|n| format!("stale-{n}")).collect();
        let records = stream::iter([record("fresh")]);

        let batches = drain(BulkBatchWriter::new(
            "search-test",
            "Test",
            records,
            &mut existing,
            DEFAULT_MAX_BYTES,
        ))
        .await;

        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].indexed, 1);
        assert_eq!(batches[0].deleted, 100_000);
        assert!(existing.is_empty());
    }

    #[tokio::test]
    async fn stale_ids_spread_over_batches_are_each_deleted_once() {
        let mut existing: HashSet<String> = (0..50).map(|n| format!("stale-{n}")).collect();
        let records = stream::iter(Vec::<Result<Record, SourceError>>::new());

        let batches = drain(BulkBatchWriter::new("search-test", "Test", records, &mut existing, cap(200))).await;

        assert!(batches.len() > 1);

        let deleted: HashSet<String> = batches
            .iter()
            .flat_map(lines)
            .map(|line| line["delete"]["_id"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(deleted.len(), 50);
        assert_eq!(batches.iter().map(|b| b.deleted).sum::<usize>(), 50);
    }
}
