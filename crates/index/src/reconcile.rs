//! One synchronization run of a source into its index

use core::num::NonZeroUsize;

use searchsync_primitives::{index_name, CompletionTree};
use searchsync_source::SourceAdapter;
use serde::Deserialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{cancellable, ElasticClient, Response};
use crate::errors::IndexError;
use crate::keys::{ExistingKeySetFetcher, DEFAULT_PAGE_SIZE};
use crate::writer::{BulkBatchWriter, DEFAULT_MAX_BYTES};

/// What a run sent to the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Summary {
    pub index: String,
    pub batches: usize,
    pub indexed: usize,
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
struct BulkReply {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<Value>,
}

#[derive(Clone, Debug)]
pub struct IndexReconciler {
    client: ElasticClient,
    max_batch_bytes: NonZeroUsize,
    scroll_page_size: NonZeroUsize,
}

impl IndexReconciler {
    pub const fn new(client: ElasticClient) -> Self {
        Self {
            client,
            max_batch_bytes: DEFAULT_MAX_BYTES,
            scroll_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub const fn with_max_batch_bytes(mut self, max_batch_bytes: NonZeroUsize) -> Self {
        self.max_batch_bytes = max_batch_bytes;
        self
    }

    #[must_use]
    pub const fn with_scroll_page_size(mut self, scroll_page_size: NonZeroUsize) -> Self {
        self.scroll_page_size = scroll_page_size;
        self
    }

    /// Makes the index of `adapter` hold exactly the records it currently
    /// yields.
    ///
    /// Existing ids are read before anything is written, so a failure to
    /// enumerate them aborts the run without touching the index. A rejected
    /// bulk request is logged and the run moves on to the next batch.
    pub async fn sync(
        &self,
        adapter: &dyn SourceAdapter,
        cancel: CancellationToken,
    ) -> Result<Summary, IndexError> {
        let source = adapter.source();
        let index = index_name(source);

        self.ensure_index(&index, source, adapter.completion_fields(), &cancel)
            .await?;

        let mut existing = ExistingKeySetFetcher::new(self.client.clone())
            .fetch(&index, self.scroll_page_size, &cancel)
            .await?;

        info!(%index, existing = existing.len(), "Reconciling index");

        let mut summary = Summary {
            index: index.clone(),
            batches: 0,
            indexed: 0,
            deleted: 0,
        };

        let records = adapter.records(cancel.clone());
        let mut writer =
            BulkBatchWriter::new(&index, source, records, &mut existing, self.max_batch_bytes);

        while let Some(batch) = writer.next_batch().await? {
            debug!(
                %index,
                bytes = batch.len(),
                indexed = batch.indexed,
                deleted = batch.deleted,
                "Sending bulk request"
            );

            let response = cancellable(&cancel, self.client.bulk(batch.body)).await?;
            Self::report(&index, &response);

            summary.batches += 1;
            summary.indexed += batch.indexed;
            summary.deleted += batch.deleted;
        }

        info!(
            %index,
            batches = summary.batches,
            indexed = summary.indexed,
            deleted = summary.deleted,
            "Index reconciled"
        );

        Ok(summary)
    }

    async fn ensure_index(
        &self,
        index: &str,
        source: &str,
        completion_fields: &[&str],
        cancel: &CancellationToken,
    ) -> Result<(), IndexError> {
        if cancellable(cancel, self.client.index_exists(index)).await? {
            return Ok(());
        }

        let body = CompletionTree::from_paths(completion_fields).index_body(source);
        cancellable(cancel, self.client.create_index(index, &body)).await?;

        info!(%index, "Created index");

        Ok(())
    }

    fn report(index: &str, response: &Response) {
        if !response.status.is_success() {
            error!(
                %index,
                status = %response.status,
                body = %response.text(),
                "Bulk request failed"
            );
            return;
        }

        match response.json::<BulkReply>() {
            Ok(reply) if reply.errors => {
                let failed = reply
                    .items
                    .iter()
                    .filter(|item| Self::item_failed(item))
                    .count();
                warn!(%index, failed, "Bulk request partially failed");
            }
            Ok(_) => {}
            Err(err) => warn!(%index, %err, "Unreadable bulk response"),
        }
    }

    /// Bulk items are `{"<action>": {"status": <code>, ...}}`.
    fn item_failed(item: &Value) -> bool {
        item.as_object()
            .and_then(|actions| actions.values().next())
            .and_then(|result| result.get("status"))
            .and_then(Value::as_u64)
            .is_some_and(|status| status >= 300)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bulk_item_status() {
        assert!(IndexReconciler::item_failed(&json!({ "index": { "status": 400 } })));
        assert!(!IndexReconciler::item_failed(&json!({ "delete": { "status": 200 } })));
        assert!(!IndexReconciler::item_failed(&json!({ "index": {} })));
    }
}
