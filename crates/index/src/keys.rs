//! Enumeration of the document ids already stored in an index

use core::num::NonZeroUsize;
use std::collections::HashSet;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{cancellable, ElasticClient, ScrollPage};
use crate::errors::IndexError;

/// Default number of ids requested per scroll page.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(size) => size,
    None => unreachable!(),
};

#[derive(Clone, Debug)]
pub struct ExistingKeySetFetcher {
    client: ElasticClient,
}

impl ExistingKeySetFetcher {
    pub const fn new(client: ElasticClient) -> Self {
        Self { client }
    }

    /// Every id in `index`, read through a scroll of `page_size` hits.
    ///
    /// A missing index yields an empty set. The scroll context is released
    /// once enumeration ends, whether it succeeded or not. Failing to
    /// release it, or being cancelled first, is only logged since the server
    /// expires it anyway.
    pub async fn fetch(
        &self,
        index: &str,
        page_size: NonZeroUsize,
        cancel: &CancellationToken,
    ) -> Result<HashSet<String>, IndexError> {
        let mut ids = HashSet::new();

        let Some(first) = cancellable(cancel, self.client.open_scroll(index, page_size.get())).await?
        else {
            debug!(%index, "Index not found, nothing to reconcile against");
            return Ok(ids);
        };

        let mut scroll_id = None;
        let result = self.drain(first, &mut scroll_id, &mut ids, cancel).await;

        if let Some(scroll_id) = scroll_id {
            if let Err(err) = cancellable(cancel, self.client.clear_scroll(&scroll_id)).await {
                warn!(%index, %err, "Failed to clear scroll context");
            }
        }

        result?;

        debug!(%index, count = ids.len(), "Fetched existing ids");

        Ok(ids)
    }

    async fn drain(
        &self,
        mut page: ScrollPage,
        scroll_id: &mut Option<String>,
        ids: &mut HashSet<String>,
        cancel: &CancellationToken,
    ) -> Result<(), IndexError> {
        loop {
            if let Some(next) = page.scroll_id.take() {
                *scroll_id = Some(next);
            }

            if page.hits.hits.is_empty() {
                return Ok(());
            }

            ids.extend(page.hits.hits.into_iter().map(|hit| hit.id));

            let Some(current) = scroll_id.as_deref() else {
                return Ok(());
            };

            page = cancellable(cancel, self.client.scroll(current)).await?;
        }
    }
}
