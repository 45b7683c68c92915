use futures_util::stream::BoxStream;
use searchsync_primitives::Record;
use tokio_util::sync::CancellationToken;

use crate::errors::SourceError;

pub type RecordStream<'a> = BoxStream<'a, Result<Record, SourceError>>;

/// A backend that can be mirrored into a search index.
pub trait SourceAdapter: Send + Sync {
    /// Logical name of the source, from which the index name is derived.
    fn source(&self) -> &str;

    /// Dotted payload paths eligible for search-as-you-type completion.
    fn completion_fields(&self) -> &[&str];

    /// Lazily enumerates every record currently in the source.
    fn records(&self, cancel: CancellationToken) -> RecordStream<'_>;
}
