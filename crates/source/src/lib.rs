//! Source adapters for searchsync
//!
//! Every upstream API speaks the same paginated listing protocol, a bare JSON
//! array or `{"results": [...], "next": <url>}`. [`PagedCursor`] walks that
//! protocol lazily; the adapters in [`sources`] turn the raw items into
//! [`Record`]s.
//!
//! [`Record`]: searchsync_primitives::Record

pub mod adapter;
pub mod auth;
pub mod errors;
pub mod http;
pub mod paged;
pub mod sources;

pub use adapter::{RecordStream, SourceAdapter};
pub use auth::Credential;
pub use errors::SourceError;
pub use http::SourceClient;
pub use paged::{Page, PagedCursor};
pub use sources::SourceKind;
