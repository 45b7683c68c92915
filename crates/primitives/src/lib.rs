//! Shared types for searchsync
//!
//! This crate holds the data model exchanged between the source adapters and
//! the index reconciler:
//!
//! - **Record**: a normalized source document with a stable id
//! - **BulkOperation**: one index or delete action in the NDJSON bulk format
//! - **CompletionTree**: which nested payload fields are eligible for
//!   search-as-you-type completion, and the index mapping derived from it

pub mod bulk;
pub mod mapping;
pub mod record;

pub use bulk::BulkOperation;
pub use mapping::{index_name, CompletionTree};
pub use record::{Document, Record};
