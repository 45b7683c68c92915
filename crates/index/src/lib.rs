//! Reconciliation of a search index against a source
//!
//! A run reads the ids already in the index, streams the source into
//! size-bounded bulk requests, and finally deletes whatever the source no
//! longer yields. See [`IndexReconciler::sync`].

pub mod client;
pub mod engine;
pub mod errors;
pub mod keys;
pub mod reconcile;
pub mod writer;

pub use client::ElasticClient;
pub use engine::{update_crawl_engine_mapping, EngineRegistrar};
pub use errors::IndexError;
pub use keys::ExistingKeySetFetcher;
pub use reconcile::{IndexReconciler, Summary};
pub use writer::{Batch, BulkBatchWriter};
