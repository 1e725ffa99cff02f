//! Bulk import: resolve each file's grant from marker files, package files
//! into bounded batches and submit them to the ingestion endpoint.

mod batcher;
mod cascade;
mod client;

pub use batcher::{BatchLimits, DEFAULT_MAX_BYTES, DEFAULT_MAX_FILES, make_batches};
pub use cascade::{
    ImportPlan, MARKER_EXTENSION, PermsCascadeResolver, ScopeGroup, has_marker, is_importable,
    plan_folder, resolve_scopes_for_file,
};
pub use client::{BatchOutcome, BatchSink, ImportReport, IngestionClient, submit_batches};
