//! Ingestion boundary: where validated documents are handed off for
//! indexing together with their scope tags.

mod classifier;
mod filesystem;

pub use classifier::{DocumentTypeClassifier, ExtensionClassifier, SUPPORTED_EXTENSIONS};
pub use filesystem::{DocumentTags, FileSystemIngestion};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::ScopeId;

/// One document to ingest. `scope_ids` keeps the order given by the caller.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub index_name: String,
    pub document_id: String,
    pub scope_ids: Vec<ScopeId>,
    pub created_by: String,
    pub memory_name: String,
    pub file_name: String,
    pub content: Bytes,
}

#[async_trait]
pub trait Ingestion: Send + Sync {
    async fn store_document(&self, request: IngestRequest) -> Result<()>;

    /// Removes a previously ingested document. Returns false if it was absent.
    async fn remove_document(&self, index_name: &str, document_id: &str) -> Result<bool>;
}
