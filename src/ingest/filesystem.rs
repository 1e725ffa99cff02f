use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::{IngestRequest, Ingestion};
use crate::error::{Error, Result};

const TAGS_FILE: &str = "tags.json";

/// Tags recorded next to every ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTags {
    pub scopeid: Vec<String>,
    pub createdby: Vec<String>,
    pub memory: Vec<String>,
    pub sha256: String,
}

/// Ingestion backend that lays documents out on local disk as
/// `<data_dir>/ingest/<index>/<document_id>/<file_name>` with a `tags.json`
/// beside each one.
pub struct FileSystemIngestion {
    base_path: PathBuf,
}

impl FileSystemIngestion {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            base_path: data_dir.join("ingest"),
        }
    }

    fn document_dir(&self, index_name: &str, document_id: &str) -> PathBuf {
        self.base_path.join(index_name).join(document_id)
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path.join("tmp").join(Uuid::new_v4().to_string())
    }

    pub async fn read_tags(&self, index_name: &str, document_id: &str) -> Result<DocumentTags> {
        validate_component("index name", index_name)?;
        validate_component("document id", document_id)?;

        let path = self.document_dir(index_name, document_id).join(TAGS_FILE);
        let raw = fs::read(&path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::NotFound
            } else {
                Error::Io(e)
            }
        })?;
        serde_json::from_slice(&raw).map_err(|e| Error::Ingestion(format!("corrupt tags: {e}")))
    }

    /// Moves a fully written staging directory to `dir` in one rename, so
    /// a document directory never exists without its tags.
    async fn publish(
        &self,
        staging: &Path,
        dir: &Path,
        request: &IngestRequest,
        tags_json: &[u8],
    ) -> Result<()> {
        fs::create_dir_all(staging).await?;
        write_synced(&staging.join(&request.file_name), &request.content).await?;
        write_synced(&staging.join(TAGS_FILE), tags_json).await?;

        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(staging, dir).await?;
        Ok(())
    }
}

async fn write_synced(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    Ok(())
}

#[async_trait]
impl Ingestion for FileSystemIngestion {
    async fn store_document(&self, request: IngestRequest) -> Result<()> {
        validate_component("index name", &request.index_name)?;
        validate_component("document id", &request.document_id)?;
        validate_component("file name", &request.file_name)?;
        if request.file_name == TAGS_FILE {
            return Err(Error::Validation(format!(
                "file name {TAGS_FILE} is reserved"
            )));
        }

        let dir = self.document_dir(&request.index_name, &request.document_id);
        if fs::try_exists(&dir).await? {
            return Err(Error::AlreadyExists);
        }

        let mut hasher = Sha256::new();
        hasher.update(&request.content);
        let digest = hex::encode(hasher.finalize());

        let tags = DocumentTags {
            scopeid: request
                .scope_ids
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            createdby: vec![request.created_by.clone()],
            memory: vec![request.memory_name.clone()],
            sha256: digest,
        };
        let tags_json = serde_json::to_vec_pretty(&tags)
            .map_err(|e| Error::Ingestion(format!("failed to encode tags: {e}")))?;

        let staging = self.temp_path();
        if let Err(e) = self.publish(&staging, &dir, &request, &tags_json).await {
            match fs::remove_dir_all(&staging).await {
                Ok(()) => {}
                Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
                Err(cleanup) => tracing::warn!(
                    staging = %staging.display(),
                    "failed to clean up staged document: {cleanup}"
                ),
            }
            return Err(e);
        }

        tracing::debug!(
            index = %request.index_name,
            document_id = %request.document_id,
            bytes = request.content.len(),
            "stored document"
        );
        Ok(())
    }

    async fn remove_document(&self, index_name: &str, document_id: &str) -> Result<bool> {
        validate_component("index name", index_name)?;
        validate_component("document id", document_id)?;

        match fs::remove_dir_all(self.document_dir(index_name, document_id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

fn validate_component(what: &str, value: &str) -> Result<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
        || value.chars().any(char::is_control)
    {
        return Err(Error::Validation(format!("invalid {what}: {value:?}")));
    }
    Ok(())
}
