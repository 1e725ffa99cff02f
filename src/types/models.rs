use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scope::ScopeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    File,
    Web,
}

impl SourceType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            SourceType::File => "file",
            SourceType::Web => "web",
        }
    }

    pub fn parse(s: &str) -> Option<SourceType> {
        match s {
            "file" => Some(SourceType::File),
            "web" => Some(SourceType::Web),
            _ => None,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document or link imported into chat memory. The scope set is fixed at
/// import time; changing grants means importing again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySource {
    pub id: String,
    pub scope_ids: Vec<ScopeId>,
    pub name: String,
    pub created_by: String,
    pub source_type: SourceType,
    pub size_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub chat_id: String,
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

/// A file found on disk and selected for bulk import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl FileDescriptor {
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Files destined for one ingestion call. Every file shares `scope_ids`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBatch {
    pub scope_ids: Vec<ScopeId>,
    pub files: Vec<FileDescriptor>,
}

impl ImportBatch {
    #[must_use]
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
