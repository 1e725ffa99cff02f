use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::directory::UserProfile;
use crate::types::{Chat, ChatParticipant, MemorySource};

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct AddParticipantRequest {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    #[serde(flatten)]
    pub chat: Chat,
    pub participants: Vec<ChatParticipant>,
}

/// Query for `GET /memory-sources`. `scope_ids` is a comma-separated list.
#[derive(Debug, Default, Deserialize)]
pub struct MemorySourceQuery {
    #[serde(default)]
    pub scope_ids: Option<String>,
    #[serde(default)]
    pub include_global: bool,
}

impl MemorySourceQuery {
    #[must_use]
    pub fn scope_list(&self) -> Vec<String> {
        self.scope_ids
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct MemorySourceListResponse {
    pub sources: Vec<MemorySource>,
}

#[derive(Debug, Serialize)]
pub struct ImportedDocument {
    pub id: String,
    pub name: String,
    pub size: String,
    pub is_uploaded: bool,
}

#[derive(Debug, Serialize)]
pub struct DocumentImportResponse {
    pub scope_ids: Vec<String>,
    pub documents: Vec<ImportedDocument>,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub directory_enabled: bool,
    pub groups: Vec<String>,
    pub profile: Option<UserProfile>,
}

impl MeResponse {
    pub fn sorted_groups(groups: &HashSet<String>) -> Vec<String> {
        let mut groups: Vec<String> = groups.iter().cloned().collect();
        groups.sort();
        groups
    }
}
