mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::authz::ParticipantRoster;
use crate::error::{Error, Result};
use crate::types::*;

/// Store defines the database interface.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // Memory source operations
    fn create_memory_source(&self, source: &MemorySource) -> Result<()>;
    fn get_memory_source(&self, id: &str) -> Result<Option<MemorySource>>;
    fn delete_memory_source(&self, id: &str) -> Result<bool>;
    /// Sources tagged with any of `scope_ids`, plus globally scoped sources
    /// when `include_global` is set. Oldest first.
    fn find_by_scope_ids(
        &self,
        scope_ids: &[ScopeId],
        include_global: bool,
    ) -> Result<Vec<MemorySource>>;
    fn find_by_chat_id(&self, chat_id: &str) -> Result<Vec<MemorySource>>;

    // Chat operations
    fn create_chat(&self, chat: &Chat) -> Result<()>;
    fn get_chat(&self, id: &str) -> Result<Option<Chat>>;

    // Participant operations
    /// Returns false if the user already participates.
    fn add_participant(&self, participant: &ChatParticipant) -> Result<bool>;
    fn is_user_in_chat(&self, user_id: &str, chat_id: &str) -> Result<bool>;
    fn list_participants(&self, chat_id: &str) -> Result<Vec<ChatParticipant>>;
}

/// Exposes a store's participant table as the authorizer's roster. Queries run
/// on the blocking pool so the gate's timeout can still fire while one waits
/// on the connection lock.
pub struct StoreRoster(pub Arc<dyn Store>);

#[async_trait]
impl ParticipantRoster for StoreRoster {
    async fn is_user_in_chat(&self, user_id: &str, chat_id: &str) -> Result<bool> {
        let store = Arc::clone(&self.0);
        let (user_id, chat_id) = (user_id.to_string(), chat_id.to_string());
        tokio::task::spawn_blocking(move || store.is_user_in_chat(&user_id, &chat_id))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}
