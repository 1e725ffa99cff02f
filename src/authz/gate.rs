use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub const DEFAULT_ROSTER_TIMEOUT: Duration = Duration::from_secs(5);

/// Participant roster lookup, typically backed by the chat store.
#[async_trait]
pub trait ParticipantRoster: Send + Sync {
    async fn is_user_in_chat(&self, user_id: &str, chat_id: &str) -> Result<bool>;
}

/// Resolves scope ids that are neither the wildcard, the caller, nor one of
/// the caller's groups. Lookup errors, timeouts and cancellation all read as
/// "not a participant".
#[derive(Clone)]
pub struct ChatParticipantGate {
    roster: Arc<dyn ParticipantRoster>,
    timeout: Duration,
}

impl ChatParticipantGate {
    pub fn new(roster: Arc<dyn ParticipantRoster>) -> Self {
        Self {
            roster,
            timeout: DEFAULT_ROSTER_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn is_participant(
        &self,
        user_id: &str,
        chat_id: &str,
        cancel: &CancellationToken,
    ) -> bool {
        let lookup = tokio::time::timeout(self.timeout, self.roster.is_user_in_chat(user_id, chat_id));

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::warn!(user_id, chat_id, "participant lookup cancelled; denying");
                false
            }
            result = lookup => match result {
                Ok(Ok(is_participant)) => is_participant,
                Ok(Err(e)) => {
                    tracing::warn!(user_id, chat_id, "participant lookup failed: {e}; denying");
                    false
                }
                Err(_) => {
                    tracing::warn!(user_id, chat_id, "participant lookup timed out; denying");
                    false
                }
            },
        }
    }
}
