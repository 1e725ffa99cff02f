//! Identity directory lookups.
//!
//! A [`Directory`] is the raw backend and reports failures. [`DirectoryClient`]
//! wraps one with a timeout and cancellation, and turns every failure into
//! "no groups": an unreachable directory must never block or fail an
//! authorization check.

mod graph;

pub use graph::{DEFAULT_GRAPH_BASE_URL, GraphDirectory};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

pub const DEFAULT_DIRECTORY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_principal_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_title: Option<String>,
}

/// Directory defines the identity directory interface.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Returns the ids of every group the user is a member of, following
    /// continuation pages until exhausted.
    async fn resolve_groups(&self, user_id: &str) -> Result<HashSet<String>>;

    async fn resolve_profile(&self, user_id: &str) -> Result<UserProfile>;
}

#[derive(Clone)]
pub struct DirectoryClient {
    backend: Arc<dyn Directory>,
    timeout: Duration,
}

impl DirectoryClient {
    pub fn new(backend: Arc<dyn Directory>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_DIRECTORY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves group ids, degrading to an empty set on error, timeout or
    /// cancellation.
    pub async fn resolve_groups(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> HashSet<String> {
        let lookup = tokio::time::timeout(self.timeout, self.backend.resolve_groups(user_id));

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::warn!(user_id, "group resolution cancelled; continuing without groups");
                HashSet::new()
            }
            result = lookup => match result {
                Ok(Ok(groups)) => {
                    tracing::debug!(user_id, count = groups.len(), "resolved directory groups");
                    groups
                }
                Ok(Err(e)) => {
                    tracing::warn!(user_id, "group resolution failed: {e}; continuing without groups");
                    HashSet::new()
                }
                Err(_) => {
                    tracing::warn!(
                        user_id,
                        "group resolution timed out after {:?}; continuing without groups",
                        self.timeout
                    );
                    HashSet::new()
                }
            },
        }
    }

    /// Resolves the user's profile, or None if the directory cannot answer.
    pub async fn resolve_profile(
        &self,
        user_id: &str,
        cancel: &CancellationToken,
    ) -> Option<UserProfile> {
        let lookup = tokio::time::timeout(self.timeout, self.backend.resolve_profile(user_id));

        tokio::select! {
            () = cancel.cancelled() => None,
            result = lookup => match result {
                Ok(Ok(profile)) => Some(profile),
                Ok(Err(e)) => {
                    tracing::warn!(user_id, "profile lookup failed: {e}");
                    None
                }
                Err(_) => {
                    tracing::warn!(user_id, "profile lookup timed out after {:?}", self.timeout);
                    None
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FailingDirectory;

    #[async_trait]
    impl Directory for FailingDirectory {
        async fn resolve_groups(&self, _user_id: &str) -> Result<HashSet<String>> {
            Err(Error::Directory("unauthorized".to_string()))
        }

        async fn resolve_profile(&self, _user_id: &str) -> Result<UserProfile> {
            Err(Error::Directory("unauthorized".to_string()))
        }
    }

    struct SlowDirectory;

    #[async_trait]
    impl Directory for SlowDirectory {
        async fn resolve_groups(&self, _user_id: &str) -> Result<HashSet<String>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(HashSet::from(["g1".to_string()]))
        }

        async fn resolve_profile(&self, user_id: &str) -> Result<UserProfile> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(UserProfile {
                id: user_id.to_string(),
                display_name: None,
                mail: None,
                user_principal_name: None,
                job_title: None,
            })
        }
    }

    #[tokio::test]
    async fn test_failure_yields_empty_groups() {
        let client = DirectoryClient::new(Arc::new(FailingDirectory));
        let groups = client
            .resolve_groups("user-1", &CancellationToken::new())
            .await;
        assert!(groups.is_empty());
        assert!(
            client
                .resolve_profile("user-1", &CancellationToken::new())
                .await
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_empty_groups() {
        let client =
            DirectoryClient::new(Arc::new(SlowDirectory)).with_timeout(Duration::from_secs(2));
        let groups = client
            .resolve_groups("user-1", &CancellationToken::new())
            .await;
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn test_cancellation_yields_empty_groups() {
        let client = DirectoryClient::new(Arc::new(SlowDirectory));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let groups = client.resolve_groups("user-1", &cancel).await;
        assert!(groups.is_empty());
    }
}
