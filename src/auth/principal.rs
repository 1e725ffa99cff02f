use std::collections::HashSet;

use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::directory::{DirectoryClient, UserProfile};

/// The authenticated caller of one request.
///
/// Identity fields are fixed at construction. Group membership is resolved
/// from the directory on first access and cached for the lifetime of the
/// instance; concurrent first accesses share a single lookup.
pub struct Principal {
    user_id: String,
    display_name: String,
    tenant_id: Option<String>,
    directory: Option<DirectoryClient>,
    cancel: CancellationToken,
    groups: OnceCell<HashSet<String>>,
}

impl Principal {
    pub fn new(
        user_id: impl Into<String>,
        display_name: impl Into<String>,
        tenant_id: Option<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            tenant_id,
            directory: None,
            cancel: CancellationToken::new(),
            groups: OnceCell::new(),
        }
    }

    /// Enables group enrichment through the given directory.
    #[must_use]
    pub fn with_directory(mut self, directory: DirectoryClient) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Threads a request-level cancellation signal into directory lookups.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A principal whose groups are already known. No directory is consulted.
    #[must_use]
    pub fn with_groups<I, S>(self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: HashSet<String> = groups.into_iter().map(Into::into).collect();
        Self {
            groups: OnceCell::new_with(Some(set)),
            ..self
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    #[must_use]
    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    #[must_use]
    pub fn has_directory(&self) -> bool {
        self.directory.is_some()
    }

    /// Returns the group set, resolving it on first call.
    pub async fn groups(&self) -> &HashSet<String> {
        self.groups
            .get_or_init(|| async {
                match &self.directory {
                    Some(directory) => directory.resolve_groups(&self.user_id, &self.cancel).await,
                    None => HashSet::new(),
                }
            })
            .await
    }

    /// Returns the group set only if it was already resolved.
    #[must_use]
    pub fn resolved_groups(&self) -> Option<&HashSet<String>> {
        self.groups.get()
    }

    pub async fn is_member_of(&self, group_id: &str) -> bool {
        self.groups().await.contains(group_id)
    }

    /// Looks up the caller's directory profile. Not cached.
    pub async fn profile(&self) -> Option<UserProfile> {
        let directory = self.directory.as_ref()?;
        directory.resolve_profile(&self.user_id, &self.cancel).await
    }
}

impl std::fmt::Debug for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Principal")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("tenant_id", &self.tenant_id)
            .field("has_directory", &self.directory.is_some())
            .field("groups", &self.groups.get())
            .finish()
    }
}
