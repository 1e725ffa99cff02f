use crate::auth::Principal;
use crate::error::{Error, Result};
use crate::types::{MemorySource, ScopeId, filter_scope_ids};

use super::gate::ChatParticipantGate;

/// Decides whether a principal may act on a set of scope ids.
///
/// A single scope id is admitted when it is the global wildcard, the
/// principal's own user id, one of the principal's groups, or a chat the
/// principal participates in, checked in that order.
///
/// Malformed ids are dropped before evaluation. A request that is empty
/// after dropping them is rejected with [`Error::EmptyScopeSet`] by both
/// [`ScopeAuthorizer::all`] and [`ScopeAuthorizer::any`] rather than being
/// vacuously admitted or denied.
#[derive(Clone)]
pub struct ScopeAuthorizer {
    gate: ChatParticipantGate,
}

impl ScopeAuthorizer {
    pub fn new(gate: ChatParticipantGate) -> Self {
        Self { gate }
    }

    /// Same as [`ScopeAuthorizer::all`].
    pub async fn is_authorized<I, S>(&self, principal: &Principal, requested: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.all(principal, requested).await
    }

    /// True iff every requested scope id is admitted.
    pub async fn all<I, S>(&self, principal: &Principal, requested: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scope_ids = prepare(principal, requested)?;
        for scope in &scope_ids {
            if !self.is_in_scope(principal, scope).await {
                tracing::debug!(user_id = principal.user_id(), scope = %scope, "scope denied");
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// True iff at least one requested scope id is admitted.
    pub async fn any<I, S>(&self, principal: &Principal, requested: I) -> Result<bool>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let scope_ids = prepare(principal, requested)?;
        for scope in &scope_ids {
            if self.is_in_scope(principal, scope).await {
                return Ok(true);
            }
        }
        tracing::debug!(user_id = principal.user_id(), "no requested scope admitted");
        Ok(false)
    }

    /// Evaluates a single, already validated scope id.
    pub async fn is_in_scope(&self, principal: &Principal, scope: &ScopeId) -> bool {
        if scope.is_global() || scope.as_str() == principal.user_id() {
            return true;
        }

        if principal.is_member_of(scope.as_str()).await {
            return true;
        }

        self.gate
            .is_participant(principal.user_id(), scope.as_str(), principal.cancellation())
            .await
    }

    /// A memory source is visible when any of its scopes admits the principal.
    /// Sources without scopes are never visible.
    pub async fn is_visible(&self, principal: &Principal, source: &MemorySource) -> Result<bool> {
        if source.scope_ids.is_empty() {
            return Ok(false);
        }
        self.any(principal, &source.scope_ids).await
    }
}

fn prepare<I, S>(principal: &Principal, requested: I) -> Result<Vec<ScopeId>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    if principal.user_id().trim().is_empty() {
        return Err(Error::IdentityMissing);
    }

    let scope_ids = filter_scope_ids(requested);
    if scope_ids.is_empty() {
        return Err(Error::EmptyScopeSet);
    }
    Ok(scope_ids)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;

    use super::*;
    use crate::authz::ParticipantRoster;
    use crate::directory::{Directory, DirectoryClient, UserProfile};
    use crate::types::{GLOBAL_SCOPE, SourceType};

    struct Roster {
        memberships: HashSet<(String, String)>,
        calls: AtomicUsize,
    }

    impl Roster {
        fn new(memberships: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                memberships: memberships
                    .iter()
                    .map(|(u, c)| (u.to_string(), c.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ParticipantRoster for Roster {
        async fn is_user_in_chat(&self, user_id: &str, chat_id: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .memberships
                .contains(&(user_id.to_string(), chat_id.to_string())))
        }
    }

    struct GroupsDirectory {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Directory for GroupsDirectory {
        async fn resolve_groups(&self, _user_id: &str) -> Result<HashSet<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(HashSet::from(["g1".to_string()]))
        }

        async fn resolve_profile(&self, _user_id: &str) -> Result<UserProfile> {
            Err(Error::NotFound)
        }
    }

    fn authorizer(roster: Arc<Roster>) -> ScopeAuthorizer {
        ScopeAuthorizer::new(ChatParticipantGate::new(roster))
    }

    fn source(scope_ids: &[&str]) -> MemorySource {
        MemorySource {
            id: "src-1".to_string(),
            scope_ids: scope_ids.iter().filter_map(|s| ScopeId::parse(s)).collect(),
            name: "doc.txt".to_string(),
            created_by: "someone".to_string(),
            source_type: SourceType::File,
            size_bytes: 10,
            external_link: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_wildcard_admits_any_principal() {
        let authz = authorizer(Roster::new(&[]));
        let principal = Principal::new("u1", "Ada", None);
        assert!(authz.is_authorized(&principal, [GLOBAL_SCOPE]).await.unwrap());
        assert!(authz.any(&principal, ["chat-x", GLOBAL_SCOPE]).await.unwrap());
    }

    #[tokio::test]
    async fn test_own_user_id_admitted() {
        let authz = authorizer(Roster::new(&[]));
        let principal = Principal::new("u1", "Ada", None);
        assert!(authz.is_authorized(&principal, ["u1"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_group_admitted_and_resolved_lazily() {
        let roster = Roster::new(&[]);
        let authz = authorizer(roster.clone());
        let directory = Arc::new(GroupsDirectory {
            calls: AtomicUsize::new(0),
        });
        let principal = Principal::new("u1", "Ada", Some("t1".to_string()))
            .with_directory(DirectoryClient::new(directory.clone()));

        assert!(authz.is_authorized(&principal, ["u1", GLOBAL_SCOPE]).await.unwrap());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 0);

        assert!(authz.is_authorized(&principal, ["g1"]).await.unwrap());
        assert!(authz.is_authorized(&principal, ["g1", "u1"]).await.unwrap());
        assert_eq!(directory.calls.load(Ordering::SeqCst), 1);
        assert_eq!(roster.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_chat_scope_defers_to_roster() {
        let roster = Roster::new(&[("u1", "chat-1")]);
        let authz = authorizer(roster.clone());
        let principal = Principal::new("u1", "Ada", None);

        assert!(authz.is_authorized(&principal, ["chat-1"]).await.unwrap());
        assert!(!authz.is_authorized(&principal, ["chat-2"]).await.unwrap());
        assert!(!authz.all(&principal, ["chat-1", "chat-2"]).await.unwrap());
        assert!(authz.any(&principal, ["chat-2", "chat-1"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_identity_fails_before_evaluation() {
        let roster = Roster::new(&[]);
        let authz = authorizer(roster.clone());
        let principal = Principal::new("", "Nobody", None);

        let err = authz.all(&principal, [GLOBAL_SCOPE]).await.unwrap_err();
        assert!(matches!(err, Error::IdentityMissing));
        let err = authz.any(&principal, Vec::<String>::new()).await.unwrap_err();
        assert!(matches!(err, Error::IdentityMissing));
        assert_eq!(roster.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_ids_filtered() {
        let authz = authorizer(Roster::new(&[]));
        let principal = Principal::new("u1", "Ada", None);

        assert!(authz.all(&principal, ["", "u1", "  "]).await.unwrap());

        let err = authz.all(&principal, ["", " ", "\t"]).await.unwrap_err();
        assert!(matches!(err, Error::EmptyScopeSet));
        let err = authz.any(&principal, [""]).await.unwrap_err();
        assert!(matches!(err, Error::EmptyScopeSet));
    }

    #[tokio::test]
    async fn test_visibility() {
        let authz = authorizer(Roster::new(&[("u1", "chat-1")]));
        let principal = Principal::new("u1", "Ada", None).with_groups(["g1"]);

        assert!(authz.is_visible(&principal, &source(&[GLOBAL_SCOPE])).await.unwrap());
        assert!(authz.is_visible(&principal, &source(&["other", "u1"])).await.unwrap());
        assert!(authz.is_visible(&principal, &source(&["g1"])).await.unwrap());
        assert!(authz.is_visible(&principal, &source(&["chat-1"])).await.unwrap());
        assert!(!authz.is_visible(&principal, &source(&["g2", "chat-2"])).await.unwrap());
        assert!(!authz.is_visible(&principal, &source(&[])).await.unwrap());
    }
}
