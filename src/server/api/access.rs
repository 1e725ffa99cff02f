use crate::auth::Principal;
use crate::server::AppState;
use crate::server::response::{ApiError, StoreOptionExt, StoreResultExt};
use crate::types::{MemorySource, ScopeId, filter_scope_ids};

pub const SCOPE_DENIED: &str = "User does not have access to the requested scopes.";

/// Requires the principal to hold every requested scope. Returns the
/// well-formed scope ids in request order.
pub async fn require_all_scopes<S: AsRef<str>>(
    state: &AppState,
    principal: &Principal,
    requested: &[S],
) -> Result<Vec<ScopeId>, ApiError> {
    if !state.authorizer.all(principal, requested).await? {
        tracing::info!(user_id = principal.user_id(), "scope check denied");
        return Err(ApiError::forbidden(SCOPE_DENIED));
    }
    Ok(filter_scope_ids(requested))
}

/// Loads a memory source the principal may see. Invisible sources are
/// reported as missing.
pub async fn require_visible_source(
    state: &AppState,
    principal: &Principal,
    id: &str,
) -> Result<MemorySource, ApiError> {
    let source = state
        .store
        .get_memory_source(id)
        .api_err("Failed to get memory source")?
        .or_not_found("Memory source not found")?;

    if !state.authorizer.is_visible(principal, &source).await? {
        return Err(ApiError::not_found("Memory source not found"));
    }
    Ok(source)
}
