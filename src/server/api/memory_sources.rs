use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::auth::AuthPrincipal;
use crate::server::AppState;
use crate::server::dto::{MemorySourceListResponse, MemorySourceQuery};
use crate::server::response::{ApiError, ApiResponse, StoreResultExt};

use super::access::{require_all_scopes, require_visible_source};

pub async fn list_memory_sources(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MemorySourceQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let scope_ids = require_all_scopes(&state, &principal, &query.scope_list()).await?;

    let sources = state
        .store
        .find_by_scope_ids(&scope_ids, query.include_global)
        .api_err("Failed to list memory sources")?;

    Ok(Json(ApiResponse::success(MemorySourceListResponse { sources })))
}

pub async fn list_chat_memory_sources(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_all_scopes(&state, &principal, &[chat_id.as_str()]).await?;

    let sources = state
        .store
        .find_by_chat_id(&chat_id)
        .api_err("Failed to list memory sources")?;

    Ok(Json(ApiResponse::success(MemorySourceListResponse { sources })))
}

pub async fn get_memory_source(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let source = require_visible_source(&state, &principal, &id).await?;
    Ok(Json(ApiResponse::success(source)))
}

pub async fn delete_memory_source(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let source = require_visible_source(&state, &principal, &id).await?;

    if source.created_by != principal.user_id() {
        return Err(ApiError::forbidden(
            "Only the creator can delete a memory source.",
        ));
    }

    state
        .store
        .delete_memory_source(&source.id)
        .api_err("Failed to delete memory source")?;

    if let Err(e) = state
        .ingestion
        .remove_document(&state.config.memory_index_name, &source.id)
        .await
    {
        tracing::warn!(source_id = %source.id, "failed to remove ingested document: {e}");
    }

    tracing::info!(source_id = %source.id, user_id = principal.user_id(), "deleted memory source");
    Ok(StatusCode::NO_CONTENT)
}
