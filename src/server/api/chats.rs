use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::AuthPrincipal;
use crate::server::AppState;
use crate::server::dto::{AddParticipantRequest, ChatResponse, CreateChatRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_chat_title;
use crate::types::{Chat, ChatParticipant};

use super::access::require_all_scopes;

pub async fn create_chat(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateChatRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate_chat_title(&req.title)?;

    let now = Utc::now();
    let chat = Chat {
        id: Uuid::new_v4().to_string(),
        title: req.title.trim().to_string(),
        created_at: now,
    };
    state
        .store
        .create_chat(&chat)
        .api_err("Failed to create chat")?;

    let owner = ChatParticipant {
        chat_id: chat.id.clone(),
        user_id: principal.user_id().to_string(),
        joined_at: now,
    };
    state
        .store
        .add_participant(&owner)
        .api_err("Failed to add participant")?;

    tracing::info!(chat_id = %chat.id, user_id = principal.user_id(), "created chat");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(ChatResponse {
            chat,
            participants: vec![owner],
        })),
    ))
}

pub async fn list_participants(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    require_all_scopes(&state, &principal, &[chat_id.as_str()]).await?;

    let chat = state
        .store
        .get_chat(&chat_id)
        .api_err("Failed to get chat")?
        .or_not_found("Chat not found")?;
    let participants = state
        .store
        .list_participants(&chat.id)
        .api_err("Failed to list participants")?;

    Ok(Json(ApiResponse::success(ChatResponse { chat, participants })))
}

pub async fn add_participant(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    Json(req): Json<AddParticipantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let is_member = state
        .store
        .is_user_in_chat(principal.user_id(), &chat_id)
        .api_err("Failed to check participants")?;
    if !is_member {
        return Err(ApiError::forbidden("User is not a participant of this chat."));
    }

    let user_id = req.user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::bad_request("user_id cannot be empty"));
    }

    let participant = ChatParticipant {
        chat_id,
        user_id: user_id.to_string(),
        joined_at: Utc::now(),
    };
    let added = state
        .store
        .add_participant(&participant)
        .api_err("Failed to add participant")?;

    let status = if added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(ApiResponse::success(participant))))
}
