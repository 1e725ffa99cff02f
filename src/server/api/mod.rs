pub mod access;
mod chats;
mod documents;
mod me;
mod memory_sources;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use crate::server::AppState;

pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/me", get(me::get_me))
        // Chats and rosters
        .route("/chats", post(chats::create_chat))
        .route(
            "/chats/{chat_id}/participants",
            get(chats::list_participants).post(chats::add_participant),
        )
        // Document import
        .route("/documents", post(documents::import_documents))
        .route(
            "/chats/{chat_id}/documents",
            post(documents::import_chat_documents),
        )
        // Memory sources
        .route("/memory-sources", get(memory_sources::list_memory_sources))
        .route(
            "/memory-sources/{id}",
            get(memory_sources::get_memory_source).delete(memory_sources::delete_memory_source),
        )
        .route(
            "/chats/{chat_id}/memory-sources",
            get(memory_sources::list_chat_memory_sources),
        )
}
