use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, Path, State},
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::{AuthPrincipal, Principal};
use crate::ingest::IngestRequest;
use crate::server::AppState;
use crate::server::dto::{DocumentImportResponse, ImportedDocument};
use crate::server::response::{ApiError, ApiResponse};
use crate::server::validation::{UploadedFile, readable_bytes, sanitize_file_name, validate_upload};
use crate::types::{MemorySource, ScopeId, SourceType};

use super::access::require_all_scopes;

const FILES_FIELD: &str = "formFiles";
const SCOPES_FIELD: &str = "scopeIds";

#[derive(Debug, Default)]
struct ImportForm {
    scope_ids: Vec<String>,
    files: Vec<UploadedFile>,
}

async fn read_import_form(mut multipart: Multipart) -> Result<ImportForm, ApiError> {
    let mut form = ImportForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            SCOPES_FIELD => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid scope id: {e}")))?;
                form.scope_ids.push(value);
            }
            FILES_FIELD => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read {file_name}: {e}")))?;
                form.files.push(UploadedFile { file_name, content });
            }
            other => tracing::debug!("ignoring multipart field {other}"),
        }
    }

    Ok(form)
}

pub async fn import_documents(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<DocumentImportResponse>>, ApiError> {
    let form = read_import_form(multipart).await?;
    import(&state, &principal, form, None).await
}

pub async fn import_chat_documents(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<DocumentImportResponse>>, ApiError> {
    let form = read_import_form(multipart).await?;
    import(&state, &principal, form, Some(chat_id)).await
}

/// Validates the whole request before the first document is ingested. A
/// failure while ingesting fails the request: the remaining files are not
/// attempted and the ones already stored are removed again.
async fn import(
    state: &AppState,
    principal: &Principal,
    mut form: ImportForm,
    chat_id: Option<String>,
) -> Result<Json<ApiResponse<DocumentImportResponse>>, ApiError> {
    if let Some(chat_id) = chat_id {
        form.scope_ids.push(chat_id);
    }

    let scope_ids = require_all_scopes(state, principal, &form.scope_ids).await?;
    validate_upload(&form.files, &state.config, state.classifier.as_ref())?;

    tracing::info!(
        user_id = principal.user_id(),
        files = form.files.len(),
        "importing documents"
    );

    let mut documents: Vec<ImportedDocument> = Vec::with_capacity(form.files.len());
    for file in form.files {
        match import_file(state, principal, &scope_ids, file).await {
            Ok(document) => documents.push(document),
            Err(e) => {
                let stored: Vec<&str> = documents.iter().map(|d| d.id.as_str()).collect();
                roll_back(state, &stored).await;
                return Err(e);
            }
        }
    }

    Ok(Json(ApiResponse::success(DocumentImportResponse {
        scope_ids: scope_ids.into_iter().map(|s| s.into_string()).collect(),
        documents,
    })))
}

/// Ingests one file and records its memory source. On failure nothing of
/// this file is left behind.
async fn import_file(
    state: &AppState,
    principal: &Principal,
    scope_ids: &[ScopeId],
    file: UploadedFile,
) -> Result<ImportedDocument, ApiError> {
    let document_id = Uuid::new_v4().to_string();
    let file_name = sanitize_file_name(&file.file_name);
    let size_bytes = file.content.len() as u64;

    let request = IngestRequest {
        index_name: state.config.memory_index_name.clone(),
        document_id: document_id.clone(),
        scope_ids: scope_ids.to_vec(),
        created_by: principal.user_id().to_string(),
        memory_name: state.config.document_memory_name.clone(),
        file_name: file_name.clone(),
        content: file.content,
    };
    if let Err(e) = state.ingestion.store_document(request).await {
        tracing::error!(document_id = %document_id, "failed to store document {}: {e}", file.file_name);
        return Err(ApiError::internal(format!(
            "Failed to store document {}.",
            file.file_name
        )));
    }

    let source = MemorySource {
        id: document_id.clone(),
        scope_ids: scope_ids.to_vec(),
        name: file_name.clone(),
        created_by: principal.user_id().to_string(),
        source_type: SourceType::File,
        size_bytes: size_bytes as i64,
        external_link: None,
        created_at: Utc::now(),
    };
    if let Err(e) = state.store.create_memory_source(&source) {
        tracing::error!(document_id = %document_id, "failed to record memory source: {e}");
        roll_back(state, &[document_id.as_str()]).await;
        return Err(ApiError::internal(format!(
            "Failed to store document {}.",
            file.file_name
        )));
    }

    Ok(ImportedDocument {
        id: document_id,
        name: file_name,
        size: readable_bytes(size_bytes),
        is_uploaded: true,
    })
}

/// Undoes documents stored earlier in a failed request.
async fn roll_back(state: &AppState, document_ids: &[&str]) {
    for &document_id in document_ids {
        if let Err(e) = state.store.delete_memory_source(document_id) {
            tracing::warn!(document_id, "failed to roll back memory source: {e}");
        }
        if let Err(e) = state
            .ingestion
            .remove_document(&state.config.memory_index_name, document_id)
            .await
        {
            tracing::warn!(document_id, "failed to roll back document: {e}");
        }
    }
}
