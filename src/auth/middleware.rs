use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::Principal;
use crate::directory::{DirectoryClient, GraphDirectory};
use crate::error::Error;
use crate::server::AppState;

/// Header carrying the caller's directory token.
pub const DIRECTORY_TOKEN_HEADER: &str = "x-sk-copilot-graph-auth";

/// Extractor that requires a verified bearer token and yields the caller.
///
/// Directory group enrichment is wired in only when the token carries a
/// tenant id and the request supplies a directory token.
pub struct AuthPrincipal(pub Principal);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    IdentityMissing,
    NameMissing,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingAuth => "Authentication required",
            AuthError::InvalidScheme => "Invalid authorization scheme",
            AuthError::InvalidToken => "Invalid token",
            AuthError::IdentityMissing => "User id was not present in the request token",
            AuthError::NameMissing => "User name was not present in the request token",
        };

        let body = json!({ "data": null, "error": message });

        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response.headers_mut().insert(
            WWW_AUTHENTICATE,
            HeaderValue::from_static("Bearer realm=\"scopegate\""),
        );
        response
    }
}

impl FromRequestParts<Arc<AppState>> for AuthPrincipal {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(AuthError::MissingAuth)?;
        let raw_token = bearer_token(header)?;

        let claims = state
            .verifier
            .verify(raw_token)
            .await
            .ok_or(AuthError::InvalidToken)?;

        let identity = claims.identity().map_err(|e| match e {
            Error::IdentityMissing => AuthError::IdentityMissing,
            _ => AuthError::NameMissing,
        })?;

        let directory_token = parts
            .headers
            .get(DIRECTORY_TOKEN_HEADER)
            .and_then(|h| h.to_str().ok())
            .filter(|t| !t.trim().is_empty());

        let enrich = identity.tenant_id.is_some() && directory_token.is_some();
        let mut principal = Principal::new(
            identity.user_id,
            identity.display_name,
            identity.tenant_id,
        )
        .with_cancellation(state.shutdown.child_token());

        if let (true, Some(token)) = (enrich, directory_token) {
            let graph = GraphDirectory::new(
                state.http.clone(),
                &state.config.directory_base_url,
                token,
            );
            let directory =
                DirectoryClient::new(Arc::new(graph)).with_timeout(state.config.directory_timeout());
            principal = principal.with_directory(directory);
        }

        tracing::debug!(
            user_id = principal.user_id(),
            enriched = principal.has_directory(),
            "authenticated request"
        );
        Ok(AuthPrincipal(principal))
    }
}

fn bearer_token(header: &str) -> Result<&str, AuthError> {
    let (scheme, token) = header.split_once(' ').ok_or(AuthError::InvalidScheme)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AuthError::InvalidScheme);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AuthError::InvalidToken);
    }
    Ok(token)
}
