use axum::Json;

use crate::auth::AuthPrincipal;
use crate::server::dto::MeResponse;
use crate::server::response::{ApiError, ApiResponse};

pub async fn get_me(
    AuthPrincipal(principal): AuthPrincipal,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let (groups, profile) = tokio::join!(principal.groups(), principal.profile());

    Ok(Json(ApiResponse::success(MeResponse {
        user_id: principal.user_id().to_string(),
        display_name: principal.display_name().to_string(),
        tenant_id: principal.tenant_id().map(str::to_string),
        directory_enabled: principal.has_directory(),
        groups: MeResponse::sorted_groups(groups),
        profile,
    })))
}
