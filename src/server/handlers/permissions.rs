use axum::{
    body::Bytes,
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use tracing::info;

use crate::errors::ValidationError;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::CurrentUser;
use crate::services::{LayerService, PermSpec, Permission, PermissionService};

#[utoipa::path(
    get,
    path = "/security/permissions/{resource_id}",
    params(
        ("resource_id" = i32, Path, description = "Layer id")
    ),
    responses(
        (status = 200, description = "Current grants on the layer"),
        (status = 404, description = "Layer not found")
    )
)]
pub async fn get_permissions(
    State(state): State<AppState>,
    Path(resource_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    let layer = LayerService::new(state.db.clone()).get_layer(resource_id).await?;
    let spec = PermissionService::new(state.db.clone())
        .get_all_level_info(&layer)
        .await?;
    Ok(Json(json!({ "permissions": spec })))
}

#[utoipa::path(
    post,
    path = "/security/permissions/{resource_id}",
    params(
        ("resource_id" = i32, Path, description = "Layer id")
    ),
    responses(
        (status = 200, description = "Grants replaced"),
        (status = 400, description = "Malformed permission spec"),
        (status = 401, description = "Not logged in, or not allowed to manage permissions"),
        (status = 404, description = "Layer not found")
    )
)]
pub async fn set_permissions(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(resource_id): Path<i32>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let layer = LayerService::new(state.db.clone()).get_layer(resource_id).await?;

    let user = current
        .user()
        .ok_or_else(|| ApiError::unauthorized("You are not allowed to change permissions for this resource"))?;
    let service = PermissionService::new(state.db.clone());
    if !service
        .has_perm(user, Permission::ChangeResourcebasePermissions, &layer)
        .await?
    {
        return Err(ApiError::unauthorized(
            "You are not allowed to change permissions for this resource",
        ));
    }

    let spec: PermSpec = serde_json::from_slice(&body)
        .map_err(|e| ValidationError::field("permissions", format!("Invalid JSON: {}", e)))?;
    service.set_permissions(&layer, &spec).await?;

    info!("{} changed permissions of {}", user.username, layer.typename);
    Ok(Json(json!({ "success": true })))
}
