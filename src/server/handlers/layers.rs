use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    http::Uri,
    response::{IntoResponse, Json, Response},
};
use sea_orm::EntityTrait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::database::entities::{attributes, layers, styles, topic_categories, users};
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::session::{found, CurrentUser};
use crate::services::{
    AttributeConfig, CategoryService, LayerService, MetadataUpdate, Permission, PermissionService,
};

#[derive(Serialize)]
pub struct LayerDetail {
    #[serde(flatten)]
    pub layer: layers::Model,
    pub category: Option<topic_categories::Model>,
    pub keywords: Vec<String>,
    pub default_style: Option<styles::Model>,
    pub styles: Vec<styles::Model>,
    pub attributes: Vec<attributes::Model>,
    pub attribute_config: AttributeConfig,
    /// What the caller may do with this layer.
    pub permissions: BTreeSet<Permission>,
}

/// The caller, which must be logged in; visitors are sent to the login page.
pub(crate) fn require_login<'a>(current: &'a CurrentUser, uri: &Uri) -> Result<&'a users::Model, ApiError> {
    current.user().ok_or_else(|| ApiError::login_required(uri.path()))
}

/// Loads the layer and checks that `user` holds `permission` on it.
///
/// Unknown layers are a 404; a missing permission sends the caller to log in
/// as someone who has it.
async fn resolve_layer(
    state: &AppState,
    user: &users::Model,
    typename: &str,
    permission: Permission,
    uri: &Uri,
) -> Result<layers::Model, ApiError> {
    let layer = LayerService::new(state.db.clone()).get_by_typename(typename).await?;
    let allowed = PermissionService::new(state.db.clone())
        .has_perm(user, permission, &layer)
        .await?;
    if !allowed {
        info!("{} lacks {} on {}", user.username, permission, layer.typename);
        return Err(ApiError::login_required(uri.path()));
    }
    Ok(layer)
}

#[utoipa::path(
    get,
    path = "/layers/",
    responses(
        (status = 200, description = "Layers the caller may view")
    )
)]
pub async fn browse_layers(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<layers::Model>>, ApiError> {
    let user = current.or_anonymous(&state).await?;
    let permissions = PermissionService::new(state.db.clone());

    let mut visible = Vec::new();
    for layer in LayerService::new(state.db.clone()).list_layers().await? {
        if permissions.has_perm(&user, Permission::ViewResourcebase, &layer).await? {
            visible.push(layer);
        }
    }
    Ok(Json(visible))
}

#[utoipa::path(
    get,
    path = "/layers/{typename}",
    params(
        ("typename" = String, Path, description = "Layer typename, e.g. geonode:CA")
    ),
    responses(
        (status = 200, description = "Layer detail"),
        (status = 302, description = "Caller may not view the layer"),
        (status = 404, description = "Layer not found")
    )
)]
pub async fn layer_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(typename): Path<String>,
    uri: Uri,
) -> Result<Json<LayerDetail>, ApiError> {
    let user = current.or_anonymous(&state).await?;
    let layer = resolve_layer(&state, &user, &typename, Permission::ViewResourcebase, &uri).await?;

    let service = LayerService::new(state.db.clone());
    let category = match layer.category_id {
        Some(id) => topic_categories::Entity::find_by_id(id).one(&state.db).await?,
        None => None,
    };
    let permissions = PermissionService::new(state.db.clone())
        .user_permissions(&user, &layer)
        .await?;

    Ok(Json(LayerDetail {
        category,
        keywords: service.keyword_list(layer.id).await?,
        default_style: service.default_style(&layer).await?,
        styles: service.styles(layer.id).await?,
        attributes: service.visible_attributes(layer.id).await?,
        attribute_config: service.attribute_config(layer.id).await?,
        permissions,
        layer,
    }))
}

#[utoipa::path(
    get,
    path = "/layers/{typename}/metadata",
    params(
        ("typename" = String, Path, description = "Layer typename")
    ),
    responses(
        (status = 200, description = "Editable metadata of the layer"),
        (status = 302, description = "Login required"),
        (status = 404, description = "Layer not found")
    )
)]
pub async fn layer_metadata(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(typename): Path<String>,
    uri: Uri,
) -> Result<Json<Value>, ApiError> {
    let user = require_login(&current, &uri)?;
    let layer = resolve_layer(&state, user, &typename, Permission::ChangeResourcebaseMetadata, &uri).await?;

    let keywords = LayerService::new(state.db.clone()).keyword_list(layer.id).await?;
    let categories = CategoryService::new(state.db.clone()).category_counts().await?;

    Ok(Json(json!({
        "layer": layer,
        "keywords": keywords,
        "categories": categories,
    })))
}

#[utoipa::path(
    post,
    path = "/layers/{typename}/metadata",
    params(
        ("typename" = String, Path, description = "Layer typename")
    ),
    request_body = MetadataUpdate,
    responses(
        (status = 200, description = "Metadata saved"),
        (status = 302, description = "Login required"),
        (status = 404, description = "Layer or category not found")
    )
)]
pub async fn update_layer_metadata(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(typename): Path<String>,
    uri: Uri,
    Json(update): Json<MetadataUpdate>,
) -> Result<Json<layers::Model>, ApiError> {
    let user = require_login(&current, &uri)?;
    let layer = resolve_layer(&state, user, &typename, Permission::ChangeResourcebaseMetadata, &uri).await?;

    let layer = LayerService::new(state.db.clone())
        .update_metadata(layer.id, update)
        .await?;
    info!("{} updated metadata of {}", user.username, layer.typename);
    Ok(Json(layer))
}

#[utoipa::path(
    get,
    path = "/layers/{typename}/remove",
    params(
        ("typename" = String, Path, description = "Layer typename")
    ),
    responses(
        (status = 200, description = "Removal confirmation"),
        (status = 302, description = "Login required"),
        (status = 404, description = "Layer not found")
    )
)]
pub async fn remove_confirmation(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(typename): Path<String>,
    uri: Uri,
) -> Result<Json<Value>, ApiError> {
    let user = require_login(&current, &uri)?;
    let layer = resolve_layer(&state, user, &typename, Permission::DeleteResourcebase, &uri).await?;

    Ok(Json(json!({
        "typename": layer.typename,
        "title": layer.title,
        "message": format!("Are you sure you want to remove {}?", layer.title),
    })))
}

#[utoipa::path(
    post,
    path = "/layers/{typename}/remove",
    params(
        ("typename" = String, Path, description = "Layer typename")
    ),
    responses(
        (status = 302, description = "Layer removed, redirect to the layer list; or login required"),
        (status = 404, description = "Layer not found")
    )
)]
pub async fn remove_layer(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(typename): Path<String>,
    uri: Uri,
) -> Result<Response, ApiError> {
    let user = require_login(&current, &uri)?;
    let layer = resolve_layer(&state, user, &typename, Permission::DeleteResourcebase, &uri).await?;

    LayerService::new(state.db.clone()).delete_layer(layer.id).await?;
    info!("{} removed layer {}", user.username, layer.typename);
    Ok(found(&state.settings.layers_url()))
}

/// Any method other than GET or POST on the remove route.
pub async fn remove_not_allowed() -> Response {
    ApiError::Forbidden("Only GET and POST are allowed here".to_string()).into_response()
}
