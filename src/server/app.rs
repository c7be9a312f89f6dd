use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    response::Json,
    routing::{get, post},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;

use super::handlers::{account, categories, health, layers, permissions, upload};
use crate::config::Settings;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub settings: Arc<Settings>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        layers::browse_layers,
        layers::layer_detail,
        layers::layer_metadata,
        layers::update_layer_metadata,
        layers::remove_confirmation,
        layers::remove_layer,
        upload::upload_form,
        upload::upload_layer,
        permissions::get_permissions,
        permissions::set_permissions,
        categories::list_categories,
        account::login,
        account::logout,
    ),
    components(schemas(
        crate::services::CategoryCount,
        crate::services::MetadataUpdate,
        account::LoginRequest,
    ))
)]
pub struct ApiDoc;

pub async fn create_app(db: DatabaseConnection, settings: Settings) -> Result<Router> {
    let cors = match settings.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<axum::http::HeaderValue>()
                    .with_context(|| format!("invalid CORS origin {}", origin))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let state = AppState {
        db,
        settings: Arc::new(settings),
    };

    let app = Router::new()
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        .merge(layer_routes())
        .route(
            "/security/permissions/:resource_id",
            get(permissions::get_permissions).post(permissions::set_permissions),
        )
        .route("/categories", get(categories::list_categories))
        .route("/account/login", post(account::login))
        .route("/account/login/", get(account::login_page).post(account::login))
        .route("/account/logout", post(account::logout))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

fn layer_routes() -> Router<AppState> {
    Router::new()
        .route("/layers/", get(layers::browse_layers))
        .route(
            "/layers/upload",
            get(upload::upload_form).post(upload::upload_layer),
        )
        .route("/layers/:typename", get(layers::layer_detail))
        .route(
            "/layers/:typename/metadata",
            get(layers::layer_metadata).post(layers::update_layer_metadata),
        )
        .route(
            "/layers/:typename/remove",
            get(layers::remove_confirmation)
                .post(layers::remove_layer)
                .fallback(layers::remove_not_allowed),
        )
}
