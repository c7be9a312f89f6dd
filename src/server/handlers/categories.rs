use axum::{extract::State, response::Json};

use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::services::{CategoryCount, CategoryService};

#[utoipa::path(
    get,
    path = "/categories",
    responses(
        (status = 200, description = "Topic categories with their layer counts", body = [CategoryCount])
    )
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    let counts = CategoryService::new(state.db.clone()).category_counts().await?;
    Ok(Json(counts))
}
