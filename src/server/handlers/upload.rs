use std::str::FromStr;

use axum::{
    extract::{Multipart, State},
    http::Uri,
    response::Json,
};
use serde_json::{json, Value};
use strum::IntoEnumIterator;
use tracing::{debug, info};

use crate::errors::ValidationError;
use crate::server::app::AppState;
use crate::server::error::ApiError;
use crate::server::handlers::layers::require_login;
use crate::server::session::CurrentUser;
use crate::services::{LayerService, NewLayer, PermSpec};
use crate::upload::{
    get_files, get_valid_layer_name, layer_type::RASTER_EXTENSIONS, FileField, LayerUploadForm,
    UploadedFile,
};

/// Workspace uploaded layers are published in.
pub const UPLOAD_WORKSPACE: &str = "geonode";

#[utoipa::path(
    get,
    path = "/layers/upload",
    responses(
        (status = 200, description = "Description of the upload form"),
        (status = 302, description = "Login required")
    )
)]
pub async fn upload_form(current: CurrentUser, uri: Uri) -> Result<Json<Value>, ApiError> {
    require_login(&current, &uri)?;

    let file_fields: Vec<String> = FileField::iter().map(|f| f.to_string()).collect();
    Ok(Json(json!({
        "file_fields": file_fields,
        "text_fields": ["layer_title", "abstract", "charset", "permissions"],
        "accepted": {
            "shapefile": ["shp", "dbf", "shx", "prj", "xml", "sld"],
            "geotiff": RASTER_EXTENSIONS,
        },
    })))
}

#[utoipa::path(
    post,
    path = "/layers/upload",
    responses(
        (status = 200, description = "Layer created"),
        (status = 302, description = "Login required"),
        (status = 400, description = "Form errors")
    )
)]
pub async fn upload_layer(
    State(state): State<AppState>,
    current: CurrentUser,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    let user = require_login(&current, &uri)?;

    let mut form = LayerUploadForm::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ValidationError::new(format!("Malformed upload: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match FileField::from_str(&name) {
            Ok(file_field) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| ValidationError::field(name.as_str(), e.to_string()))?;
                form.set_file(file_field, UploadedFile::new(file_name, content.to_vec()));
            }
            Err(_) => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ValidationError::field(name.as_str(), e.to_string()))?;
                form.set_text(&name, value)?;
            }
        }
    }

    let cleaned = form.clean()?;
    let spec = cleaned
        .permissions
        .clone()
        .map(PermSpec::from_json)
        .transpose()?;

    let (dir, base_path) = match &state.settings.upload_dir {
        Some(parent) => form.write_files_in(parent)?,
        None => form.write_files()?,
    };
    let files = get_files(&base_path)?;
    debug!("Upload of {} grouped into {:?}", cleaned.base_name, files.keys());

    let name = get_valid_layer_name(&state.db, cleaned.base_name.as_str(), false).await?;
    let layer = LayerService::new(state.db.clone())
        .create_layer(NewLayer {
            name,
            workspace: UPLOAD_WORKSPACE.to_string(),
            title: cleaned.title,
            abstract_text: cleaned.abstract_text,
            storetype: cleaned.layer_type,
            charset: cleaned.charset,
            owner_id: user.id,
            permissions: spec,
        })
        .await?;

    if state.settings.upload_dir.is_some() {
        let kept = dir.into_path();
        info!("Kept upload of {} in {}", layer.typename, kept.display());
    }

    info!("{} uploaded layer {}", user.username, layer.typename);
    Ok(Json(json!({
        "success": true,
        "url": format!("/layers/{}", layer.typename),
        "files": files.keys().collect::<Vec<_>>(),
    })))
}
