use std::path::Path;

use serde::Serialize;
use strum::{Display, EnumString};

use crate::errors::{LayerError, LayerResult};

/// Extensions accepted for single-file raster uploads.
pub const RASTER_EXTENSIONS: [&str; 4] = ["tif", "tiff", "geotif", "geotiff"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LayerType {
    Vector,
    Raster,
}

/// Lower-cased extension of `filename`, without the dot.
pub(crate) fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

/// Classifies an upload by its base file's extension, ignoring case.
pub fn layer_type(filename: &str) -> LayerResult<LayerType> {
    match extension_of(filename).as_deref() {
        Some("shp") => Ok(LayerType::Vector),
        Some(ext) if RASTER_EXTENSIONS.contains(&ext) => Ok(LayerType::Raster),
        _ => Err(LayerError::InvalidFileType(filename.to_string())),
    }
}
