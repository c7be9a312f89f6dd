use once_cell::sync::Lazy;
use regex::Regex;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::Value;

use crate::database::entities::layers;
use crate::errors::{LayerError, LayerResult};

/// A leading run that cannot start an XML name, or any later run of unsafe characters.
static XML_UNSAFE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^[^a-zA-Z._]+)|([^a-zA-Z._0-9]+)").expect("valid regex"));

/// Where a layer name comes from.
#[derive(Clone, Debug)]
pub enum LayerNameSource {
    Name(String),
    Layer(layers::Model),
}

impl LayerNameSource {
    fn name(&self) -> &str {
        match self {
            LayerNameSource::Name(name) => name,
            LayerNameSource::Layer(layer) => &layer.name,
        }
    }
}

impl From<&str> for LayerNameSource {
    fn from(name: &str) -> Self {
        LayerNameSource::Name(name.to_string())
    }
}

impl From<String> for LayerNameSource {
    fn from(name: String) -> Self {
        LayerNameSource::Name(name)
    }
}

impl From<layers::Model> for LayerNameSource {
    fn from(layer: layers::Model) -> Self {
        LayerNameSource::Layer(layer)
    }
}

/// Only JSON strings name a layer.
impl TryFrom<&Value> for LayerNameSource {
    type Error = LayerError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::String(name) => Ok(LayerNameSource::Name(name.clone())),
            other => Err(LayerError::InvalidLayerName(format!(
                "expected a string or a layer, got {}",
                other
            ))),
        }
    }
}

/// Replaces characters that are not valid in an XML name with `_`.
pub fn sanitize_name(name: &str) -> String {
    XML_UNSAFE.replace_all(name, "_").into_owned()
}

/// A sanitized version of `name` that no existing layer uses yet.
///
/// Collisions get `_1`, `_2`, ... appended until the name is free. Nothing is
/// reserved, so asking twice gives the same answer.
pub async fn get_valid_name<C: ConnectionTrait>(db: &C, name: &str) -> LayerResult<String> {
    let xml_name = sanitize_name(name);
    let mut proposed = xml_name.clone();
    let mut count = 1;
    while name_taken(db, &proposed).await? {
        proposed = format!("{}_{}", xml_name, count);
        count += 1;
    }
    Ok(proposed)
}

/// Name to register a layer under; with `overwrite` the existing name is kept as is.
pub async fn get_valid_layer_name<C, S>(db: &C, source: S, overwrite: bool) -> LayerResult<String>
where
    C: ConnectionTrait,
    S: Into<LayerNameSource>,
{
    let source = source.into();
    if overwrite {
        Ok(source.name().to_string())
    } else {
        get_valid_name(db, source.name()).await
    }
}

async fn name_taken<C: ConnectionTrait>(db: &C, name: &str) -> LayerResult<bool> {
    let count = layers::Entity::find()
        .filter(layers::Column::Name.eq(name))
        .count(db)
        .await?;
    Ok(count > 0)
}
