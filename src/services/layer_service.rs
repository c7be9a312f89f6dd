use std::collections::BTreeSet;

use indexmap::IndexMap;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::database::entities::{
    attributes, layer_keywords, layer_styles, layers, ratings, styles, topic_categories,
};
use crate::errors::{LayerError, LayerResult};
use crate::services::permission_service::{self, PermSpec};
use crate::upload::LayerType;

/// Everything needed to register a new layer.
#[derive(Clone, Debug)]
pub struct NewLayer {
    pub name: String,
    pub workspace: String,
    pub title: Option<String>,
    pub abstract_text: Option<String>,
    pub storetype: LayerType,
    pub charset: String,
    pub owner_id: i32,
    /// Applied on top of the owner's grants instead of the public defaults.
    pub permissions: Option<PermSpec>,
}

/// Partial metadata edit; `None` leaves the field untouched.
#[derive(Clone, Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct MetadataUpdate {
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    /// Topic category identifier, e.g. `location`.
    pub category: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// Feature-info configuration derived from the visible attributes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AttributeConfig {
    #[serde(rename = "getFeatureInfo", skip_serializing_if = "Option::is_none")]
    pub get_feature_info: Option<FeatureInfoConfig>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureInfoConfig {
    pub fields: Vec<String>,
    #[serde(rename = "propertyNames")]
    pub property_names: IndexMap<String, Option<String>>,
}

#[derive(Clone)]
pub struct LayerService {
    db: DatabaseConnection,
}

impl LayerService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list_layers(&self) -> LayerResult<Vec<layers::Model>> {
        Ok(layers::Entity::find()
            .order_by_asc(layers::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn get_layer(&self, id: i32) -> LayerResult<layers::Model> {
        layers::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LayerError::not_found("layer", id))
    }

    pub async fn get_by_typename(&self, typename: &str) -> LayerResult<layers::Model> {
        layers::Entity::find()
            .filter(layers::Column::Typename.eq(typename))
            .one(&self.db)
            .await?
            .ok_or_else(|| LayerError::not_found("layer", typename))
    }

    pub async fn find_by_name(&self, name: &str) -> LayerResult<Option<layers::Model>> {
        Ok(layers::Entity::find()
            .filter(layers::Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    /// Inserts the layer together with its permissions in one transaction.
    ///
    /// Without a permission spec the layer gets the default permissions. A spec
    /// naming unknown principals or permissions fails before anything is written.
    pub async fn create_layer(&self, new_layer: NewLayer) -> LayerResult<layers::Model> {
        let grants = match &new_layer.permissions {
            Some(spec) => Some(permission_service::resolve_grants(&self.db, spec).await?),
            None => None,
        };

        let txn = self.db.begin().await?;

        let mut model = layers::ActiveModel::new(
            &new_layer.workspace,
            &new_layer.name,
            &new_layer.storetype.to_string(),
            new_layer.owner_id,
        );
        if let Some(title) = new_layer.title.filter(|t| !t.trim().is_empty()) {
            model.title = Set(title);
        }
        model.abstract_text = Set(new_layer.abstract_text);
        model.charset = Set(new_layer.charset);

        let layer = model.insert(&txn).await?;
        match grants {
            Some(grants) => permission_service::apply_grants(&txn, &layer, grants).await?,
            None => permission_service::set_default_permissions(&txn, &layer).await?,
        }
        txn.commit().await?;

        info!("Created {} layer {}", layer.storetype, layer.typename);
        Ok(layer)
    }

    /// All attributes in display order.
    pub async fn attributes(&self, layer_id: i32) -> LayerResult<Vec<attributes::Model>> {
        Ok(attributes::Entity::find()
            .filter(attributes::Column::LayerId.eq(layer_id))
            .order_by_asc(attributes::Column::DisplayOrder)
            .order_by_asc(attributes::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn visible_attributes(&self, layer_id: i32) -> LayerResult<Vec<attributes::Model>> {
        Ok(attributes::Entity::find()
            .filter(attributes::Column::LayerId.eq(layer_id))
            .filter(attributes::Column::Visible.eq(true))
            .order_by_asc(attributes::Column::DisplayOrder)
            .order_by_asc(attributes::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn attribute_config(&self, layer_id: i32) -> LayerResult<AttributeConfig> {
        let visible = self.visible_attributes(layer_id).await?;
        if visible.is_empty() {
            return Ok(AttributeConfig::default());
        }

        let fields = visible.iter().map(|a| a.attribute.clone()).collect();
        let property_names = visible
            .into_iter()
            .map(|a| (a.attribute, a.attribute_label))
            .collect();

        Ok(AttributeConfig {
            get_feature_info: Some(FeatureInfoConfig {
                fields,
                property_names,
            }),
        })
    }

    /// Keywords in the order they were added.
    pub async fn keyword_list(&self, layer_id: i32) -> LayerResult<Vec<String>> {
        let keywords = layer_keywords::Entity::find()
            .filter(layer_keywords::Column::LayerId.eq(layer_id))
            .order_by_asc(layer_keywords::Column::Id)
            .all(&self.db)
            .await?;
        Ok(keywords.into_iter().map(|k| k.name).collect())
    }

    /// Appends the words the layer doesn't carry yet, in sorted order.
    pub async fn add_keywords<I, S>(&self, layer_id: i32, words: I) -> LayerResult<Vec<String>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let txn = self.db.begin().await?;
        insert_keywords(&txn, layer_id, words).await?;
        touch(&txn, layer_id).await?;
        txn.commit().await?;

        self.keyword_list(layer_id).await
    }

    /// Styles in the layer's style set.
    pub async fn styles(&self, layer_id: i32) -> LayerResult<Vec<styles::Model>> {
        let links = layer_styles::Entity::find()
            .filter(layer_styles::Column::LayerId.eq(layer_id))
            .all(&self.db)
            .await?;
        let style_ids: Vec<i32> = links.into_iter().map(|l| l.style_id).collect();
        if style_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(styles::Entity::find()
            .filter(styles::Column::Id.is_in(style_ids))
            .order_by_asc(styles::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn default_style(&self, layer: &layers::Model) -> LayerResult<Option<styles::Model>> {
        match layer.default_style_id {
            Some(style_id) => Ok(styles::Entity::find_by_id(style_id).one(&self.db).await?),
            None => Ok(None),
        }
    }

    pub async fn add_style(&self, layer_id: i32, style_id: i32) -> LayerResult<()> {
        let linked = layer_styles::Entity::find()
            .filter(layer_styles::Column::LayerId.eq(layer_id))
            .filter(layer_styles::Column::StyleId.eq(style_id))
            .count(&self.db)
            .await?;
        if linked == 0 {
            layer_styles::ActiveModel {
                layer_id: Set(layer_id),
                style_id: Set(style_id),
                ..Default::default()
            }
            .insert(&self.db)
            .await?;
        }
        Ok(())
    }

    pub async fn set_default_style(&self, layer_id: i32, style_id: i32) -> LayerResult<layers::Model> {
        let layer = self.get_layer(layer_id).await?;
        styles::Entity::find_by_id(style_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| LayerError::not_found("style", style_id))?;

        let mut active = layer.into_active_model().set_updated_at();
        active.default_style_id = Set(Some(style_id));
        Ok(active.update(&self.db).await?)
    }

    pub async fn set_category(&self, layer_id: i32, category_id: Option<i32>) -> LayerResult<layers::Model> {
        let layer = self.get_layer(layer_id).await?;
        let mut active = layer.into_active_model().set_updated_at();
        active.category_id = Set(category_id);
        Ok(active.update(&self.db).await?)
    }

    /// Saves title, abstract, category and keywords together or not at all.
    pub async fn update_metadata(&self, layer_id: i32, update: MetadataUpdate) -> LayerResult<layers::Model> {
        let layer = self.get_layer(layer_id).await?;

        let category_id = match update.category.as_deref() {
            Some(identifier) => Some(
                topic_categories::Entity::find()
                    .filter(topic_categories::Column::Identifier.eq(identifier))
                    .one(&self.db)
                    .await?
                    .ok_or_else(|| LayerError::not_found("category", identifier))?
                    .id,
            ),
            None => layer.category_id,
        };

        let mut active = layer.into_active_model().set_updated_at();
        if let Some(title) = update.title {
            active.title = Set(title);
        }
        if let Some(abstract_text) = update.abstract_text {
            active.abstract_text = Set(Some(abstract_text));
        }
        active.category_id = Set(category_id);

        let txn = self.db.begin().await?;
        let layer = active.update(&txn).await?;
        if let Some(keywords) = update.keywords {
            insert_keywords(&txn, layer.id, keywords).await?;
        }
        txn.commit().await?;
        Ok(layer)
    }

    /// Removes a layer with everything that only exists because of it.
    ///
    /// Ratings, grants, keywords, attributes and style links go with the layer.
    /// A style formerly attached to it survives while any remaining layer still
    /// uses it as default style or keeps it in its style set.
    pub async fn delete_layer(&self, layer_id: i32) -> LayerResult<()> {
        let layer = self.get_layer(layer_id).await?;
        let txn = self.db.begin().await?;

        let mut style_ids: BTreeSet<i32> = layer_styles::Entity::find()
            .filter(layer_styles::Column::LayerId.eq(layer.id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|link| link.style_id)
            .collect();
        style_ids.extend(layer.default_style_id);

        let removed_ratings = ratings::Entity::delete_many()
            .filter(ratings::Column::ContentType.eq(ratings::LAYER_CONTENT_TYPE))
            .filter(ratings::Column::ObjectId.eq(layer.id))
            .exec(&txn)
            .await?
            .rows_affected;
        permission_service::remove_all(&txn, layer.id).await?;
        layer_keywords::Entity::delete_many()
            .filter(layer_keywords::Column::LayerId.eq(layer.id))
            .exec(&txn)
            .await?;
        attributes::Entity::delete_many()
            .filter(attributes::Column::LayerId.eq(layer.id))
            .exec(&txn)
            .await?;
        layer_styles::Entity::delete_many()
            .filter(layer_styles::Column::LayerId.eq(layer.id))
            .exec(&txn)
            .await?;
        layers::Entity::delete_by_id(layer.id).exec(&txn).await?;

        let mut removed_styles = 0;
        for style_id in style_ids {
            if !style_in_use(&txn, style_id).await? {
                styles::Entity::delete_by_id(style_id).exec(&txn).await?;
                removed_styles += 1;
            }
        }

        txn.commit().await?;
        info!(
            "Removed layer {} ({} styles, {} ratings)",
            layer.typename, removed_styles, removed_ratings
        );
        Ok(())
    }

    pub async fn rate_layer(
        &self,
        layer_id: i32,
        user_id: Option<i32>,
        category: i32,
        rating: i32,
    ) -> LayerResult<ratings::Model> {
        if !(1..=5).contains(&rating) {
            return Err(LayerError::InvalidRating(rating));
        }
        self.get_layer(layer_id).await?;

        let rating = ratings::ActiveModel {
            content_type: Set(ratings::LAYER_CONTENT_TYPE.to_string()),
            object_id: Set(layer_id),
            category: Set(category),
            rating: Set(rating),
            user_id: Set(user_id),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;
        debug!("Recorded rating {} on layer {}", rating.rating, layer_id);
        Ok(rating)
    }

    pub async fn ratings(&self, layer_id: i32) -> LayerResult<Vec<ratings::Model>> {
        Ok(ratings::Entity::find()
            .filter(ratings::Column::ContentType.eq(ratings::LAYER_CONTENT_TYPE))
            .filter(ratings::Column::ObjectId.eq(layer_id))
            .all(&self.db)
            .await?)
    }
}

/// Appends the words `layer_id` doesn't carry yet, in sorted order.
async fn insert_keywords<C, I, S>(db: &C, layer_id: i32, words: I) -> LayerResult<()>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let existing: BTreeSet<String> = layer_keywords::Entity::find()
        .filter(layer_keywords::Column::LayerId.eq(layer_id))
        .all(db)
        .await?
        .into_iter()
        .map(|k| k.name)
        .collect();
    let new_words: BTreeSet<String> = words
        .into_iter()
        .map(|w| w.as_ref().trim().to_string())
        .filter(|w| !w.is_empty() && !existing.contains(w))
        .collect();

    for word in new_words {
        layer_keywords::ActiveModel {
            layer_id: Set(layer_id),
            name: Set(word),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

async fn touch<C: ConnectionTrait>(db: &C, layer_id: i32) -> LayerResult<()> {
    if let Some(layer) = layers::Entity::find_by_id(layer_id).one(db).await? {
        layer.into_active_model().set_updated_at().update(db).await?;
    }
    Ok(())
}

async fn style_in_use<C: ConnectionTrait>(db: &C, style_id: i32) -> LayerResult<bool> {
    let as_default = layers::Entity::find()
        .filter(layers::Column::DefaultStyleId.eq(style_id))
        .count(db)
        .await?;
    if as_default > 0 {
        return Ok(true);
    }

    let in_sets = layer_styles::Entity::find()
        .filter(layer_styles::Column::StyleId.eq(style_id))
        .count(db)
        .await?;
    Ok(in_sets > 0)
}
