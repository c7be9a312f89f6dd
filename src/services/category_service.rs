use std::collections::HashMap;

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;

use crate::database::entities::{layers, topic_categories};
use crate::errors::{LayerError, LayerResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct CategoryCount {
    pub identifier: String,
    pub description: String,
    pub layer_count: u64,
}

#[derive(Clone)]
pub struct CategoryService {
    db: DatabaseConnection,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_by_identifier(&self, identifier: &str) -> LayerResult<topic_categories::Model> {
        topic_categories::Entity::find()
            .filter(topic_categories::Column::Identifier.eq(identifier))
            .one(&self.db)
            .await?
            .ok_or_else(|| LayerError::not_found("category", identifier))
    }

    /// Every category with the number of layers filed under it, empty ones included.
    pub async fn category_counts(&self) -> LayerResult<Vec<CategoryCount>> {
        let categories = topic_categories::Entity::find()
            .order_by_asc(topic_categories::Column::Identifier)
            .all(&self.db)
            .await?;

        let mut counts: HashMap<i32, u64> = HashMap::new();
        for layer in layers::Entity::find()
            .filter(layers::Column::CategoryId.is_not_null())
            .all(&self.db)
            .await?
        {
            if let Some(category_id) = layer.category_id {
                *counts.entry(category_id).or_default() += 1;
            }
        }

        Ok(categories
            .into_iter()
            .map(|category| CategoryCount {
                layer_count: counts.get(&category.id).copied().unwrap_or(0),
                identifier: category.identifier,
                description: category.description,
            })
            .collect())
    }

    pub async fn layer_count(&self, identifier: &str) -> LayerResult<u64> {
        self.category_counts()
            .await?
            .into_iter()
            .find(|c| c.identifier == identifier)
            .map(|c| c.layer_count)
            .ok_or_else(|| LayerError::not_found("category", identifier))
    }
}
