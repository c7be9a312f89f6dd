use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Content type recorded on ratings that point at layers.
pub const LAYER_CONTENT_TYPE: &str = "layer";

/// Rating attached to any record through `(content_type, object_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub content_type: String,
    pub object_id: i32,
    pub category: i32,
    pub rating: i32,
    pub user_id: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
