use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "layers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub workspace: String,
    /// `workspace:name`, used to address the layer in URLs.
    #[sea_orm(unique)]
    pub typename: String,
    pub title: String,
    pub abstract_text: Option<String>,
    /// `vector` or `raster`.
    pub storetype: String,
    pub charset: String,
    pub owner_id: i32,
    pub category_id: Option<i32>,
    pub default_style_id: Option<i32>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,
    #[sea_orm(
        belongs_to = "super::topic_categories::Entity",
        from = "Column::CategoryId",
        to = "super::topic_categories::Column::Id",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::styles::Entity",
        from = "Column::DefaultStyleId",
        to = "super::styles::Column::Id",
        on_delete = "SetNull"
    )]
    DefaultStyle,
    #[sea_orm(has_many = "super::attributes::Entity")]
    Attributes,
    #[sea_orm(has_many = "super::layer_keywords::Entity")]
    Keywords,
    #[sea_orm(has_many = "super::layer_styles::Entity")]
    LayerStyles,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::topic_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::attributes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attributes.def()
    }
}

impl Related<super::layer_keywords::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Keywords.def()
    }
}

impl Related<super::layer_styles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LayerStyles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new(workspace: &str, name: &str, storetype: &str, owner_id: i32) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ActiveValue::NotSet,
            name: Set(name.to_string()),
            workspace: Set(workspace.to_string()),
            typename: Set(format!("{}:{}", workspace, name)),
            title: Set(name.to_string()),
            abstract_text: Set(None),
            storetype: Set(storetype.to_string()),
            charset: Set("UTF-8".to_string()),
            owner_id: Set(owner_id),
            category_id: Set(None),
            default_style_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    pub fn set_updated_at(mut self) -> Self {
        self.updated_at = Set(chrono::Utc::now());
        self
    }
}
