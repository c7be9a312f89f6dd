use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Membership of a style in a layer's style set.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "layer_styles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub layer_id: i32,
    pub style_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::layers::Entity",
        from = "Column::LayerId",
        to = "super::layers::Column::Id"
    )]
    Layers,
    #[sea_orm(
        belongs_to = "super::styles::Entity",
        from = "Column::StyleId",
        to = "super::styles::Column::Id"
    )]
    Styles,
}

impl Related<super::layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl Related<super::styles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Styles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
