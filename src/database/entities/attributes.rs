use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Placeholder for statistics that were never computed.
pub const STAT_NOT_AVAILABLE: &str = "NA";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "attributes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub layer_id: i32,
    pub attribute: String,
    pub attribute_label: Option<String>,
    pub attribute_type: String,
    pub visible: bool,
    pub display_order: i32,
    pub count: i32,
    pub min: String,
    pub max: String,
    pub average: String,
    pub median: String,
    pub stddev: String,
    pub sum: String,
    pub unique_values: String,
    pub last_stats_updated: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::layers::Entity",
        from = "Column::LayerId",
        to = "super::layers::Column::Id",
        on_delete = "Cascade"
    )]
    Layers,
}

impl Related<super::layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    /// New attribute with unset statistics.
    pub fn new(layer_id: i32, attribute: &str, attribute_type: &str, display_order: i32) -> Self {
        let na = || Set(STAT_NOT_AVAILABLE.to_string());
        Self {
            id: ActiveValue::NotSet,
            layer_id: Set(layer_id),
            attribute: Set(attribute.to_string()),
            attribute_label: Set(None),
            attribute_type: Set(attribute_type.to_string()),
            visible: Set(true),
            display_order: Set(display_order),
            count: Set(1),
            min: na(),
            max: na(),
            average: na(),
            median: na(),
            stddev: na(),
            sum: na(),
            unique_values: na(),
            last_stats_updated: Set(None),
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.attribute_label = Set(Some(label.to_string()));
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = Set(false);
        self
    }
}
