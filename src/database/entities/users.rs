use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Username of the reserved record standing for unauthenticated visitors.
pub const ANONYMOUS_USERNAME: &str = "AnonymousUser";

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_superuser: bool,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
    pub last_login_at: Option<ChronoDateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_sessions::Entity")]
    UserSessions,
    #[sea_orm(has_many = "super::group_members::Entity")]
    GroupMembers,
    #[sea_orm(has_many = "super::layers::Entity")]
    Layers,
}

impl Related<super::user_sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserSessions.def()
    }
}

impl Related<super::group_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GroupMembers.def()
    }
}

impl Related<super::layers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Layers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl ActiveModel {
    pub fn new(username: impl Into<String>, email: impl Into<String>, password_hash: String) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: ActiveValue::NotSet,
            username: Set(username.into()),
            email: Set(email.into()),
            password_hash: Set(password_hash),
            is_superuser: Set(false),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            last_login_at: Set(None),
        }
    }

    pub fn superuser(mut self) -> Self {
        self.is_superuser = Set(true);
        self
    }

    pub fn set_last_login(mut self) -> Self {
        self.last_login_at = Set(Some(chrono::Utc::now()));
        self
    }
}

impl Model {
    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS_USERNAME
    }
}
