use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

use crate::database::entities::{group_members, groups, users, users::ANONYMOUS_USERNAME};
use crate::errors::{LayerError, LayerResult};
use crate::services::auth_service::AuthService;

/// The ways a caller can point at a user.
#[derive(Clone, Copy, Debug)]
pub enum UserRef<'a> {
    Model(&'a users::Model),
    Username(&'a str),
    Id(i32),
}

impl<'a> From<&'a users::Model> for UserRef<'a> {
    fn from(user: &'a users::Model) -> Self {
        UserRef::Model(user)
    }
}

impl<'a> From<&'a str> for UserRef<'a> {
    fn from(username: &'a str) -> Self {
        UserRef::Username(username)
    }
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
}

impl UserService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        is_superuser: bool,
    ) -> LayerResult<users::Model> {
        let password_hash = AuthService::hash_password(password)
            .map_err(|e| LayerError::InvalidUser(e.to_string()))?;
        insert_user(&self.db, username, email, password_hash, is_superuser).await
    }

    pub async fn find_by_username(&self, username: &str) -> LayerResult<Option<users::Model>> {
        find_by_username(&self.db, username).await
    }

    pub async fn anonymous_user(&self) -> LayerResult<users::Model> {
        anonymous_user(&self.db).await
    }

    /// Resolves `user` to an existing, non-anonymous account.
    ///
    /// With no user the first superuser is returned, which is who owns data
    /// imported without an explicit owner.
    pub async fn get_valid_user(&self, user: Option<UserRef<'_>>) -> LayerResult<users::Model> {
        get_valid_user(&self.db, user).await
    }

    pub async fn create_group(&self, name: &str, description: Option<&str>) -> LayerResult<groups::Model> {
        let group = groups::ActiveModel {
            name: sea_orm::Set(name.to_string()),
            description: sea_orm::Set(description.map(str::to_string)),
            ..Default::default()
        };
        Ok(group.insert(&self.db).await?)
    }

    pub async fn add_member(&self, group_id: i32, user_id: i32) -> LayerResult<()> {
        let existing = group_members::Entity::find()
            .filter(group_members::Column::GroupId.eq(group_id))
            .filter(group_members::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?;
        if existing.is_none() {
            group_members::ActiveModel {
                group_id: sea_orm::Set(group_id),
                user_id: sea_orm::Set(user_id),
                ..Default::default()
            }
            .insert(&self.db)
            .await?;
        }
        Ok(())
    }

    pub async fn group_ids_of(&self, user_id: i32) -> LayerResult<Vec<i32>> {
        group_ids_of(&self.db, user_id).await
    }
}

pub(crate) async fn insert_user<C: ConnectionTrait>(
    db: &C,
    username: &str,
    email: &str,
    password_hash: String,
    is_superuser: bool,
) -> LayerResult<users::Model> {
    let mut user = users::ActiveModel::new(username, email, password_hash);
    if is_superuser {
        user = user.superuser();
    }
    Ok(user.insert(db).await?)
}

pub(crate) async fn find_by_username<C: ConnectionTrait>(
    db: &C,
    username: &str,
) -> LayerResult<Option<users::Model>> {
    Ok(users::Entity::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?)
}

pub(crate) async fn anonymous_user<C: ConnectionTrait>(db: &C) -> LayerResult<users::Model> {
    find_by_username(db, ANONYMOUS_USERNAME)
        .await?
        .ok_or_else(|| LayerError::not_found("user", ANONYMOUS_USERNAME))
}

pub(crate) async fn group_ids_of<C: ConnectionTrait>(db: &C, user_id: i32) -> LayerResult<Vec<i32>> {
    Ok(group_members::Entity::find()
        .select_only()
        .column(group_members::Column::GroupId)
        .filter(group_members::Column::UserId.eq(user_id))
        .into_tuple::<i32>()
        .all(db)
        .await?)
}

pub(crate) async fn get_valid_user<C: ConnectionTrait>(
    db: &C,
    user: Option<UserRef<'_>>,
) -> LayerResult<users::Model> {
    let found = match user {
        None => users::Entity::find()
            .filter(users::Column::IsSuperuser.eq(true))
            .order_by_asc(users::Column::Id)
            .one(db)
            .await?
            .ok_or_else(|| LayerError::InvalidUser("no superuser exists".to_string()))?,
        Some(UserRef::Model(model)) => users::Entity::find_by_id(model.id)
            .one(db)
            .await?
            .ok_or_else(|| LayerError::InvalidUser(model.username.clone()))?,
        Some(UserRef::Username(username)) => find_by_username(db, username)
            .await?
            .ok_or_else(|| LayerError::InvalidUser(username.to_string()))?,
        Some(UserRef::Id(id)) => users::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| LayerError::InvalidUser(id.to_string()))?,
    };

    if found.is_anonymous() {
        return Err(LayerError::InvalidUser(
            "the anonymous user cannot own resources".to_string(),
        ));
    }

    Ok(found)
}
