use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, info};

use crate::database::entities::{groups, layers, object_permissions, users};
use crate::errors::{LayerError, LayerResult};
use crate::services::user_service;

/// Capabilities that can be granted on a layer.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ViewResourcebase,
    DownloadResourcebase,
    DownloadResourcebaseMetadata,
    ChangeResourcebase,
    ChangeResourcebaseMetadata,
    ChangeResourcebasePermissions,
    DeleteResourcebase,
    PublishResourcebase,
    EditResourcebaseMetadata,
    EditResourcebaseData,
    EditResourcebaseStyle,
}

impl Permission {
    pub fn parse(name: &str) -> LayerResult<Self> {
        Permission::from_str(name).map_err(|_| LayerError::InvalidPermission(name.to_string()))
    }

    /// Everything an owner can do with their own layer.
    pub fn owner_set() -> BTreeSet<Permission> {
        Permission::iter().collect()
    }

    /// What everybody gets on a freshly published layer.
    pub fn public_set() -> BTreeSet<Permission> {
        [Permission::ViewResourcebase, Permission::DownloadResourcebase]
            .into_iter()
            .collect()
    }
}

/// Who a grant is made to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Principal {
    User(i32),
    Group(i32),
}

/// Declarative mapping of principals to permission names for one resource.
///
/// Used both as the input of [`PermissionService::set_permissions`] and as the
/// shape reported by [`PermissionService::get_all_level_info`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermSpec {
    #[serde(default)]
    pub users: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl PermSpec {
    pub fn from_json(value: serde_json::Value) -> LayerResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| LayerError::InvalidPermission(format!("malformed permission spec: {}", e)))
    }

    fn parsed(names: &[String]) -> LayerResult<BTreeSet<Permission>> {
        names.iter().map(|name| Permission::parse(name)).collect()
    }
}

#[derive(Clone)]
pub struct PermissionService {
    db: DatabaseConnection,
}

impl PermissionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resets `layer` to: owner gets everything, everybody can view and download.
    pub async fn set_default_permissions(&self, layer: &layers::Model) -> LayerResult<()> {
        let txn = self.db.begin().await?;
        set_default_permissions(&txn, layer).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Replaces every grant on `layer` with `spec`, keeping the owner's own grants.
    ///
    /// Principals and permission names are validated before anything is written,
    /// and the replacement runs in a single transaction.
    pub async fn set_permissions(&self, layer: &layers::Model, spec: &PermSpec) -> LayerResult<()> {
        let grants = resolve_grants(&self.db, spec).await?;

        let txn = self.db.begin().await?;
        apply_grants(&txn, layer, grants).await?;
        txn.commit().await?;

        info!("Replaced permissions on layer {}", layer.typename);
        Ok(())
    }

    /// Every grant on `layer`, grouped by username and group name.
    pub async fn get_all_level_info(&self, layer: &layers::Model) -> LayerResult<PermSpec> {
        let rows = object_permissions::Entity::find()
            .filter(object_permissions::Column::ResourceId.eq(layer.id))
            .all(&self.db)
            .await?;

        let mut by_user: BTreeMap<i32, BTreeSet<String>> = BTreeMap::new();
        let mut by_group: BTreeMap<i32, BTreeSet<String>> = BTreeMap::new();
        for row in rows {
            match (row.user_id, row.group_id) {
                (Some(user_id), _) => by_user.entry(user_id).or_default().insert(row.permission),
                (None, Some(group_id)) => by_group.entry(group_id).or_default().insert(row.permission),
                (None, None) => false,
            };
        }

        let mut spec = PermSpec::default();
        if !by_user.is_empty() {
            let names = users::Entity::find()
                .filter(users::Column::Id.is_in(by_user.keys().copied()))
                .all(&self.db)
                .await?;
            for user in names {
                if let Some(perms) = by_user.remove(&user.id) {
                    spec.users.insert(user.username, perms.into_iter().collect());
                }
            }
        }
        if !by_group.is_empty() {
            let names = groups::Entity::find()
                .filter(groups::Column::Id.is_in(by_group.keys().copied()))
                .all(&self.db)
                .await?;
            for group in names {
                if let Some(perms) = by_group.remove(&group.id) {
                    spec.groups.insert(group.name, perms.into_iter().collect());
                }
            }
        }

        Ok(spec)
    }

    /// Whether `user` holds `permission` on `layer`.
    ///
    /// Superusers hold everything and inactive accounts nothing. Grants reach a
    /// user directly, through any of their groups, or through the anonymous user.
    pub async fn has_perm(
        &self,
        user: &users::Model,
        permission: Permission,
        layer: &layers::Model,
    ) -> LayerResult<bool> {
        Ok(self.user_permissions(user, layer).await?.contains(&permission))
    }

    /// The effective permission set of `user` on `layer`.
    pub async fn user_permissions(
        &self,
        user: &users::Model,
        layer: &layers::Model,
    ) -> LayerResult<BTreeSet<Permission>> {
        if !user.is_active {
            return Ok(BTreeSet::new());
        }
        if user.is_superuser {
            return Ok(Permission::owner_set());
        }

        let mut user_ids = vec![user.id];
        if !user.is_anonymous() {
            if let Some(anonymous) = user_service::find_by_username(&self.db, users::ANONYMOUS_USERNAME).await? {
                user_ids.push(anonymous.id);
            }
        }
        let group_ids = user_service::group_ids_of(&self.db, user.id).await?;

        let mut principal_filter = sea_orm::Condition::any()
            .add(object_permissions::Column::UserId.is_in(user_ids));
        if !group_ids.is_empty() {
            principal_filter = principal_filter.add(object_permissions::Column::GroupId.is_in(group_ids));
        }

        let rows = object_permissions::Entity::find()
            .filter(object_permissions::Column::ResourceId.eq(layer.id))
            .filter(principal_filter)
            .all(&self.db)
            .await?;

        // Rows with a name outside the known set are ignored rather than trusted
        Ok(rows
            .iter()
            .filter_map(|row| Permission::from_str(&row.permission).ok())
            .collect())
    }

    /// Grants a single permission; granting twice is a no-op.
    pub async fn assign_perm(
        &self,
        principal: Principal,
        permission: Permission,
        layer: &layers::Model,
    ) -> LayerResult<()> {
        grant(&self.db, principal, permission, layer.id).await
    }

    pub async fn remove_perm(
        &self,
        principal: Principal,
        permission: Permission,
        layer: &layers::Model,
    ) -> LayerResult<()> {
        object_permissions::Entity::delete_many()
            .filter(object_permissions::Column::ResourceId.eq(layer.id))
            .filter(principal_column(principal))
            .filter(object_permissions::Column::Permission.eq(permission.to_string()))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

fn principal_column(principal: Principal) -> sea_orm::sea_query::SimpleExpr {
    match principal {
        Principal::User(id) => object_permissions::Column::UserId.eq(id),
        Principal::Group(id) => object_permissions::Column::GroupId.eq(id),
    }
}

/// Grants requested by a permission spec, resolved to principals.
pub(crate) type Grants = Vec<(Principal, BTreeSet<Permission>)>;

/// Looks up every principal and permission name in `spec` without writing anything.
pub(crate) async fn resolve_grants<C: ConnectionTrait>(db: &C, spec: &PermSpec) -> LayerResult<Grants> {
    let mut grants = Grants::new();

    for (username, names) in &spec.users {
        let user = user_service::find_by_username(db, username)
            .await?
            .ok_or_else(|| LayerError::InvalidUser(username.clone()))?;
        grants.push((Principal::User(user.id), PermSpec::parsed(names)?));
    }

    for (name, names) in &spec.groups {
        let group = groups::Entity::find()
            .filter(groups::Column::Name.eq(name.as_str()))
            .one(db)
            .await?
            .ok_or_else(|| LayerError::InvalidGroup(name.clone()))?;
        grants.push((Principal::Group(group.id), PermSpec::parsed(names)?));
    }

    Ok(grants)
}

/// Replaces every grant on `layer` with the owner set plus `grants`.
pub(crate) async fn apply_grants<C: ConnectionTrait>(
    db: &C,
    layer: &layers::Model,
    grants: Grants,
) -> LayerResult<()> {
    remove_all(db, layer.id).await?;
    for permission in Permission::owner_set() {
        grant(db, Principal::User(layer.owner_id), permission, layer.id).await?;
    }
    for (principal, permissions) in grants {
        for permission in permissions {
            grant(db, principal, permission, layer.id).await?;
        }
    }
    Ok(())
}

pub(crate) async fn set_default_permissions<C: ConnectionTrait>(
    db: &C,
    layer: &layers::Model,
) -> LayerResult<()> {
    remove_all(db, layer.id).await?;

    let anonymous = user_service::anonymous_user(db).await?;
    for permission in Permission::public_set() {
        grant(db, Principal::User(anonymous.id), permission, layer.id).await?;
    }
    for permission in Permission::owner_set() {
        grant(db, Principal::User(layer.owner_id), permission, layer.id).await?;
    }

    debug!("Applied default permissions to layer {}", layer.typename);
    Ok(())
}

pub(crate) async fn remove_all<C: ConnectionTrait>(db: &C, resource_id: i32) -> LayerResult<u64> {
    let result = object_permissions::Entity::delete_many()
        .filter(object_permissions::Column::ResourceId.eq(resource_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

async fn grant<C: ConnectionTrait>(
    db: &C,
    principal: Principal,
    permission: Permission,
    resource_id: i32,
) -> LayerResult<()> {
    let existing = object_permissions::Entity::find()
        .filter(object_permissions::Column::ResourceId.eq(resource_id))
        .filter(principal_column(principal))
        .filter(object_permissions::Column::Permission.eq(permission.to_string()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let (user_id, group_id) = match principal {
        Principal::User(id) => (Some(id), None),
        Principal::Group(id) => (None, Some(id)),
    };
    object_permissions::ActiveModel {
        resource_id: Set(resource_id),
        user_id: Set(user_id),
        group_id: Set(group_id),
        permission: Set(permission.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_names() {
        assert_eq!(Permission::ViewResourcebase.to_string(), "view_resourcebase");
        assert_eq!(
            Permission::parse("change_resourcebase_permissions").unwrap(),
            Permission::ChangeResourcebasePermissions
        );
        assert!(matches!(
            Permission::parse("edit_resourcebase_dtylr"),
            Err(LayerError::InvalidPermission(_))
        ));
    }

    #[test]
    fn test_owner_set_covers_public_set() {
        assert!(Permission::public_set().is_subset(&Permission::owner_set()));
        assert_eq!(Permission::owner_set().len(), 11);
    }

    #[test]
    fn test_perm_spec_defaults_missing_sections() {
        let spec = PermSpec::from_json(serde_json::json!({ "users": { "admin": ["view_resourcebase"] } }))
            .unwrap();
        assert!(spec.groups.is_empty());
        assert_eq!(spec.users["admin"], vec!["view_resourcebase".to_string()]);

        assert!(PermSpec::from_json(serde_json::json!({ "users": [] })).is_err());
    }
}
