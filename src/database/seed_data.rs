use anyhow::Result;
use sea_orm::*;
use tracing::info;

use crate::database::entities::{
    attributes, group_members, groups, layer_keywords, layer_styles, layers, styles,
    topic_categories, users, users::ANONYMOUS_USERNAME,
};
use crate::services::{permission_service, user_service, AuthService};

/// bcrypt's minimum cost; demo accounts only need to be checkable, not strong.
const SEED_HASH_COST: u32 = 4;

const SEED_WORKSPACE: &str = "geonode";

/// (username, password, superuser)
const SEED_USERS: [(&str, &str, bool); 8] = [
    ("bobby", "bob", false),
    ("admin", "admin", true),
    ("norman", "norman", false),
    ("user1", "pass", false),
    ("user2", "pass", false),
    ("user3", "pass", false),
    ("user4", "pass", false),
    (ANONYMOUS_USERNAME, "", false),
];

const SEED_CATEGORIES: [(&str, &str); 5] = [
    ("biota", "Flora and/or fauna in natural environment"),
    ("elevation", "Height above or below sea level"),
    ("location", "Positional information and services"),
    ("transportation", "Means and aids for conveying persons and/or goods"),
    ("inlandWaters", "Inland water features, drainage systems and their characteristics"),
];

/// (name, storetype, category, owner)
const SEED_LAYERS: [(&str, &str, Option<&str>, &str); 8] = [
    ("CA", "vector", Some("location"), "user1"),
    ("san_andres_y_providencia_poi", "vector", Some("location"), "bobby"),
    ("single_point", "vector", Some("location"), "user2"),
    ("ipa", "vector", Some("elevation"), "user3"),
    ("hospitals", "vector", Some("elevation"), "user4"),
    ("dem_30m", "raster", Some("elevation"), "user1"),
    ("roads", "vector", Some("transportation"), "user2"),
    ("rivers", "vector", None, "user3"),
];

/// Inserts a small demo catalogue: users, groups, categories and layers.
///
/// The first layer (`geonode:CA`) carries attributes, keywords and four styles.
/// Every layer starts with the default permissions. Does nothing when users
/// already exist.
pub async fn seed_demo_data(db: &DatabaseConnection) -> Result<()> {
    if users::Entity::find().count(db).await? > 0 {
        info!("Database already populated, skipping seed data creation");
        return Ok(());
    }

    let txn = db.begin().await?;

    info!("Creating demo users...");
    for (username, password, is_superuser) in SEED_USERS {
        // The anonymous account can never log in
        let password_hash = if username == ANONYMOUS_USERNAME {
            "!".to_string()
        } else {
            AuthService::hash_password_with_cost(password, SEED_HASH_COST)?
        };
        let email = format!("{}@example.com", username.to_lowercase());
        user_service::insert_user(&txn, username, &email, password_hash, is_superuser).await?;
    }

    info!("Creating demo groups...");
    for (name, description, members) in [
        ("editors", "Layer editors", &["user2", "user3"][..]),
        ("viewers", "Read-only reviewers", &["user4"][..]),
    ] {
        let group = groups::ActiveModel {
            name: Set(name.to_string()),
            description: Set(Some(description.to_string())),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        for member in members {
            let user = user_id(&txn, member).await?;
            group_members::ActiveModel {
                group_id: Set(group.id),
                user_id: Set(user),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }
    }

    info!("Creating topic categories...");
    for (identifier, description) in SEED_CATEGORIES {
        topic_categories::ActiveModel {
            identifier: Set(identifier.to_string()),
            description: Set(description.to_string()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
    }

    info!("Creating demo layers...");
    let mut created = Vec::new();
    for (name, storetype, category, owner) in SEED_LAYERS {
        let owner_id = user_id(&txn, owner).await?;
        let mut layer = layers::ActiveModel::new(SEED_WORKSPACE, name, storetype, owner_id);
        if let Some(identifier) = category {
            let category = topic_categories::Entity::find()
                .filter(topic_categories::Column::Identifier.eq(identifier))
                .one(&txn)
                .await?
                .ok_or_else(|| anyhow::anyhow!("missing category {}", identifier))?;
            layer.category_id = Set(Some(category.id));
        }
        created.push(layer.insert(&txn).await?);
    }

    for layer in &created {
        permission_service::set_default_permissions(&txn, layer).await?;
    }

    if let Some(first) = created.first() {
        create_layer_data(&txn, first).await?;
    }

    txn.commit().await?;
    info!("Seeded {} users and {} layers", SEED_USERS.len(), created.len());
    Ok(())
}

/// Attributes, keywords and styles for a single layer.
async fn create_layer_data<C: ConnectionTrait>(db: &C, layer: &layers::Model) -> Result<()> {
    let attributes = [
        attributes::ActiveModel::new(layer.id, "the_geom", "gml:Geometry", 0).hidden(),
        attributes::ActiveModel::new(layer.id, "place_name", "xsd:string", 1).with_label("Place Name"),
        attributes::ActiveModel::new(layer.id, "description", "xsd:string", 2).with_label("Description"),
        attributes::ActiveModel::new(layer.id, "N\u{fa}mero_De_M\u{e9}dicos", "xsd:string", 3),
    ];
    for attribute in attributes {
        attribute.insert(db).await?;
    }

    for keyword in ["populartag", "here"] {
        layer_keywords::ActiveModel {
            layer_id: Set(layer.id),
            name: Set(keyword.to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }

    let mut style_ids = Vec::new();
    for (name, title) in [
        ("test_style_1", "Test Style One"),
        ("test_style_2", "Test Style Two"),
        ("Trabajo_De_Campo", "Trabajo de campo"),
        ("Estilo_\u{f1}and\u{fa}", "Estilo \u{f1}and\u{fa}"),
    ] {
        let style = styles::ActiveModel {
            name: Set(name.to_string()),
            sld_title: Set(Some(title.to_string())),
            sld_version: Set(Some("1.0.0".to_string())),
            workspace: Set(Some(SEED_WORKSPACE.to_string())),
            ..Default::default()
        }
        .insert(db)
        .await?;

        layer_styles::ActiveModel {
            layer_id: Set(layer.id),
            style_id: Set(style.id),
            ..Default::default()
        }
        .insert(db)
        .await?;
        style_ids.push(style.id);
    }

    let mut active: layers::ActiveModel = layer.clone().into();
    active.default_style_id = Set(style_ids.first().copied());
    active.update(db).await?;

    Ok(())
}

async fn user_id<C: ConnectionTrait>(db: &C, username: &str) -> Result<i32> {
    let user = user_service::find_by_username(db, username)
        .await?
        .ok_or_else(|| anyhow::anyhow!("missing seed user {}", username))?;
    Ok(user.id)
}
