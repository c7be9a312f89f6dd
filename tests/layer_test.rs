//! Layer model and naming tests

mod common;

use anyhow::Result;
use geolayers::database::entities::{layers, styles};
use geolayers::errors::LayerError;
use geolayers::services::{
    CategoryService, LayerService, MetadataUpdate, NewLayer, PermSpec, PermissionService, UserRef,
    UserService,
};
use geolayers::upload::{get_valid_layer_name, get_valid_name, LayerNameSource, LayerType};
use sea_orm::{ConnectionTrait, EntityTrait, PaginatorTrait};
use serde_json::json;

use common::setup_test_db;

#[tokio::test]
async fn test_layer_attributes() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = LayerService::new(db.clone());

    assert_eq!(service.attributes(1).await?.len(), 4);

    let visible = service.visible_attributes(1).await?;
    assert_eq!(visible.len(), 3);
    assert_eq!(visible[0].attribute_label.as_deref(), Some("Place Name"));
    assert_eq!(visible[1].attribute_label.as_deref(), Some("Description"));
    assert_eq!(visible[2].attribute, "N\u{fa}mero_De_M\u{e9}dicos");

    let description = &visible[1];
    assert_eq!(description.count, 1);
    for stat in [
        &description.min,
        &description.max,
        &description.average,
        &description.median,
        &description.stddev,
        &description.sum,
        &description.unique_values,
    ] {
        assert_eq!(stat, "NA");
    }
    Ok(())
}

#[tokio::test]
async fn test_layer_attribute_config() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let config = LayerService::new(db.clone()).attribute_config(1).await?;

    let value = serde_json::to_value(&config)?;
    let info = &value["getFeatureInfo"];
    assert_eq!(
        info["fields"],
        json!(["place_name", "description", "N\u{fa}mero_De_M\u{e9}dicos"])
    );
    assert_eq!(info["propertyNames"]["description"], "Description");
    assert_eq!(info["propertyNames"]["place_name"], "Place Name");

    // A layer without attributes has nothing to configure
    let empty = LayerService::new(db.clone()).attribute_config(2).await?;
    assert_eq!(serde_json::to_value(&empty)?, json!({}));
    Ok(())
}

#[tokio::test]
async fn test_layer_styles() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = LayerService::new(db.clone());
    let layer = service.get_layer(1).await?;

    let layer_styles = service.styles(layer.id).await?;
    assert_eq!(layer_styles.len(), 4);

    let default_style = service.default_style(&layer).await?.expect("default style");
    assert!(layer_styles.contains(&default_style));

    let names: Vec<String> = layer_styles.iter().map(|s| s.to_string()).collect();
    assert!(names.iter().any(|n| n.contains('\u{f1}')));
    Ok(())
}

#[tokio::test]
async fn test_layer_save() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = LayerService::new(db.clone());

    let keywords = service.add_keywords(1, ["saving", "keywords"]).await?;
    assert_eq!(keywords, vec!["populartag", "here", "keywords", "saving"]);

    // Known words are not added twice
    let keywords = service.add_keywords(1, ["here"]).await?;
    assert_eq!(keywords.len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_get_valid_user() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let users = UserService::new(db.clone());

    let admin = users.get_valid_user(Some(UserRef::Username("admin"))).await?;
    assert!(admin.is_superuser);
    let valid = users.get_valid_user(Some(UserRef::Model(&admin))).await?;
    assert_eq!(valid.id, admin.id);

    let valid = users.get_valid_user(None).await?;
    assert!(valid.is_superuser);

    let new_user = users.create_user("arieluser", "ariel@example.com", "secret", false).await?;
    let valid = users.get_valid_user(Some(UserRef::Model(&new_user))).await?;
    assert_eq!(valid.id, new_user.id);
    let valid = users.get_valid_user(Some(UserRef::Username("arieluser"))).await?;
    assert_eq!(valid.username, "arieluser");

    let anonymous = users.anonymous_user().await?;
    let err = users.get_valid_user(Some(UserRef::Model(&anonymous))).await.unwrap_err();
    assert!(matches!(err, LayerError::InvalidUser(_)));

    let err = users.get_valid_user(Some(UserRef::Username("nobody"))).await.unwrap_err();
    assert!(matches!(err, LayerError::InvalidUser(_)));
    Ok(())
}

#[tokio::test]
async fn test_get_valid_name() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    assert_eq!(get_valid_name(&db, "blug").await?, "blug");
    assert_eq!(get_valid_name(&db, "<-->").await?, "_");
    assert_eq!(get_valid_name(&db, "<ab>").await?, "_ab_");
    assert_eq!(get_valid_name(&db, "CA").await?, "CA_1");
    assert_eq!(get_valid_name(&db, "CA").await?, "CA_1");
    Ok(())
}

#[tokio::test]
async fn test_get_valid_layer_name() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    assert_eq!(get_valid_layer_name(&db, "blug", false).await?, "blug");
    assert_eq!(get_valid_layer_name(&db, "blug", true).await?, "blug");

    assert_eq!(get_valid_layer_name(&db, "<ab>", false).await?, "_ab_");
    assert_eq!(get_valid_layer_name(&db, "<ab>", true).await?, "<ab>");

    assert_eq!(get_valid_layer_name(&db, "<-->", false).await?, "_");
    assert_eq!(get_valid_layer_name(&db, "<-->", true).await?, "<-->");

    assert_eq!(get_valid_layer_name(&db, "CA", false).await?, "CA_1");
    assert_eq!(get_valid_layer_name(&db, "CA", false).await?, "CA_1");
    assert_eq!(get_valid_layer_name(&db, "CA", true).await?, "CA");
    assert_eq!(get_valid_layer_name(&db, "CA", true).await?, "CA");

    let layer = LayerService::new(db.clone())
        .find_by_name("CA")
        .await?
        .expect("CA seeded");
    assert_eq!(get_valid_layer_name(&db, layer.clone(), false).await?, "CA_1");
    assert_eq!(get_valid_layer_name(&db, layer, true).await?, "CA");

    let not_a_name = json!(12);
    assert!(matches!(
        LayerNameSource::try_from(&not_a_name),
        Err(LayerError::InvalidLayerName(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_create_layer_with_default_permissions() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = LayerService::new(db.clone());

    let layer = service
        .create_layer(NewLayer {
            name: "relief".to_string(),
            workspace: "geonode".to_string(),
            title: None,
            abstract_text: Some("Shaded relief".to_string()),
            storetype: LayerType::Raster,
            charset: "UTF-8".to_string(),
            owner_id: 1,
            permissions: None,
        })
        .await?;
    assert_eq!(layer.typename, "geonode:relief");
    assert_eq!(layer.title, "relief");
    assert_eq!(layer.storetype, "raster");

    assert_eq!(get_valid_name(&db, "relief").await?, "relief_1");
    Ok(())
}

#[tokio::test]
async fn test_create_layer_with_permissions() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = LayerService::new(db.clone());
    let before = layers::Entity::find().count(&db).await?;

    let relief = |permissions: serde_json::Value| -> Result<NewLayer> {
        Ok(NewLayer {
            name: "relief".to_string(),
            workspace: "geonode".to_string(),
            title: None,
            abstract_text: None,
            storetype: LayerType::Raster,
            charset: "UTF-8".to_string(),
            owner_id: 1,
            permissions: Some(PermSpec::from_json(permissions)?),
        })
    };

    let result = service
        .create_layer(relief(json!({ "users": { "ghost": ["view_resourcebase"] } }))?)
        .await;
    assert!(matches!(result, Err(LayerError::InvalidUser(ref name)) if name == "ghost"));
    let result = service
        .create_layer(relief(json!({ "groups": { "nobody": ["view_resourcebase"] } }))?)
        .await;
    assert!(matches!(result, Err(LayerError::InvalidGroup(_))));
    assert_eq!(layers::Entity::find().count(&db).await?, before);

    let layer = service
        .create_layer(relief(json!({ "users": { "norman": ["view_resourcebase"] } }))?)
        .await?;
    let info = PermissionService::new(db.clone()).get_all_level_info(&layer).await?;
    assert_eq!(info.users["norman"], vec!["view_resourcebase".to_string()]);
    assert!(info.users.contains_key("bobby"));
    assert!(!info.users.contains_key("AnonymousUser"));
    Ok(())
}

#[tokio::test]
async fn test_update_metadata_is_all_or_nothing() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = LayerService::new(db.clone());
    let original = service.get_layer(1).await?;

    let layer = service
        .update_metadata(
            1,
            MetadataUpdate {
                title: Some("California".to_string()),
                category: Some("biota".to_string()),
                keywords: Some(vec!["coast".to_string()]),
                ..Default::default()
            },
        )
        .await?;
    assert_eq!(layer.title, "California");
    assert_eq!(service.keyword_list(1).await?, vec!["populartag", "here", "coast"]);

    // A failing keyword write takes the title change down with it
    db.execute_unprepared("DROP TABLE layer_keywords").await?;
    let result = service
        .update_metadata(
            1,
            MetadataUpdate {
                title: Some("Not saved".to_string()),
                keywords: Some(vec!["lost".to_string()]),
                ..Default::default()
            },
        )
        .await;
    assert!(result.is_err());
    assert_eq!(service.get_layer(1).await?.title, "California");
    assert_ne!(original.title, "California");
    Ok(())
}

#[tokio::test]
async fn test_category_counts() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let categories = CategoryService::new(db.clone());
    let service = LayerService::new(db.clone());

    assert_eq!(categories.layer_count("location").await?, 3);

    let location = categories.get_by_identifier("location").await?;
    let elevation = categories.get_by_identifier("elevation").await?;
    let first_located = service
        .list_layers()
        .await?
        .into_iter()
        .find(|l| l.category_id == Some(location.id))
        .expect("a located layer");
    service.set_category(first_located.id, Some(elevation.id)).await?;

    assert_eq!(categories.layer_count("location").await?, 2);
    assert_eq!(categories.layer_count("elevation").await?, 4);

    // Layer 1 is the only one with styles
    service.delete_layer(1).await?;
    assert_eq!(categories.layer_count("elevation").await?, 3);
    assert_eq!(layers::Entity::find().count(&db).await?, 7);
    assert_eq!(styles::Entity::find().count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_rating_bounds() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let service = LayerService::new(db.clone());

    let err = service.rate_layer(1, None, 2, 6).await.unwrap_err();
    assert!(matches!(err, LayerError::InvalidRating(6)));

    let err = service.rate_layer(999, None, 2, 3).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}
