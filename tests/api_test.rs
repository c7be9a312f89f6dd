//! API integration tests
//!
//! Status codes, redirects and login gating of the layer endpoints

mod common;

use anyhow::Result;
use axum::body::Bytes;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use geolayers::database::entities::{layers, ratings, styles};
use geolayers::services::{LayerService, PermSpec, PermissionService};
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::{json, Value};

use common::{login, setup_test_server, upload_form, with_token};

fn location(response: &axum_test::TestResponse) -> String {
    response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn admin_only_spec() -> PermSpec {
    PermSpec::from_json(json!({
        "users": {
            "admin": [
                "view_resourcebase",
                "change_resourcebase_permissions",
                "edit_resourcebase_style",
                "edit_resourcebase_data",
                "download_resourcebase",
                "download_resourcebase_metadata"
            ]
        },
        "groups": {}
    }))
    .expect("valid permissions")
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["service"], "geolayers");
    assert_eq!(body["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn test_layer_browse_is_public() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server.get("/layers/").await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let layers: Vec<Value> = response.json();
    assert_eq!(layers.len(), 8);
    assert_eq!(layers[0]["typename"], "geonode:CA");
    Ok(())
}

#[tokio::test]
async fn test_layer_detail() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server.get("/layers/geonode:CA").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let detail: Value = response.json();
    assert_eq!(detail["name"], "CA");
    assert_eq!(detail["keywords"], json!(["populartag", "here"]));
    assert_eq!(detail["styles"].as_array().map(Vec::len), Some(4));
    assert_eq!(detail["attributes"].as_array().map(Vec::len), Some(3));
    assert_eq!(
        detail["attribute_config"]["getFeatureInfo"]["propertyNames"]["place_name"],
        "Place Name"
    );

    let response = server.get("/layers/geonode:does_not_exist").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_not_superuser_permissions() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let layer = LayerService::new(db.clone()).get_by_typename("geonode:CA").await?;
    let permissions = PermissionService::new(db.clone());

    // Nobody but admin and the owner can see the layer any more
    permissions.set_permissions(&layer, &admin_only_spec()).await?;

    let response = server.get("/layers/geonode:CA").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert!(location(&response).starts_with("/account/login/?next="));

    let bobby = login(&server, "bobby", "bob").await;
    let response = with_token(server.get("/layers/geonode:CA"), &bobby).await;
    assert_eq!(response.status_code(), StatusCode::FOUND);

    let spec = PermSpec::from_json(json!({
        "users": { "bobby": ["view_resourcebase", "change_resourcebase"] }
    }))?;
    permissions.set_permissions(&layer, &spec).await?;

    let response = with_token(server.get("/layers/geonode:CA"), &bobby).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let detail: Value = response.json();
    let granted = detail["permissions"].as_array().cloned().unwrap_or_default();
    assert!(granted.contains(&json!("change_resourcebase")));
    assert!(!granted.contains(&json!("change_resourcebase_permissions")));
    Ok(())
}

#[tokio::test]
async fn test_describe_data() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server.get("/layers/geonode:CA/metadata").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(
        location(&response),
        "/account/login/?next=%2Flayers%2Fgeonode%3ACA%2Fmetadata"
    );

    let admin = login(&server, "admin", "admin").await;
    let response = with_token(server.get("/layers/geonode:CA/metadata"), &admin).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["layer"]["typename"], "geonode:CA");
    Ok(())
}

#[tokio::test]
async fn test_metadata_update() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let owner = login(&server, "user1", "pass").await;

    let response = with_token(server.post("/layers/geonode:CA/metadata"), &owner)
        .json(&json!({
            "title": "California",
            "abstract": "Places in California",
            "category": "elevation",
            "keywords": ["saving", "keywords"]
        }))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let service = LayerService::new(db.clone());
    let layer = service.get_by_typename("geonode:CA").await?;
    assert_eq!(layer.title, "California");
    assert_eq!(layer.abstract_text.as_deref(), Some("Places in California"));
    assert_eq!(
        service.keyword_list(layer.id).await?,
        vec!["populartag", "here", "keywords", "saving"]
    );

    // Not the owner and no grant to change metadata
    let norman = login(&server, "norman", "norman").await;
    let response = with_token(server.post("/layers/geonode:CA/metadata"), &norman)
        .json(&json!({ "title": "Hijacked" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    Ok(())
}

#[tokio::test]
async fn test_upload_layer_form() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server.get("/layers/upload").await;
    assert_eq!(response.status_code(), StatusCode::FOUND);

    let bobby = login(&server, "bobby", "bob").await;
    let response = with_token(server.get("/layers/upload"), &bobby).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["file_fields"]
        .as_array()
        .map(|fields| fields.contains(&json!("base_file")))
        .unwrap_or(false));
    Ok(())
}

#[tokio::test]
async fn test_upload_shapefile() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let bobby = login(&server, "bobby", "bob").await;

    let form = upload_form(&[
        ("base_file", "CA.shp"),
        ("dbf_file", "CA.dbf"),
        ("shx_file", "CA.shx"),
        ("prj_file", "CA.prj"),
    ])
    .add_text("layer_title", "Uploaded CA");
    let response = with_token(server.post("/layers/upload"), &bobby)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let result: Value = response.json();
    assert_eq!(result["success"], true);
    // CA is taken by the seeded layer
    assert_eq!(result["url"], "/layers/geonode:CA_1");
    assert_eq!(result["files"], json!(["dbf", "prj", "shp", "shx"]));

    let layer = LayerService::new(db.clone()).get_by_typename("geonode:CA_1").await?;
    assert_eq!(layer.title, "Uploaded CA");
    assert_eq!(layer.storetype, "vector");
    Ok(())
}

#[tokio::test]
async fn test_upload_geotiff_with_permissions() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let bobby = login(&server, "bobby", "bob").await;

    let form = upload_form(&[("base_file", "relief.TIF")])
        .add_text("permissions", r#"{"users": {"norman": ["view_resourcebase"]}}"#);
    let response = with_token(server.post("/layers/upload"), &bobby)
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let layer = LayerService::new(db.clone()).get_by_typename("geonode:relief").await?;
    assert_eq!(layer.storetype, "raster");

    let info = PermissionService::new(db.clone()).get_all_level_info(&layer).await?;
    assert_eq!(info.users.len(), 2);
    assert!(info.users.contains_key("norman"));
    assert!(!info.users.contains_key("AnonymousUser"));
    Ok(())
}

#[tokio::test]
async fn test_upload_rejects_invalid_forms() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let bobby = login(&server, "bobby", "bob").await;
    let before = layers::Entity::find().count(&db).await?;

    let missing_shx = upload_form(&[("base_file", "foo.shp"), ("dbf_file", "foo.dbf")]);
    let response = with_token(server.post("/layers/upload"), &bobby)
        .multipart(missing_shx)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let wrong_type = upload_form(&[("base_file", "foo.txt")]);
    let response = with_token(server.post("/layers/upload"), &bobby)
        .multipart(wrong_type)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("Only Shapefiles and GeoTiffs are supported"));

    let bad_json = upload_form(&[("base_file", "foo.tif")]).add_text("permissions", "<users></users>");
    let response = with_token(server.post("/layers/upload"), &bobby)
        .multipart(bad_json)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    // Unknown principals are rejected before the layer exists
    let ghost = upload_form(&[("base_file", "relief.tif")])
        .add_text("permissions", r#"{"users": {"ghost": ["view_resourcebase"]}}"#);
    let response = with_token(server.post("/layers/upload"), &bobby)
        .multipart(ghost)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap_or_default().contains("ghost"));
    assert!(LayerService::new(db.clone())
        .get_by_typename("geonode:relief")
        .await
        .is_err());

    assert_eq!(layers::Entity::find().count(&db).await?, before);
    Ok(())
}

#[tokio::test]
async fn test_ajax_layer_permissions() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let layer = LayerService::new(db.clone()).get_by_typename("geonode:CA").await?;
    let url = format!("/security/permissions/{}", layer.id);
    let spec = json!({
        "users": { "admin": ["view_resourcebase", "change_resourcebase_permissions"] },
        "groups": {}
    });

    // An unknown resource is reported before anything else
    let response = server.post("/security/permissions/9999999").json(&spec).await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let response = server.get(&url).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body.get("permissions").is_some());

    let response = server.post(&url).json(&spec).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let bobby = login(&server, "bobby", "bob").await;
    let response = with_token(server.post(&url), &bobby).json(&spec).await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let admin = login(&server, "admin", "admin").await;
    let response = with_token(server.post(&url), &admin)
        .bytes(Bytes::from_static(b"{ not json"))
        .content_type("application/json")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);

    let response = with_token(server.post(&url), &admin).json(&spec).await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);

    let info = PermissionService::new(db.clone()).get_all_level_info(&layer).await?;
    assert_eq!(info.users.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_layer_remove() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let service = LayerService::new(db.clone());
    let layer = service.get_by_typename("geonode:CA").await?;
    service.set_default_style(layer.id, 1).await?;
    let url = "/layers/geonode:CA/remove";

    let response = server.get(url).await;
    assert_eq!(response.status_code(), StatusCode::FOUND);

    let norman = login(&server, "norman", "norman").await;
    let response = with_token(server.post(url), &norman).await;
    assert_eq!(response.status_code(), StatusCode::FOUND);

    let admin = login(&server, "admin", "admin").await;
    let response = with_token(server.put(url), &admin).await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let response = with_token(server.get(url), &admin).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = with_token(server.post(url), &admin).await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://testserver/layers/");

    assert!(layers::Entity::find_by_id(layer.id).one(&db).await?.is_none());
    assert_eq!(styles::Entity::find().count(&db).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_non_cascading() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let service = LayerService::new(db.clone());
    let layer1 = service.get_layer(1).await?;
    let layer2 = service.get_layer(2).await?;

    let layer1 = service.set_default_style(layer1.id, 1).await?;
    let layer2 = service.set_default_style(layer2.id, 1).await?;
    assert_eq!(layer1.default_style_id, layer2.default_style_id);

    let admin = login(&server, "admin", "admin").await;
    let response = with_token(server.post(&format!("/layers/{}/remove", layer1.typename)), &admin).await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    assert_eq!(location(&response), "http://testserver/layers/");

    assert!(layers::Entity::find_by_id(layer1.id).one(&db).await?.is_none());
    assert!(layers::Entity::find_by_id(layer2.id).one(&db).await?.is_some());
    assert_eq!(styles::Entity::find().count(&db).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_rating_layer_remove() -> Result<()> {
    let (server, db, _file) = setup_test_server().await?;
    let service = LayerService::new(db.clone());
    let layer = service.set_default_style(3, 3).await?;

    service.rate_layer(layer.id, None, 2, 3).await?;
    assert_eq!(service.ratings(layer.id).await?.len(), 1);

    let admin = login(&server, "admin", "admin").await;
    let response = with_token(server.post(&format!("/layers/{}/remove", layer.typename)), &admin).await;
    assert_eq!(response.status_code(), StatusCode::FOUND);

    assert_eq!(ratings::Entity::find().count(&db).await?, 0);
    // Style 3 is still in the style set of geonode:CA
    assert!(styles::Entity::find_by_id(3).one(&db).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn test_category_counts_endpoint() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server.get("/categories").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let counts: Vec<Value> = response.json();
    let count_of = |identifier: &str| {
        counts
            .iter()
            .find(|c| c["identifier"] == identifier)
            .and_then(|c| c["layer_count"].as_u64())
    };
    assert_eq!(count_of("location"), Some(3));
    assert_eq!(count_of("elevation"), Some(3));
    assert_eq!(count_of("biota"), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_login_and_logout() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server
        .post("/account/login")
        .json(&json!({ "username": "bobby", "password": "wrong" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let response = server
        .post("/account/login")
        .json(&json!({ "username": "AnonymousUser", "password": "" }))
        .await;
    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);

    let token = login(&server, "bobby", "bob").await;
    let response = with_token(server.get("/layers/upload"), &token).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    // The session cookie works too, quoted or not
    let response = server
        .get("/layers/upload")
        .add_header(
            HeaderName::from_static("cookie"),
            HeaderValue::from_str(&format!("sessionid=\"{}\"", token))?,
        )
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = with_token(server.post("/account/logout"), &token).await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let response = with_token(server.get("/layers/upload"), &token).await;
    assert_eq!(response.status_code(), StatusCode::FOUND);
    Ok(())
}

#[tokio::test]
async fn test_openapi_document() -> Result<()> {
    let (server, _db, _file) = setup_test_server().await?;

    let response = server.get("/api-docs/openapi.json").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let doc: Value = response.json();
    assert!(doc["paths"].get("/layers/{typename}/remove").is_some());
    Ok(())
}
