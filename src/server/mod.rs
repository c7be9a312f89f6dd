pub mod app;
pub mod error;
pub mod handlers;
pub mod session;

use clap::Subcommand;

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum MigrateDirection {
    Up,
    Down,
    Fresh,
}

use crate::config::Settings;
use crate::database::{connection::*, migrations::Migrator};
use anyhow::Result;
use sea_orm_migration::prelude::*;
use tracing::info;

pub async fn start_server(settings: Settings) -> Result<()> {
    let database_url = get_database_url(Some(&settings.database));
    let db = establish_connection(&database_url).await?;

    Migrator::up(&db, None).await?;
    info!("Database migrations completed");

    let port = settings.port;
    let app = app::create_app(db, settings).await?;

    log_routes();

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn log_routes() {
    info!("Endpoints:");
    info!("  /health                            - Health check");
    info!("  /api-docs/openapi.json             - OpenAPI document");
    info!("  /layers/                           - Layer listing");
    info!("  /layers/upload                     - Shapefile / GeoTIFF upload");
    info!("  /layers/:typename[/metadata|/remove] - Layer detail, metadata, removal");
    info!("  /security/permissions/:id          - Layer permissions (JSON)");
    info!("  /categories                        - Topic category counts");
    info!("  /account/login, /account/logout    - Sessions");
}

pub async fn migrate_database(database_path: &str, direction: MigrateDirection) -> Result<()> {
    let database_url = get_database_url(Some(database_path));
    let db = establish_connection(&database_url).await?;

    match direction {
        MigrateDirection::Up => {
            info!("Running migrations up");
            Migrator::up(&db, None).await?;
        }
        MigrateDirection::Down => {
            info!("Running migrations down");
            Migrator::down(&db, None).await?;
        }
        MigrateDirection::Fresh => {
            info!("Running fresh migrations (down then up)");
            Migrator::down(&db, None).await?;
            Migrator::up(&db, None).await?;
        }
    }

    info!("Database migration completed");
    Ok(())
}
