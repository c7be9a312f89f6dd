use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use geolayers::config::Settings;
use geolayers::database::{establish_connection, get_database_url, seed_data, setup_database};
use geolayers::server;
use geolayers::upload::{get_files, layer_type};
use tracing::info;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(author, version, about)]
struct Cli {
    #[clap(short, long, global = true)]
    log_level: Option<String>,
    /// TOML settings file; CLI flags override its values.
    #[clap(short, long, global = true)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Serve {
        #[clap(short, long)]
        port: Option<u16>,
        #[clap(short, long)]
        database: Option<String>,
        #[clap(long)]
        cors_origin: Option<String>,
        #[clap(long)]
        site_url: Option<String>,
        #[clap(long)]
        upload_dir: Option<PathBuf>,
    },
    Migrate {
        #[clap(subcommand)]
        direction: server::MigrateDirection,
        #[clap(short, long)]
        database: Option<String>,
    },
    /// Creates the demo users, categories and layers.
    Seed {
        #[clap(short, long)]
        database: Option<String>,
    },
    /// Groups an upload's files the way the server would and prints them.
    CheckFiles { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(&args.log_level);

    let mut settings = Settings::load_or_default(args.config.as_deref())?;

    match args.command {
        Commands::Serve {
            port,
            database,
            cors_origin,
            site_url,
            upload_dir,
        } => {
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(database) = database {
                settings.database = database;
            }
            if let Some(site_url) = site_url {
                settings.site_url = site_url;
            }
            settings.cors_origin = cors_origin.or(settings.cors_origin);
            settings.upload_dir = upload_dir.or(settings.upload_dir);

            info!("Starting server on port {}", settings.port);
            server::start_server(settings).await?;
        }
        Commands::Migrate {
            direction,
            database,
        } => {
            let database = database.unwrap_or(settings.database);
            info!("Running database migration: {:?}", direction);
            server::migrate_database(&database, direction).await?;
        }
        Commands::Seed { database } => {
            let database = database.unwrap_or(settings.database);
            info!("Seeding database: {}", database);
            let db = establish_connection(&get_database_url(Some(&database))).await?;
            setup_database(&db).await?;
            seed_data::seed_demo_data(&db).await?;
        }
        Commands::CheckFiles { path } => {
            let file_name = path.to_string_lossy();
            info!("{} is a {} layer", file_name, layer_type(&file_name)?);
            for (kind, file) in get_files(&path)? {
                println!("{:>8}  {}", kind, file.display());
            }
        }
    }

    Ok(())
}

fn setup_logging(log_level: &Option<String>) {
    let log_level = match log_level
        .as_ref()
        .unwrap_or(&"info".to_string())
        .to_lowercase()
        .as_str()
    {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("sqlx=warn,{}", log_level)))
        .without_time()
        .init();
}
