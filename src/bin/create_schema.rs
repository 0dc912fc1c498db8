//! Idempotent schema creation for the credit card demo database.
//!
//! Run once before starting the chat server. Re-running on an initialized
//! database leaves existing tables and data untouched.

use card_analytics_api::config::{DatabaseSettings, Settings};
use card_analytics_api::infrastructure::setup;
use log::info;
use sqlx::any::AnyPoolOptions;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let settings = Settings::from_env().map_err(|e| anyhow::anyhow!(e))?;

    sqlx::any::install_default_drivers();
    let url = match &settings.database {
        DatabaseSettings::Sqlite { path } => {
            if let Some(parent) = Path::new(path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            // rwc: create the database file on first run
            format!("sqlite:{path}?mode=rwc")
        }
        other => other.url(),
    };
    let pool = AnyPoolOptions::new().connect(&url).await?;

    setup::create_schema(&pool, &settings.database).await?;

    info!("Database schema created successfully.");
    Ok(())
}
