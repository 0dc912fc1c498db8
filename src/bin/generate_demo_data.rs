//! Demo data generator: ~10,000 synthetic users with one year of purchase
//! history. Clears any existing users and purchases first; run
//! `create_schema` beforehand.

use card_analytics_api::config::Settings;
use card_analytics_api::infrastructure::setup;
use log::info;
use sqlx::any::AnyPoolOptions;

const NUM_USERS: i64 = 10_000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let settings = Settings::from_env().map_err(|e| anyhow::anyhow!(e))?;

    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .connect(&settings.database.url())
        .await?;

    setup::generate_demo_data(&pool, NUM_USERS).await?;

    info!("Demo data generation complete!");
    Ok(())
}
