use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use newsboard::db::{self, PgStore};

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let pool = db::init_pool()?;
    tracing::info!(connections = pool.max_size(), "database pool ready");

    newsboard::rocket(PgStore::new(pool)).launch().await?;
    Ok(())
}
