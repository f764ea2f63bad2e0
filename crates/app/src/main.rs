use std::net::SocketAddr;

use chrono::Duration;
use migration::{Migrator, MigratorTrait};
use server::AuthConfig;

mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let settings = settings::Settings::new()?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "fintrack={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = connect(&settings.server.database).await?;

    let mut builder = engine::Engine::builder().database(db);
    if let Some(cost) = settings.auth.bcrypt_cost {
        builder = builder.bcrypt_cost(cost);
    }
    let engine = builder.build().await?;

    let auth = AuthConfig::new(
        &settings.auth.secret,
        Duration::minutes(settings.auth.access_ttl_minutes),
        Duration::days(settings.auth.refresh_ttl_days),
    );

    let bind = settings
        .server
        .bind
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let addr: SocketAddr = format!("{}:{}", bind, settings.server.port).parse()?;
    server::run(engine, auth, addr).await;

    Ok(())
}

async fn connect(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    if *config == settings::Database::Memory {
        tracing::warn!("using an in-memory database, data is lost on exit");
    }

    let database = sea_orm::Database::connect(config.url()).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
