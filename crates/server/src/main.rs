use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use server::{
    AppState, Server, auth::JwtService, config::ServerConfig, init_tracing,
    realtime::rooms::RoomRegistry,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    tracing::info!("running database migrations");
    sqlx::migrate!("./migrations").run(&pool).await?;

    let jwt = Arc::new(JwtService::new(config.auth.jwt_secret())?);
    let rooms = Arc::new(RoomRegistry::new());
    let state = AppState::new(pool, config, jwt, rooms);

    Server::bind(state).await?.serve().await
}
