use std::sync::Arc;

use sqlx::PgPool;

use crate::{auth::JwtService, config::ServerConfig, realtime::rooms::RoomRegistry};

#[derive(Clone)]
pub struct AppState {
    pool: PgPool,
    config: Arc<ServerConfig>,
    jwt: Arc<JwtService>,
    rooms: Arc<RoomRegistry>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        config: ServerConfig,
        jwt: Arc<JwtService>,
        rooms: Arc<RoomRegistry>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            jwt,
            rooms,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn jwt(&self) -> Arc<JwtService> {
        Arc::clone(&self.jwt)
    }

    pub fn rooms(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.rooms)
    }
}
