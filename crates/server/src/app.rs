use anyhow::Context as _;
use axum::{Router, http::HeaderValue, http::Method};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{AppState, routes};

/// A bound, ready-to-serve instance of the application. Binding is split
/// from serving so tests can bind to an ephemeral port and read it back.
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    pub async fn bind(state: AppState) -> anyhow::Result<Self> {
        let cors = cors_layer(&state)?;
        let listen_addr = state.config().listen_addr.clone();
        let router = routes::router(&state)
            .layer(TraceLayer::new_for_http())
            .layer(cors)
            .with_state(state);

        let listener = TcpListener::bind(&listen_addr)
            .await
            .with_context(|| format!("failed to bind {listen_addr}"))?;
        Ok(Self { listener, router })
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        tracing::info!(addr = %self.listener.local_addr()?, "server listening");
        axum::serve(self.listener, self.router).await?;
        Ok(())
    }
}

fn cors_layer(state: &AppState) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Ok(match &state.config().cors_origin {
        Some(origin) => {
            let origin: HeaderValue = origin
                .parse()
                .with_context(|| format!("invalid CORS_ORIGIN `{origin}`"))?;
            cors.allow_origin(origin)
        }
        None => cors.allow_origin(Any),
    })
}
