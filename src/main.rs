use std::net::SocketAddr;

use sandgrid::config::{self, Config};
use sandgrid::{routes, state};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let port: u16 = config::env_parse("PORT", config::DEFAULT_PORT);
    let config = Config::from_env();
    let state = state::AppState::new(config);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(
        %port,
        grid_width = config.grid_width,
        grid_height = config.grid_height,
        "sandgrid listening"
    );
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server failed");
}
