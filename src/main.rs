use axum::{
    http::{HeaderValue, Method},
    Extension,
};
use clubbee::{auth, config::Config};
use envconfig::Envconfig;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::init_from_env()?;
    if auth::development_mode() {
        tracing::warn!("JWT_SECRET is not set: accepting any bearer token (development mode)");
    }

    let repo = clubbee::repository(&config)?;

    let origins = config
        .allowed_origins()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(AllowOrigin::list(origins));

    let app = clubbee::app()
        .layer(Extension(repo))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server is running on {address}");

    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
