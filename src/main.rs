use env_logger::Env;
use log::{info, warn};
use std::sync::Arc;
use swappy_server::auth::JwtSessions;
use swappy_server::config::AppConfig;
use swappy_server::drive::init_drive;
use swappy_server::shared::state::AppState;
use swappy_server::shared::utils::{create_conn, run_migrations};
use swappy_server::api_router::configure_api_routes;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    let pool = create_conn(&config)?;
    {
        let mut conn = pool.get()?;
        run_migrations(&mut conn)?;
    }
    info!("database ready at {}:{}", config.database.server, config.database.port);

    // Missing object storage degrades upload signing to 503 instead of
    // refusing to boot.
    let drive = match init_drive(&config.drive).await {
        Ok(client) => Some(client),
        Err(e) => {
            warn!("object storage unavailable: {e:#}");
            None
        }
    };

    let sessions = Arc::new(JwtSessions::new(config.session.jwt_secret.clone()));
    let state = Arc::new(AppState {
        config: config.clone(),
        conn: pool,
        drive,
        sessions,
    });

    let app = configure_api_routes()
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
