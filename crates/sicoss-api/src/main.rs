//! # sicoss-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the SICOSS engine.
//! Binds to a configurable port (default 8080).

use sicoss_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    // Pool de Postgres desde DATABASE_URL o database.ini; sin configuración
    // el servicio arranca y responde 503 en las rutas que extraen.
    let db_pool = sicoss_db::init_pool(None).await.map_err(|e| {
        tracing::error!("inicialización de base de datos fallida: {e}");
        e
    })?;

    let state = AppState::new(db_pool);
    let app = sicoss_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("SICOSS API escuchando en {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
