pub mod handlers;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use handlers::ApiState;

/// All routes, nested under `/api`.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/", get(handlers::handle_info))
        .route("/canon", get(handlers::handle_canon))
        .route("/canon.json", get(handlers::handle_canon))
        .route("/assets", get(handlers::handle_assets))
        .route("/assets.ndjson", get(handlers::handle_assets))
        .route("/play", get(handlers::handle_play).post(handlers::handle_play))
        .route("/pause", get(handlers::handle_pause).post(handlers::handle_pause))
        .route("/stop", get(handlers::handle_stop).post(handlers::handle_stop))
        .route("/seek", get(handlers::handle_seek).post(handlers::handle_seek))
        .route("/speed", get(handlers::handle_speed).post(handlers::handle_speed))
        .route("/chunk/{index}", get(handlers::handle_chunk))
        .route("/fano/{point}", get(handlers::handle_fano))
        .route("/packet", post(handlers::handle_packet_decode))
        .route("/packet/{index}", get(handlers::handle_packet_encode))
        .route("/ws/info", get(handlers::handle_ws_info))
        .route("/ws", get(handlers::handle_ws))
        .route("/events", get(handlers::handle_events))
        .route("/subscribers", get(handlers::handle_subscribers))
        .route("/daemon/shutdown", post(handlers::handle_shutdown))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

/// Bind `bind_addr:port` and serve until the shutdown channel fires.
pub async fn serve(state: ApiState, bind_addr: &str, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind((bind_addr, port)).await?;
    tracing::info!(addr = %listener.local_addr()?, "API listening");
    serve_on(listener, state).await
}

/// Serve on an already-bound listener. Tests bind port 0 and pass it here.
pub async fn serve_on(listener: TcpListener, state: ApiState) -> anyhow::Result<()> {
    let mut shutdown = state.shutdown_tx.subscribe();
    let app = router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;
    Ok(())
}
