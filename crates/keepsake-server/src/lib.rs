pub mod api;
pub mod feed;
pub mod gateway;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use keepsake_db::Database;

use crate::api::{AppState, AppStateInner};
use crate::feed::Feed;

/// Assemble the HTTP API and the feed gateway around an open store.
pub fn app(db: Database, feed: Feed) -> Router {
    let state: AppState = Arc::new(AppStateInner { db, feed });

    Router::new()
        .route("/messages", get(api::list_messages))
        .route("/messages", post(api::create_message))
        .route("/feed", get(feed_upgrade))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn feed_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let feed = state.feed.clone();
    ws.on_upgrade(move |socket| gateway::handle_subscriber(socket, feed))
}
