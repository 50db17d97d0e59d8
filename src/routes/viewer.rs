use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::{
        IntoResponse,
        sse::{Event, Sse},
    },
    routing::get,
};
use futures::Stream;

use crate::{error::AppError, services::viewer_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/ws/games/{share_code}",
    tag = "viewer",
    params(("share_code" = String, Path, description = "Code the game was shared under")),
    responses(
        (status = 101, description = "Switching protocols to WebSocket"),
        (status = 404, description = "Unknown share code")
    )
)]
/// Upgrade to a WebSocket carrying the raw `game_update` messages of a game.
pub async fn ws_handler(
    State(state): State<SharedState>,
    Path(share_code): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, AppError> {
    let record = viewer_service::find_by_share_code(&state, &share_code).await?;
    Ok(ws.on_upgrade(move |socket| viewer_service::handle_socket(state, socket, record)))
}

#[utoipa::path(
    get,
    path = "/sse/games/{share_code}",
    tag = "viewer",
    params(("share_code" = String, Path, description = "Code the game was shared under")),
    responses(
        (status = 200, description = "Scoreboard stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown share code")
    )
)]
/// Stream fully resolved scoreboards of a game.
pub async fn sse_handler(
    State(state): State<SharedState>,
    Path(share_code): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let record = viewer_service::find_by_share_code(&state, &share_code).await?;
    let degraded = state.is_degraded().await;
    Ok(viewer_service::scoreboard_stream(state, record, degraded))
}

/// Configure the viewer endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/ws/games/{share_code}", get(ws_handler))
        .route("/sse/games/{share_code}", get(sse_handler))
}
