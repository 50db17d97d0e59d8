use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        command::{CommandResponse, ControllerCommand},
        game::{CreateGameRequest, CreateGameResponse, ScoreboardView},
    },
    error::AppError,
    services::game_service,
    state::SharedState,
};

/// Routes used by the operator: game creation, control sessions and commands.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games", post(create_game))
        .route("/games/{id}", get(scoreboard))
        .route("/games/{id}/control", post(open_control).delete(close_control))
        .route("/games/{id}/commands", post(apply_command))
}

/// Create a game record and hand back its identifiers.
#[utoipa::path(
    post,
    path = "/games",
    tag = "game",
    request_body = CreateGameRequest,
    responses(
        (status = 201, description = "Game created", body = CreateGameResponse),
        (status = 400, description = "Invalid team definition"),
        (status = 503, description = "No storage backend")
    )
)]
pub async fn create_game(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateGameRequest>>,
) -> Result<(StatusCode, Json<CreateGameResponse>), AppError> {
    let created = game_service::create_game(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Open the controller session of a game, resuming its clocks.
#[utoipa::path(
    post,
    path = "/games/{id}/control",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game to control")),
    responses(
        (status = 200, description = "Session open", body = ScoreboardView),
        (status = 404, description = "Unknown game")
    )
)]
pub async fn open_control(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreboardView>, AppError> {
    let session = game_service::open_control(&state, id).await?;
    Ok(Json(session.snapshot().await.into()))
}

/// Tear the controller session down, flushing its pending write.
#[utoipa::path(
    delete,
    path = "/games/{id}/control",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game under control")),
    responses(
        (status = 204, description = "Session closed"),
        (status = 404, description = "No live session")
    )
)]
pub async fn close_control(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    game_service::close_control(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Apply one operator command.
///
/// Commands that are not legal right now come back with `applied = false` and the
/// reason; the scoreboard is unchanged in that case.
#[utoipa::path(
    post,
    path = "/games/{id}/commands",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game under control")),
    request_body = ControllerCommand,
    responses(
        (status = 200, description = "Command processed", body = CommandResponse),
        (status = 404, description = "No live session")
    )
)]
pub async fn apply_command(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(command): Json<ControllerCommand>,
) -> Result<Json<CommandResponse>, AppError> {
    let response = game_service::apply_command(&state, id, command).await?;
    Ok(Json(response))
}

/// Scoreboard as the controller sees it.
#[utoipa::path(
    get,
    path = "/games/{id}",
    tag = "game",
    params(("id" = Uuid, Path, description = "Game under control")),
    responses(
        (status = 200, description = "Current scoreboard", body = ScoreboardView),
        (status = 404, description = "No live session")
    )
)]
pub async fn scoreboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScoreboardView>, AppError> {
    Ok(Json(game_service::view(&state, id).await?))
}
