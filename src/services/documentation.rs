use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Scorebug Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::game::create_game,
        crate::routes::game::open_control,
        crate::routes::game::close_control,
        crate::routes::game::apply_command,
        crate::routes::game::scoreboard,
        crate::routes::viewer::ws_handler,
        crate::routes::viewer::sse_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::game::CreateGameRequest,
            crate::dto::game::TeamInput,
            crate::dto::game::CreateGameResponse,
            crate::dto::game::ScoreboardView,
            crate::dto::command::ControllerCommand,
            crate::dto::command::CommandResponse,
            crate::dto::realtime::RealtimeMessage,
            crate::dto::sse::Handshake,
            crate::dao::models::GamePatch,
            crate::state::game::GameState,
            crate::state::state_machine::FinalResult,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "game", description = "Game creation and controller sessions"),
        (name = "viewer", description = "Realtime viewer streams"),
    )
)]
pub struct ApiDoc;
