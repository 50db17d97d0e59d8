use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    clock::now_millis,
    dao::models::GameRecord,
    dto::{
        command::{CommandResponse, ControllerCommand},
        game::{CreateGameRequest, CreateGameResponse, ScoreboardView},
    },
    error::ServiceError,
    session::{ControllerSession, SessionDeps},
    state::{SharedState, game::GameState},
};

const SHARE_CODE_LENGTH: usize = 6;
/// Uppercase letters and digits minus the look-alikes `0`, `O`, `1` and `I`.
const SHARE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const SHARE_CODE_ATTEMPTS: usize = 8;

/// Persist a fresh game and hand back its identifiers.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<CreateGameResponse, ServiceError> {
    let store = state.require_game_store().await?;
    let share_code = unused_share_code(state).await?;

    let rules = &state.config().engine;
    let game_state = GameState {
        game_clock_seconds: rules.quarter_seconds,
        play_clock_seconds: rules.play_clock_seconds,
        home_timeouts: rules.regulation_timeouts,
        away_timeouts: rules.regulation_timeouts,
        ..GameState::default()
    };
    let now = now_millis();
    let record = GameRecord {
        id: Uuid::new_v4(),
        share_code,
        home_team: request.home_team.into(),
        away_team: request.away_team.into(),
        mode: request.mode,
        state: game_state,
        display_state: String::new(),
        created_at: now,
        updated_at: now,
    };
    let response = CreateGameResponse {
        id: record.id,
        share_code: record.share_code.clone(),
    };
    store.create_game(record).await?;
    info!(game_id = %response.id, share_code = %response.share_code, "game created");
    Ok(response)
}

async fn unused_share_code(state: &SharedState) -> Result<String, ServiceError> {
    let store = state.require_game_store().await?;
    for _ in 0..SHARE_CODE_ATTEMPTS {
        let code = generate_share_code();
        if store.find_by_share_code(code.clone()).await?.is_none() {
            return Ok(code);
        }
    }
    Err(ServiceError::InvalidState(
        "could not allocate a unique share code".into(),
    ))
}

fn generate_share_code() -> String {
    let mut rng = rand::rng();
    (0..SHARE_CODE_LENGTH)
        .map(|_| {
            let index = rng.random_range(0..SHARE_CODE_ALPHABET.len());
            char::from(SHARE_CODE_ALPHABET[index])
        })
        .collect()
}

/// Open the controller session of `id`, or return the live one.
pub async fn open_control(
    state: &SharedState,
    id: Uuid,
) -> Result<Arc<ControllerSession>, ServiceError> {
    if let Some(session) = state.sessions().get(&id) {
        return Ok(Arc::clone(session.value()));
    }

    let deps = SessionDeps {
        api: Arc::new(state.gateway().clone()),
        hub: Arc::clone(state.realtime()),
        records: state.records(),
        rules: state.config().engine.clone(),
    };
    let opened = Arc::new(ControllerSession::open(deps, id).await?);

    let session = Arc::clone(
        state
            .sessions()
            .entry(id)
            .or_insert_with(|| Arc::clone(&opened))
            .value(),
    );
    if !Arc::ptr_eq(&session, &opened) {
        // Lost the race against a concurrent open.
        opened.shutdown().await;
    }
    Ok(session)
}

/// Tear down the controller session of `id`.
pub async fn close_control(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let Some((_, session)) = state.sessions().remove(&id) else {
        return Err(ServiceError::NotFound(format!(
            "no controller session for game `{id}`"
        )));
    };
    session.shutdown().await;
    Ok(())
}

/// Tear down every live session; used on server shutdown.
pub async fn close_all(state: &SharedState) {
    let ids: Vec<Uuid> = state.sessions().iter().map(|entry| *entry.key()).collect();
    for id in ids {
        if let Err(err) = close_control(state, id).await {
            warn!(game_id = %id, error = %err, "failed to close controller session");
        }
    }
}

/// Apply one operator command to the live session of `id`.
pub async fn apply_command(
    state: &SharedState,
    id: Uuid,
    command: ControllerCommand,
) -> Result<CommandResponse, ServiceError> {
    let session = live_session(state, id)?;
    let outcome = session.apply(|board| command.apply(board)).await;
    let scoreboard = ScoreboardView::from(session.snapshot().await);
    Ok(CommandResponse::new(outcome, scoreboard))
}

/// Scoreboard of the live session of `id`.
pub async fn view(state: &SharedState, id: Uuid) -> Result<ScoreboardView, ServiceError> {
    let session = live_session(state, id)?;
    Ok(session.snapshot().await.into())
}

fn live_session(state: &SharedState, id: Uuid) -> Result<Arc<ControllerSession>, ServiceError> {
    state
        .sessions()
        .get(&id)
        .map(|entry| Arc::clone(entry.value()))
        .ok_or_else(|| ServiceError::NotFound(format!("no controller session for game `{id}`")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        dao::{api::GameApi, game_store::memory::MemoryGameStore},
        dto::game::TeamInput,
        services::records::LogRecordsSink,
        state::{AppState, game::GameMode},
    };

    fn team(name: &str) -> TeamInput {
        TeamInput {
            name: name.into(),
            abbreviation: None,
            color: None,
        }
    }

    async fn state_with_memory_store() -> SharedState {
        let state = AppState::new(AppConfig::default(), Arc::new(LogRecordsSink));
        state
            .install_game_store(Arc::new(MemoryGameStore::new()))
            .await;
        state
    }

    #[test]
    fn share_codes_use_the_unambiguous_alphabet() {
        for _ in 0..32 {
            let code = generate_share_code();
            assert_eq!(code.len(), SHARE_CODE_LENGTH);
            assert!(code.bytes().all(|b| SHARE_CODE_ALPHABET.contains(&b)));
        }
    }

    #[tokio::test]
    async fn create_requires_a_store() {
        let state = AppState::new(AppConfig::default(), Arc::new(LogRecordsSink));
        let request = CreateGameRequest {
            home_team: team("Hawks"),
            away_team: team("Owls"),
            mode: GameMode::Full,
        };
        let err = create_game(&state, request).await.unwrap_err();
        assert!(matches!(err, ServiceError::Degraded));
    }

    #[tokio::test]
    async fn commands_flow_through_one_shared_session() {
        let state = state_with_memory_store().await;
        let created = create_game(
            &state,
            CreateGameRequest {
                home_team: team(" Hawks "),
                away_team: team("Owls"),
                mode: GameMode::Full,
            },
        )
        .await
        .unwrap();

        let first = open_control(&state, created.id).await.unwrap();
        let second = open_control(&state, created.id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let response = apply_command(
            &state,
            created.id,
            ControllerCommand::SetDown { down: 3 },
        )
        .await
        .unwrap();
        assert!(response.applied);
        assert_eq!(response.scoreboard.state.down, 3);
        assert_eq!(response.scoreboard.home_team.name, "Hawks");
        assert_eq!(response.scoreboard.game_clock, "15:00");

        let rejected = apply_command(
            &state,
            created.id,
            ControllerCommand::SetDown { down: 9 },
        )
        .await
        .unwrap();
        assert!(!rejected.applied);
        assert!(rejected.reason.is_some());

        close_control(&state, created.id).await.unwrap();
        assert!(matches!(
            view(&state, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
        let stored = state.gateway().get(created.id).await.unwrap();
        assert_eq!(stored.state.down, 3);
    }

    #[tokio::test]
    async fn unknown_game_cannot_be_controlled() {
        let state = state_with_memory_store().await;
        let Err(err) = open_control(&state, Uuid::new_v4()).await else {
            panic!("an unknown game must not open a session");
        };
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
