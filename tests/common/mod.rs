//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use scorebug_back::{
    config::AppConfig,
    dao::{
        game_store::{GameStore, memory::MemoryGameStore},
        models::{GamePatch, GameRecord},
        storage::StorageResult,
    },
    dto::game::{CreateGameRequest, CreateGameResponse, TeamInput},
    services::{game_service, records::LogRecordsSink},
    state::{AppState, SharedState, game::GameMode},
};
use uuid::Uuid;

/// Memory store that keeps every patch it was asked to apply.
#[derive(Clone, Default)]
pub struct RecordingStore {
    pub inner: MemoryGameStore,
    updates: Arc<Mutex<Vec<GamePatch>>>,
}

impl RecordingStore {
    pub fn updates(&self) -> Vec<GamePatch> {
        self.updates.lock().unwrap().clone()
    }

    /// Writes that carried the debounced bundle.
    pub fn bundle_writes(&self) -> Vec<GamePatch> {
        self.updates()
            .into_iter()
            .filter(|patch| patch.display_state.is_some())
            .collect()
    }

    /// Current stored record.
    pub async fn record(&self, id: Uuid) -> GameRecord {
        self.inner.find_game(id).await.unwrap().unwrap()
    }

    /// Overwrite stored columns without going through the sessions.
    pub async fn tamper(&self, id: Uuid, patch: GamePatch) {
        self.inner.update_game(id, patch).await.unwrap();
    }
}

impl GameStore for RecordingStore {
    fn create_game(&self, game: GameRecord) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.create_game(game)
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        self.inner.find_game(id)
    }

    fn find_by_share_code(
        &self,
        share_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        self.inner.find_by_share_code(share_code)
    }

    fn update_game(
        &self,
        id: Uuid,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<GameRecord>> {
        self.updates.lock().unwrap().push(patch.clone());
        self.inner.update_game(id, patch)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.try_reconnect()
    }
}

/// Application state backed by a fresh recording store.
pub async fn app() -> (SharedState, RecordingStore) {
    let state = AppState::new(AppConfig::default(), Arc::new(LogRecordsSink));
    let store = RecordingStore::default();
    state.install_game_store(Arc::new(store.clone())).await;
    (state, store)
}

fn team(name: &str) -> TeamInput {
    TeamInput {
        name: name.into(),
        abbreviation: None,
        color: None,
    }
}

/// Create a full-rules game between the Hawks and the Owls.
pub async fn create_game(state: &SharedState) -> CreateGameResponse {
    game_service::create_game(
        state,
        CreateGameRequest {
            home_team: team("Hawks"),
            away_team: team("Owls"),
            mode: GameMode::Full,
        },
    )
    .await
    .unwrap()
}
