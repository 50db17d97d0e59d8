pub mod game;
pub mod overlays;
pub mod penalty;
pub mod realtime;
pub mod state_machine;

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        api::GameApi,
        game_store::GameStore,
        models::{GamePatch, GameRecord},
        storage::{StorageError, StorageResult},
    },
    dto::realtime::RealtimeMessage,
    error::ServiceError,
    services::records::RecordsSink,
    session::ControllerSession,
};

pub use self::realtime::RealtimeHub;

pub type SharedState = Arc<AppState>;

/// Messages buffered per realtime subscriber before it starts lagging.
const REALTIME_CAPACITY: usize = 64;

/// Central application state: storage slot, realtime hub and live controller sessions.
pub struct AppState {
    config: AppConfig,
    gateway: StoreGateway,
    sessions: DashMap<Uuid, Arc<ControllerSession>>,
    records: Arc<dyn RecordsSink>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, records: Arc<dyn RecordsSink>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            gateway: StoreGateway::new(Arc::new(RealtimeHub::new(REALTIME_CAPACITY))),
            sessions: DashMap::new(),
            records,
            degraded: degraded_tx,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Store access that publishes every write to the realtime hub.
    pub fn gateway(&self) -> &StoreGateway {
        &self.gateway
    }

    /// Realtime channels keyed by share code.
    pub fn realtime(&self) -> &Arc<RealtimeHub> {
        self.gateway.hub()
    }

    /// Sink receiving final results.
    pub fn records(&self) -> Arc<dyn RecordsSink> {
        self.records.clone()
    }

    /// Live controller sessions keyed by game id.
    pub fn sessions(&self) -> &DashMap<Uuid, Arc<ControllerSession>> {
        &self.sessions
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        self.gateway.store().await
    }

    /// Obtain the current game store or fail with [`ServiceError::Degraded`].
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn install_game_store(&self, store: Arc<dyn GameStore>) {
        self.gateway.install(store).await;
        self.update_degraded(false).await;
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        self.gateway.clear().await;
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow() || self.game_store().await.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            let changed = *current != value;
            *current = value;
            changed
        });
    }
}

/// The session-facing store: reads and writes through the installed backend and echoes
/// each applied patch on the game's realtime channel.
#[derive(Clone)]
pub struct StoreGateway {
    store: Arc<RwLock<Option<Arc<dyn GameStore>>>>,
    hub: Arc<RealtimeHub>,
}

impl StoreGateway {
    /// Gateway with no backend installed.
    pub fn new(hub: Arc<RealtimeHub>) -> Self {
        Self {
            store: Arc::new(RwLock::new(None)),
            hub,
        }
    }

    /// Realtime hub the gateway publishes to.
    pub fn hub(&self) -> &Arc<RealtimeHub> {
        &self.hub
    }

    async fn store(&self) -> Option<Arc<dyn GameStore>> {
        self.store.read().await.as_ref().cloned()
    }

    async fn install(&self, store: Arc<dyn GameStore>) {
        *self.store.write().await = Some(store);
    }

    async fn clear(&self) {
        self.store.write().await.take();
    }
}

impl GameApi for StoreGateway {
    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<GameRecord>> {
        let gateway = self.clone();
        Box::pin(async move {
            let store = gateway.store().await.ok_or(StorageError::Detached)?;
            store
                .find_game(id)
                .await?
                .ok_or(StorageError::Missing { id })
        })
    }

    fn update(&self, id: Uuid, patch: GamePatch) -> BoxFuture<'static, StorageResult<()>> {
        let gateway = self.clone();
        Box::pin(async move {
            let store = gateway.store().await.ok_or(StorageError::Detached)?;
            let record = store.update_game(id, patch.clone()).await?;
            gateway
                .hub
                .publish(&record.share_code, RealtimeMessage::GameUpdate(patch));
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::game_store::memory::MemoryGameStore,
        services::records::LogRecordsSink,
        state::game::{GameMode, GameState, TeamInfo},
    };

    #[tokio::test]
    async fn gateway_requires_a_backend_and_echoes_updates() {
        let state = AppState::new(AppConfig::default(), Arc::new(LogRecordsSink));
        assert!(state.is_degraded().await);
        let id = Uuid::new_v4();
        let err = state.gateway().get(id).await.unwrap_err();
        assert!(matches!(err, StorageError::Detached));

        let store = MemoryGameStore::new();
        store
            .create_game(GameRecord {
                id,
                share_code: "QWE123".into(),
                home_team: TeamInfo::default(),
                away_team: TeamInfo::default(),
                mode: GameMode::Full,
                state: GameState::default(),
                display_state: String::new(),
                created_at: 0,
                updated_at: 0,
            })
            .await
            .unwrap();
        state.install_game_store(Arc::new(store)).await;
        assert!(!state.is_degraded().await);

        let mut updates = state.realtime().subscribe("qwe123");
        let patch = GamePatch {
            score_away: Some(3),
            ..Default::default()
        };
        state.gateway().update(id, patch.clone()).await.unwrap();
        assert_eq!(
            updates.recv().await.unwrap(),
            RealtimeMessage::GameUpdate(patch)
        );
        assert_eq!(state.gateway().get(id).await.unwrap().state.score_away, 3);
    }
}
