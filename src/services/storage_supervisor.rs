use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{game_store::GameStore, storage::StorageError},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Keep a storage backend installed in `state`, flipping degraded mode while it is
/// unreachable.
///
/// `connect` builds a fresh backend. Once installed the backend is health-checked every
/// few seconds; a failed check is followed by a few in-place reconnects before the
/// supervisor drops the backend and connects from scratch.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn GameStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        let store = match connect().await {
            Ok(store) => store,
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = next_delay(delay);
                continue;
            }
        };

        state.install_game_store(Arc::clone(&store)).await;
        info!("storage connection established; leaving degraded mode");
        delay = INITIAL_DELAY;

        watch(&state, store.as_ref()).await;

        warn!("storage lost; dropping backend and reconnecting");
        state.clear_game_store().await;
        sleep(delay).await;
        delay = next_delay(delay);
    }
}

/// Poll `store` until it fails and cannot be revived in place.
async fn watch(state: &SharedState, store: &dyn GameStore) {
    loop {
        if store.health_check().await.is_ok() {
            if state.is_degraded().await {
                info!("storage healthy again; leaving degraded mode");
                state.update_degraded(false).await;
            }
            sleep(HEALTH_POLL_INTERVAL).await;
            continue;
        }

        if !revive(state, store).await {
            return;
        }
        state.update_degraded(false).await;
        sleep(HEALTH_POLL_INTERVAL).await;
    }
}

async fn revive(state: &SharedState, store: &dyn GameStore) -> bool {
    let mut delay = INITIAL_DELAY;
    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) if attempt == 0 => {
                warn!(attempt, error = %err, "storage reconnect failed; entering degraded mode");
                state.update_degraded(true).await;
            }
            Err(err) => warn!(attempt, error = %err, "storage reconnect attempt failed"),
        }
        sleep(delay).await;
        delay = next_delay(delay);
    }
    warn!("exhausted storage reconnect attempts");
    false
}

fn next_delay(delay: Duration) -> Duration {
    (delay * 2).min(MAX_DELAY)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use futures::future::BoxFuture;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            game_store::memory::MemoryGameStore,
            models::{GamePatch, GameRecord},
            storage::StorageResult,
        },
        services::records::LogRecordsSink,
        state::AppState,
    };

    /// Memory store whose health can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryGameStore,
        down: AtomicBool,
    }

    impl FlakyStore {
        fn status(&self) -> StorageResult<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(StorageError::unavailable(
                    "down".into(),
                    std::io::Error::other("down"),
                ))
            } else {
                Ok(())
            }
        }
    }

    impl GameStore for FlakyStore {
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
            self.inner.update_game(id, patch)
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let status = self.status();
            Box::pin(async move { status })
        }

        fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
            let status = self.status();
            Box::pin(async move { status })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn lost_backend_is_replaced_by_a_fresh_connection() {
        let state = AppState::new(AppConfig::default(), Arc::new(LogRecordsSink));
        let first = Arc::new(FlakyStore::default());
        let connects = Arc::new(AtomicUsize::new(0));

        let handle = {
            let first = Arc::clone(&first);
            let connects = Arc::clone(&connects);
            tokio::spawn(run(state.clone(), move || {
                let n = connects.fetch_add(1, Ordering::SeqCst);
                let store: Arc<dyn GameStore> = if n == 0 {
                    first.clone()
                } else {
                    Arc::new(FlakyStore::default())
                };
                async move { Ok(store) }
            }))
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!state.is_degraded().await);
        assert_eq!(connects.load(Ordering::SeqCst), 1);

        first.down.store(true, Ordering::SeqCst);
        // Next poll fails, first reconnect attempt flips degraded mode.
        tokio::time::sleep(HEALTH_POLL_INTERVAL + Duration::from_millis(10)).await;
        assert!(state.is_degraded().await);

        // Reconnect attempts back off 1s, 2s, 4s, then the supervisor waits 1s more.
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(connects.load(Ordering::SeqCst), 2);
        assert!(!state.is_degraded().await);

        handle.abort();
    }
}
