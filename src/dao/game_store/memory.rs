use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::{
    clock::now_millis,
    dao::{
        game_store::GameStore,
        models::{GamePatch, GameRecord},
        storage::{StorageError, StorageResult},
    },
};

/// Process-local store. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryGameStore {
    games: Arc<DashMap<Uuid, GameRecord>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameStore for MemoryGameStore {
    fn create_game(&self, game: GameRecord) -> BoxFuture<'static, StorageResult<()>> {
        let games = self.games.clone();
        Box::pin(async move {
            games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let games = self.games.clone();
        Box::pin(async move { Ok(games.get(&id).map(|entry| entry.value().clone())) })
    }

    fn find_by_share_code(
        &self,
        share_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecord>>> {
        let games = self.games.clone();
        Box::pin(async move {
            Ok(games
                .iter()
                .find(|entry| entry.share_code.eq_ignore_ascii_case(&share_code))
                .map(|entry| entry.value().clone()))
        })
    }

    fn update_game(
        &self,
        id: Uuid,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<GameRecord>> {
        let games = self.games.clone();
        Box::pin(async move {
            let mut entry = games.get_mut(&id).ok_or(StorageError::Missing { id })?;
            entry.apply(&patch);
            entry.updated_at = now_millis();
            Ok(entry.value().clone())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::game::{GameMode, GameState, TeamInfo};

    fn record(code: &str) -> GameRecord {
        GameRecord {
            id: Uuid::new_v4(),
            share_code: code.into(),
            home_team: TeamInfo::default(),
            away_team: TeamInfo::default(),
            mode: GameMode::Full,
            state: GameState::default(),
            display_state: String::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn update_applies_patch_and_stamps_time() {
        let store = MemoryGameStore::new();
        let game = record("KX4Q2P");
        let id = game.id;
        store.create_game(game).await.unwrap();

        let updated = store
            .update_game(
                id,
                GamePatch {
                    score_home: Some(3),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.state.score_home, 3);
        assert!(updated.updated_at > 0);

        let found = store.find_by_share_code("kx4q2p".into()).await.unwrap();
        assert_eq!(found.map(|game| game.id), Some(id));
    }

    #[tokio::test]
    async fn update_of_unknown_game_is_missing() {
        let store = MemoryGameStore::new();
        let err = store
            .update_game(Uuid::new_v4(), GamePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Missing { .. }));
    }
}
