#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;

use crate::dao::models::{GamePatch, GameRecord};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for game records.
pub trait GameStore: Send + Sync {
    fn create_game(&self, game: GameRecord) -> BoxFuture<'static, StorageResult<()>>;
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;
    fn find_by_share_code(
        &self,
        share_code: String,
    ) -> BoxFuture<'static, StorageResult<Option<GameRecord>>>;
    /// Apply `patch` and return the stored record. Fails with `Missing` for unknown ids.
    fn update_game(
        &self,
        id: Uuid,
        patch: GamePatch,
    ) -> BoxFuture<'static, StorageResult<GameRecord>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
