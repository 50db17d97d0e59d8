//! Narrow read/write interface a live session needs from the remote store.

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{GamePatch, GameRecord},
    storage::StorageResult,
};

/// `get` / `update` access to one persisted game.
///
/// Implementations are expected to broadcast every successful update to the game's
/// realtime channel.
pub trait GameApi: Send + Sync {
    /// Load the full record.
    fn get(&self, id: Uuid) -> BoxFuture<'static, StorageResult<GameRecord>>;
    /// Write a partial update.
    fn update(&self, id: Uuid, patch: GamePatch) -> BoxFuture<'static, StorageResult<()>>;
}
