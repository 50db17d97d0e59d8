use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dao::models::GamePatch;

/// Message carried by a game's realtime channel.
///
/// Serialized as `{"type": "game_update", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RealtimeMessage {
    /// Fields just written to the store.
    GameUpdate(GamePatch),
}
