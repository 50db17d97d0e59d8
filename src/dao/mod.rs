/// Session-facing read/write interface.
pub mod api;
/// Game record storage backends.
pub mod game_store;
/// Persisted record and patch definitions.
pub mod models;
/// Storage error types shared by every backend.
pub mod storage;
