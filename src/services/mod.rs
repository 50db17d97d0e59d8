/// OpenAPI documentation generation.
pub mod documentation;
/// Game creation, controller sessions and operator commands.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Final result reporting.
pub mod records;
/// Storage backend supervision and degraded mode.
pub mod storage_supervisor;
/// Viewer WebSocket and SSE streams.
pub mod viewer_service;
