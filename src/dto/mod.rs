pub mod command;
pub mod game;
pub mod health;
pub mod realtime;
pub mod sse;
pub mod validation;
