//! Library crate for scorebug-back: the live scoreboard engine plus the HTTP surface
//! hosting controller sessions and viewer streams.

pub mod clock;
pub mod config;
pub mod dao;
pub mod display;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
pub mod sync;
