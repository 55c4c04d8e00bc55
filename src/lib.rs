//! Chess rules, clocks and synchronisation for two-player online games,
//! a computer opponent, and the HTTP server the clients poll.

pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod models;
pub mod routes;
pub mod server;
pub mod sync;
