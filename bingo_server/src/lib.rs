//! HTTP/WebSocket server for the bingo game engine.
//!
//! The binary in `main.rs` wires configuration, logging and metrics around
//! [`api::create_router`]; everything is exposed here so router tests can
//! build the same application in-process.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
