//! Outlrn API Library Crate
//!
//! This library contains the web service logic: configuration, application
//! state, the progress REST handlers, the teaching WebSocket, and routing.
//! The `api` binary is a thin wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod ws;
