//! WebSocket Session Management
//!
//! This module contains the logic for real-time teaching sessions over
//! WebSockets. It is structured into submodules:
//!
//! - `protocol`: Defines the JSON-based message format for client-server communication.
//! - `session`: Manages the WebSocket connection lifecycle and the per-connection director.
//! - `narrator`: Relays narration to the browser and waits for its playback reports.

pub mod narrator;
pub mod protocol;
pub mod session;

pub use session::ws_handler;
