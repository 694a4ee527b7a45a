//! Classboard — real-time whiteboard relay for the school platform.
//!
//! ARCHITECTURE
//! ============
//! The server side is a room-based event relay: connections authenticate
//! with a session cookie, join one whiteboard room at a time, and exchange
//! mutation events that are persisted to Postgres before being fanned out
//! to room peers. Undo/redo never touches the server: [`history`] and
//! [`replay`] are the session-local pieces a client embeds to keep per-user
//! history over the shared scene.

pub mod db;
pub mod history;
pub mod protocol;
pub mod replay;
pub mod routes;
pub mod services;
pub mod state;
