//! Domain services used by the websocket route.
//!
//! ARCHITECTURE
//! ============
//! Service modules own membership, persistence, and auth concerns so the
//! route handler can stay focused on protocol translation and dispatch.

pub mod room;
pub mod scene;
pub mod session;
