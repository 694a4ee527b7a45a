//! Wire protocol — the whiteboard event vocabulary.
//!
//! DESIGN
//! ======
//! Every message on the websocket is one JSON object tagged by `event`.
//! Payload keys are camelCase to match the browser client. Object payloads
//! are opaque: the relay never inspects drawing data beyond the `id` field,
//! which is extracted explicitly at this boundary.
//!
//! The client `modify` event carries a `live` flag; the dispatch layer maps
//! it to two distinct operations (preview vs commit) so the durability
//! difference is visible in the code, not hidden behind a boolean.

use serde::{Deserialize, Serialize};

/// Inbound events from a connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    /// Join a whiteboard room and request a full snapshot.
    Init { whiteboard_id: i64 },
    /// Create a new object. `object` must carry an `id` field.
    Add {
        whiteboard_id: i64,
        object: serde_json::Value,
    },
    /// Replace an object's state. `live` updates are never persisted.
    Modify {
        whiteboard_id: i64,
        object: serde_json::Value,
        #[serde(default)]
        live: bool,
    },
    /// Remove objects. Accepts either the batch or the single-object form.
    Delete {
        whiteboard_id: i64,
        #[serde(default)]
        objects: Option<Vec<serde_json::Value>>,
        #[serde(default)]
        object: Option<serde_json::Value>,
    },
    /// Remove every object on the whiteboard.
    Clear { whiteboard_id: i64 },
    /// Persist a z-order change. `action` is opaque to the relay.
    Layer {
        whiteboard_id: i64,
        object: serde_json::Value,
        action: String,
    },
    /// Advisory lock toggle. Broadcast only, never persisted by the relay.
    Lock { whiteboard_id: i64, is_locked: bool },
    Unlock { whiteboard_id: i64, is_locked: bool },
}

/// Outbound events to a connected client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Full snapshot, sent only to the connection that issued `init`.
    Load {
        whiteboard_id: i64,
        whiteboard: SceneSnapshot,
    },
    Add {
        whiteboard_id: i64,
        object: serde_json::Value,
    },
    Modify {
        whiteboard_id: i64,
        object: serde_json::Value,
    },
    /// Always the normalized batch form, even for single deletes.
    Delete {
        whiteboard_id: i64,
        objects: Vec<serde_json::Value>,
    },
    Clear { whiteboard_id: i64 },
    Layer {
        whiteboard_id: i64,
        object: serde_json::Value,
        action: String,
    },
    Lock { whiteboard_id: i64, is_locked: bool },
    Unlock { whiteboard_id: i64, is_locked: bool },
    /// Sent only to the connection whose request failed.
    Error { message: String },
}

/// Snapshot payload nested under `whiteboard` in the `load` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub objects: Vec<serde_json::Value>,
}

/// Extract the required `id` field from an opaque object payload.
#[must_use]
pub fn object_id(object: &serde_json::Value) -> Option<&str> {
    object.get("id").and_then(serde_json::Value::as_str)
}

/// Return a copy of `data` with `id` set, recreating the original identity.
/// Non-object payloads are wrapped so the id is never lost.
#[must_use]
pub fn with_object_id(data: &serde_json::Value, id: &str) -> serde_json::Value {
    let mut object = data.clone();
    match object.as_object_mut() {
        Some(map) => {
            map.insert("id".into(), serde_json::Value::String(id.into()));
            object
        }
        None => serde_json::json!({ "id": id, "data": object }),
    }
}

// =============================================================================
// TESTS
// =============================================================================
