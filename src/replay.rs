//! Undo/redo replay — turns a history record back into scene mutations.
//!
//! DESIGN
//! ======
//! Replay is a pure state machine over the connection's local scene: apply
//! the inverse (undo) or original (redo) effect of an action, then hand back
//! the matching outbound event so room peers converge on the same state.
//! Recreated objects keep their original id — replay never mints identity.
//!
//! A missing target means the object was raced away by a concurrent edit
//! from another user. That is a benign race: replay answers `None` and the
//! caller sends nothing.

use std::collections::HashMap;

use crate::history::{ActionKind, HistoryAction};
use crate::protocol::{ClientEvent, with_object_id};

/// The connection's local view of the scene, keyed by object id.
pub type LocalScene = HashMap<String, serde_json::Value>;

/// Which way a history record is being replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Undo,
    Redo,
}

/// Apply one history action to the local scene and return the relay event
/// peers need to converge. `None` means the target was already gone and
/// nothing changed.
#[must_use]
pub fn apply(
    scene: &mut LocalScene,
    whiteboard_id: i64,
    action: &HistoryAction,
    direction: Direction,
) -> Option<ClientEvent> {
    match (&action.kind, direction) {
        // Undoing an add removes the object; redoing a delete is the same move.
        (ActionKind::Add { object_id, data }, Direction::Undo)
        | (ActionKind::Delete { object_id, data }, Direction::Redo) => {
            scene.remove(object_id)?;
            Some(ClientEvent::Delete {
                whiteboard_id,
                objects: None,
                object: Some(with_object_id(data, object_id)),
            })
        }
        // Redoing an add recreates the object; undoing a delete is the same move.
        (ActionKind::Add { object_id, data }, Direction::Redo)
        | (ActionKind::Delete { object_id, data }, Direction::Undo) => {
            let object = with_object_id(data, object_id);
            scene.insert(object_id.clone(), object.clone());
            Some(ClientEvent::Add { whiteboard_id, object })
        }
        (ActionKind::Modify { object_id, before, after }, direction) => {
            let state = match direction {
                Direction::Undo => before,
                Direction::Redo => after,
            };
            if !scene.contains_key(object_id) {
                return None;
            }
            let object = with_object_id(state, object_id);
            scene.insert(object_id.clone(), object.clone());
            Some(ClientEvent::Modify { whiteboard_id, object, live: false })
        }
    }
}
