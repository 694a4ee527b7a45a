//! Room service — membership and broadcast fan-out.
//!
//! DESIGN
//! ======
//! A room is the broadcast scope for one whiteboard. Membership is ephemeral
//! and never persisted: a connection joins on `init`, is moved when it inits
//! a different whiteboard, and lapses on disconnect. The last member leaving
//! evicts the room entry entirely.

use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::protocol::ServerEvent;
use crate::state::AppState;

/// Add a connection to a whiteboard room, creating the room if needed.
pub async fn join_room(
    state: &AppState,
    whiteboard_id: i64,
    client_id: Uuid,
    tx: mpsc::Sender<ServerEvent>,
) {
    let mut rooms = state.rooms.write().await;
    let room = rooms.entry(whiteboard_id).or_default();
    room.clients.insert(client_id, tx);
    info!(%whiteboard_id, %client_id, clients = room.clients.len(), "client joined room");
}

/// Remove a connection from a whiteboard room. Evicts the room when empty.
pub async fn leave_room(state: &AppState, whiteboard_id: i64, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(&whiteboard_id) else {
        return;
    };

    room.clients.remove(&client_id);
    info!(%whiteboard_id, %client_id, remaining = room.clients.len(), "client left room");

    if room.clients.is_empty() {
        rooms.remove(&whiteboard_id);
        info!(%whiteboard_id, "evicted empty room");
    }
}

/// Broadcast an event to all clients in a room, optionally excluding one.
/// The excluded connection is the sender, which already holds local state.
pub async fn broadcast(state: &AppState, whiteboard_id: i64, event: &ServerEvent, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(&whiteboard_id) else {
        return;
    };

    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(event.clone());
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
