//! WebSocket handler — whiteboard event relay.
//!
//! DESIGN
//! ======
//! On upgrade, validates the session cookie and enters a `select!` loop:
//! - Incoming client events → parse + dispatch by event tag
//! - Broadcast events from room peers → forward to client
//!
//! Handler functions are pure business logic — they persist, then return an
//! `Outcome`. The dispatch layer owns all outbound concerns: reply to sender
//! and broadcast to room peers. Persistence always completes before any
//! broadcast, so a failed write is reported to the sender alone and peers
//! never see a phantom mutation.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → session cookie validated, connection carries the user id
//! 2. Client sends `init` → joins the room, receives a `load` snapshot
//! 3. Mutation events → persist → broadcast to peers (sender excluded)
//! 4. Close → leave current room → cleanup

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::CookieJar;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::protocol::{self, ClientEvent, SceneSnapshot, ServerEvent};
use crate::services::scene::{self, SceneError};
use crate::services::{room, session};
use crate::state::AppState;

const SESSION_COOKIE: &str = "session_token";

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send events directly.
enum Outcome {
    /// Send to the requesting connection only (the `load` snapshot).
    Reply(ServerEvent),
    /// Broadcast to every other member of the whiteboard's room. The sender
    /// already holds its optimistic local state and never gets an echo.
    Broadcast { whiteboard_id: i64, event: ServerEvent },
}

#[derive(Debug, thiserror::Error)]
enum RelayError {
    #[error("object is missing an id")]
    MissingObjectId,
    #[error(transparent)]
    Scene(#[from] SceneError),
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, jar: CookieJar, ws: WebSocketUpgrade) -> Response {
    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return (StatusCode::UNAUTHORIZED, "session cookie required").into_response();
    };

    match session::validate_session(&state.pool, cookie.value()).await {
        Ok(Some(user)) => ws.on_upgrade(move |socket| run_ws(socket, state, user.id)),
        Ok(None) => (StatusCode::UNAUTHORIZED, "invalid or expired session").into_response(),
        Err(e) => {
            tracing::error!(error = %e, "ws: session validation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "session validation error").into_response()
        }
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, user_id: Uuid) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast events from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerEvent>(256);

    info!(%client_id, %user_id, "ws: client connected");

    // The room this connection has joined, mutated only by `init`.
    let mut current_room: Option<i64> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let replies =
                            process_inbound_text(&state, &mut current_room, client_id, user_id, &client_tx, &text)
                                .await;
                        for event in replies {
                            let _ = send_event(&mut socket, &event).await;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(event) = client_rx.recv() => {
                if send_event(&mut socket, &event).await.is_err() {
                    break;
                }
            }
        }
    }

    // Room membership is not persisted; leaving is the only cleanup.
    if let Some(whiteboard_id) = current_room {
        room::leave_room(&state, whiteboard_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// EVENT DISPATCH
// =============================================================================

/// Parse and process one inbound text event and return events for the
/// sender. Broadcasts to room peers happen inside.
///
/// This keeps the websocket transport concerns separate from event handling,
/// so tests can exercise dispatch and broadcast behavior end-to-end.
async fn process_inbound_text(
    state: &AppState,
    current_room: &mut Option<i64>,
    client_id: Uuid,
    user_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    text: &str,
) -> Vec<ServerEvent> {
    let event: ClientEvent = match serde_json::from_str(text) {
        Ok(event) => event,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound event");
            return vec![ServerEvent::Error { message: format!("invalid json: {e}") }];
        }
    };

    let result = match event {
        ClientEvent::Init { whiteboard_id } => {
            handle_init(state, current_room, client_id, client_tx, whiteboard_id).await
        }
        ClientEvent::Add { whiteboard_id, object } => handle_add(state, whiteboard_id, object).await,
        ClientEvent::Modify { whiteboard_id, object, live } => {
            if live {
                Ok(preview_modify(whiteboard_id, object))
            } else {
                commit_modify(state, whiteboard_id, object).await
            }
        }
        ClientEvent::Delete { whiteboard_id, objects, object } => {
            handle_delete(state, whiteboard_id, objects, object).await
        }
        ClientEvent::Clear { whiteboard_id } => handle_clear(state, whiteboard_id).await,
        ClientEvent::Layer { whiteboard_id, object, action } => {
            handle_layer(state, whiteboard_id, object, action).await
        }
        // Lock signaling is advisory: broadcast only, nothing persisted, and
        // the relay does not itself reject mutations on locked whiteboards.
        ClientEvent::Lock { whiteboard_id, is_locked } => {
            Ok(Outcome::Broadcast { whiteboard_id, event: ServerEvent::Lock { whiteboard_id, is_locked } })
        }
        ClientEvent::Unlock { whiteboard_id, is_locked } => {
            Ok(Outcome::Broadcast { whiteboard_id, event: ServerEvent::Unlock { whiteboard_id, is_locked } })
        }
    };

    // Apply outcome — the dispatch layer owns all outbound logic.
    match result {
        Ok(Outcome::Reply(event)) => vec![event],
        Ok(Outcome::Broadcast { whiteboard_id, event }) => {
            room::broadcast(state, whiteboard_id, &event, Some(client_id)).await;
            vec![]
        }
        Err(e) => {
            warn!(%client_id, %user_id, error = %e, "ws: event handler failed");
            vec![ServerEvent::Error { message: e.to_string() }]
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Join the whiteboard's room (leaving any previous one) and reply with a
/// full snapshot, ordered by creation time. A whiteboard with zero objects
/// is a valid empty snapshot.
async fn handle_init(
    state: &AppState,
    current_room: &mut Option<i64>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<ServerEvent>,
    whiteboard_id: i64,
) -> Result<Outcome, RelayError> {
    if let Some(previous) = current_room.take() {
        room::leave_room(state, previous, client_id).await;
    }

    room::join_room(state, whiteboard_id, client_id, client_tx.clone()).await;
    *current_room = Some(whiteboard_id);

    let objects = scene::list_objects(&state.pool, whiteboard_id).await?;
    let snapshot = SceneSnapshot { objects: objects.into_iter().map(|obj| obj.object_data).collect() };
    Ok(Outcome::Reply(ServerEvent::Load { whiteboard_id, whiteboard: snapshot }))
}

/// Persist a new object, then broadcast it.
async fn handle_add(
    state: &AppState,
    whiteboard_id: i64,
    object: serde_json::Value,
) -> Result<Outcome, RelayError> {
    let object_id = protocol::object_id(&object).ok_or(RelayError::MissingObjectId)?;
    scene::insert_object(&state.pool, whiteboard_id, object_id, &object).await?;
    Ok(Outcome::Broadcast { whiteboard_id, event: ServerEvent::Add { whiteboard_id, object } })
}

/// Live modify: broadcast only. Drag/resize frames are never durable; the
/// resting state arrives later as a commit.
fn preview_modify(whiteboard_id: i64, object: serde_json::Value) -> Outcome {
    Outcome::Broadcast { whiteboard_id, event: ServerEvent::Modify { whiteboard_id, object } }
}

/// Non-live modify: persist the full replacement state, then broadcast.
async fn commit_modify(
    state: &AppState,
    whiteboard_id: i64,
    object: serde_json::Value,
) -> Result<Outcome, RelayError> {
    let object_id = protocol::object_id(&object).ok_or(RelayError::MissingObjectId)?;
    scene::update_object(&state.pool, whiteboard_id, object_id, &object).await?;
    Ok(Outcome::Broadcast { whiteboard_id, event: ServerEvent::Modify { whiteboard_id, object } })
}

/// Delete by id(s), accepting either the batch or single-object form, then
/// broadcast the normalized batch form.
async fn handle_delete(
    state: &AppState,
    whiteboard_id: i64,
    objects: Option<Vec<serde_json::Value>>,
    object: Option<serde_json::Value>,
) -> Result<Outcome, RelayError> {
    let objects = objects.or_else(|| object.map(|obj| vec![obj])).unwrap_or_default();
    let object_ids = objects
        .iter()
        .map(|obj| protocol::object_id(obj).map(String::from).ok_or(RelayError::MissingObjectId))
        .collect::<Result<Vec<_>, _>>()?;

    match object_ids.as_slice() {
        [] => {}
        [object_id] => scene::delete_object(&state.pool, whiteboard_id, object_id).await?,
        _ => scene::delete_objects(&state.pool, whiteboard_id, &object_ids).await?,
    }

    Ok(Outcome::Broadcast { whiteboard_id, event: ServerEvent::Delete { whiteboard_id, objects } })
}

/// Remove every object, then broadcast `clear`.
async fn handle_clear(state: &AppState, whiteboard_id: i64) -> Result<Outcome, RelayError> {
    scene::delete_all(&state.pool, whiteboard_id).await?;
    Ok(Outcome::Broadcast { whiteboard_id, event: ServerEvent::Clear { whiteboard_id } })
}

/// Persist the object's updated z-order state, then broadcast `layer` with
/// the opaque action tag passed through.
async fn handle_layer(
    state: &AppState,
    whiteboard_id: i64,
    object: serde_json::Value,
    action: String,
) -> Result<Outcome, RelayError> {
    let object_id = protocol::object_id(&object).ok_or(RelayError::MissingObjectId)?;
    scene::update_object(&state.pool, whiteboard_id, object_id, &object).await?;
    Ok(Outcome::Broadcast { whiteboard_id, event: ServerEvent::Layer { whiteboard_id, object, action } })
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &ServerEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize event");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
