//! Per-connection undo/redo history.
//!
//! DESIGN
//! ======
//! A whiteboard room can have several simultaneous editors, and each
//! connection keeps one shared `HistoryManager`. Every entry is stamped with
//! the user that produced it, and every stack scan filters on that user so
//! user A's undo can never remove user B's work. Recording a new action
//! invalidates only the same user's redo entries; other users' redo entries
//! survive.
//!
//! History is session-local and never persisted — the server keeps exactly
//! one canonical copy of each object.

use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Undo entries kept before the oldest is evicted.
pub const DEFAULT_MAX_HISTORY: usize = 50;

// =============================================================================
// ACTIONS
// =============================================================================

/// What a recorded action did, carrying exactly the state needed to reverse
/// or replay it.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Object was created; `data` is the object as created.
    Add {
        object_id: String,
        data: serde_json::Value,
    },
    /// Object was removed; `data` is the object as it was at deletion.
    Delete {
        object_id: String,
        data: serde_json::Value,
    },
    /// Object was replaced in full; both states are kept.
    Modify {
        object_id: String,
        before: serde_json::Value,
        after: serde_json::Value,
    },
}

impl ActionKind {
    /// The object this action targets.
    #[must_use]
    pub fn object_id(&self) -> &str {
        match self {
            Self::Add { object_id, .. } | Self::Delete { object_id, .. } | Self::Modify { object_id, .. } => {
                object_id
            }
        }
    }
}

/// One recorded local action, attributable to a user.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryAction {
    pub kind: ActionKind,
    pub user_id: Uuid,
    /// Milliseconds since Unix epoch, stamped at record time.
    pub timestamp: i64,
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// HISTORY MANAGER
// =============================================================================

/// Capped undo/redo stacks shared by all users on one connection, filtered
/// per user on every operation.
#[derive(Debug)]
pub struct HistoryManager {
    undo_stack: Vec<HistoryAction>,
    redo_stack: Vec<HistoryAction>,
    max_history: usize,
    current_user_id: Option<Uuid>,
}

impl HistoryManager {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    #[must_use]
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history,
            current_user_id: None,
        }
    }

    /// Configure whose actions `undo`/`redo`/`can_undo`/`can_redo` operate
    /// on. Callable at any time; affects only subsequent calls.
    pub fn set_current_user_id(&mut self, user_id: Uuid) {
        self.current_user_id = Some(user_id);
    }

    /// Record an action on the undo stack. If it belongs to the current
    /// user, that user's redo entries are invalidated (new edits fork away
    /// from the redo branch); other users' redo entries are untouched.
    pub fn record_action(&mut self, action: HistoryAction) {
        if self.current_user_id == Some(action.user_id) {
            self.redo_stack.retain(|entry| entry.user_id != action.user_id);
        }
        self.undo_stack.push(action);
        if self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
    }

    /// Record an object creation.
    pub fn record_add(&mut self, object_id: impl Into<String>, data: serde_json::Value, user_id: Uuid) {
        self.record_action(HistoryAction {
            kind: ActionKind::Add { object_id: object_id.into(), data },
            user_id,
            timestamp: now_ms(),
        });
    }

    /// Record a full-state modification.
    pub fn record_modify(
        &mut self,
        object_id: impl Into<String>,
        before: serde_json::Value,
        after: serde_json::Value,
        user_id: Uuid,
    ) {
        self.record_action(HistoryAction {
            kind: ActionKind::Modify { object_id: object_id.into(), before, after },
            user_id,
            timestamp: now_ms(),
        });
    }

    /// Record an object deletion.
    pub fn record_delete(&mut self, object_id: impl Into<String>, data: serde_json::Value, user_id: Uuid) {
        self.record_action(HistoryAction {
            kind: ActionKind::Delete { object_id: object_id.into(), data },
            user_id,
            timestamp: now_ms(),
        });
    }

    /// Pop the current user's most recent action to the redo stack and
    /// return it. Entries from other users are skipped, not disturbed.
    /// Returns `None` when the current user has nothing to undo.
    pub fn undo(&mut self) -> Option<HistoryAction> {
        let user_id = self.current_user_id?;
        let index = self.undo_stack.iter().rposition(|entry| entry.user_id == user_id)?;
        let action = self.undo_stack.remove(index);
        self.redo_stack.push(action.clone());
        Some(action)
    }

    /// Symmetric to [`undo`](Self::undo): move the current user's most
    /// recent redo entry back to the undo stack and return it.
    pub fn redo(&mut self) -> Option<HistoryAction> {
        let user_id = self.current_user_id?;
        let index = self.redo_stack.iter().rposition(|entry| entry.user_id == user_id)?;
        let action = self.redo_stack.remove(index);
        self.undo_stack.push(action.clone());
        Some(action)
    }

    /// True iff any undo entry belongs to the current user.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        let Some(user_id) = self.current_user_id else {
            return false;
        };
        self.undo_stack.iter().any(|entry| entry.user_id == user_id)
    }

    /// True iff any redo entry belongs to the current user.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        let Some(user_id) = self.current_user_id else {
            return false;
        };
        self.redo_stack.iter().any(|entry| entry.user_id == user_id)
    }

    /// Empty both stacks for all users.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    #[must_use]
    pub fn undo_stack(&self) -> &[HistoryAction] {
        &self.undo_stack
    }

    #[must_use]
    pub fn redo_stack(&self) -> &[HistoryAction] {
        &self.redo_stack
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
