//! Scene store — durable keyed objects per whiteboard.
//!
//! DESIGN
//! ======
//! Every write is a single statement, so the store needs no transactions and
//! no locking beyond what Postgres gives per statement. Concurrent `modify`
//! on the same object is last-write-wins by design: the most recently
//! persisted state silently replaces the earlier one.
//!
//! Updates and deletes that match zero rows are not errors — the relay is
//! permissive about targets that raced away.

use sqlx::PgPool;

use crate::state::WhiteboardObject;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("whiteboard not found: {0}")]
    WhiteboardNotFound(i64),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =============================================================================
// OBJECTS
// =============================================================================

/// List all objects for a whiteboard, oldest first. An empty whiteboard is
/// a valid empty snapshot, not an error.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_objects(pool: &PgPool, whiteboard_id: i64) -> Result<Vec<WhiteboardObject>, SceneError> {
    let rows = sqlx::query_as::<_, (String, i64, serde_json::Value)>(
        "SELECT object_id, whiteboard_id, object_data
         FROM whiteboard_objects
         WHERE whiteboard_id = $1
         ORDER BY created_at ASC",
    )
    .bind(whiteboard_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(object_id, whiteboard_id, object_data)| WhiteboardObject {
            object_id,
            whiteboard_id,
            object_data,
        })
        .collect())
}

/// Insert a new object.
///
/// # Errors
///
/// Returns a database error if the insert fails (including a duplicate
/// `object_id` on the same whiteboard).
pub async fn insert_object(
    pool: &PgPool,
    whiteboard_id: i64,
    object_id: &str,
    object_data: &serde_json::Value,
) -> Result<(), SceneError> {
    sqlx::query("INSERT INTO whiteboard_objects (object_id, whiteboard_id, object_data) VALUES ($1, $2, $3)")
        .bind(object_id)
        .bind(whiteboard_id)
        .bind(object_data)
        .execute(pool)
        .await?;
    Ok(())
}

/// Replace an object's stored payload in full.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn update_object(
    pool: &PgPool,
    whiteboard_id: i64,
    object_id: &str,
    object_data: &serde_json::Value,
) -> Result<(), SceneError> {
    sqlx::query(
        "UPDATE whiteboard_objects SET object_data = $3, updated_at = now()
         WHERE object_id = $1 AND whiteboard_id = $2",
    )
    .bind(object_id)
    .bind(whiteboard_id)
    .bind(object_data)
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete one object by id.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_object(pool: &PgPool, whiteboard_id: i64, object_id: &str) -> Result<(), SceneError> {
    sqlx::query("DELETE FROM whiteboard_objects WHERE object_id = $1 AND whiteboard_id = $2")
        .bind(object_id)
        .bind(whiteboard_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a batch of objects by id.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_objects(pool: &PgPool, whiteboard_id: i64, object_ids: &[String]) -> Result<(), SceneError> {
    if object_ids.is_empty() {
        return Ok(());
    }
    sqlx::query("DELETE FROM whiteboard_objects WHERE object_id = ANY($1) AND whiteboard_id = $2")
        .bind(object_ids)
        .bind(whiteboard_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete every object on a whiteboard.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_all(pool: &PgPool, whiteboard_id: i64) -> Result<(), SceneError> {
    sqlx::query("DELETE FROM whiteboard_objects WHERE whiteboard_id = $1")
        .bind(whiteboard_id)
        .execute(pool)
        .await?;
    Ok(())
}

// =============================================================================
// LOCK STATE
// =============================================================================

/// Read the advisory lock flag for a whiteboard.
///
/// # Errors
///
/// Returns `WhiteboardNotFound` if no such whiteboard exists.
pub async fn get_lock_state(pool: &PgPool, whiteboard_id: i64) -> Result<bool, SceneError> {
    let row: Option<bool> = sqlx::query_scalar("SELECT is_locked FROM whiteboards WHERE id = $1")
        .bind(whiteboard_id)
        .fetch_optional(pool)
        .await?;
    row.ok_or(SceneError::WhiteboardNotFound(whiteboard_id))
}

/// Flip the advisory lock flag and return the new value.
///
/// # Errors
///
/// Returns `WhiteboardNotFound` if no such whiteboard exists.
pub async fn toggle_lock(pool: &PgPool, whiteboard_id: i64) -> Result<bool, SceneError> {
    let row: Option<bool> =
        sqlx::query_scalar("UPDATE whiteboards SET is_locked = NOT is_locked WHERE id = $1 RETURNING is_locked")
            .bind(whiteboard_id)
            .fetch_optional(pool)
            .await?;
    row.ok_or(SceneError::WhiteboardNotFound(whiteboard_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_helpers;

    #[tokio::test]
    async fn delete_objects_empty_batch_skips_database() {
        // connect_lazy pool: would error on any real query.
        let state = test_helpers::test_app_state();
        delete_objects(&state.pool, 1, &[]).await.expect("empty batch is a no-op");
    }

    #[cfg(feature = "live-db-tests")]
    mod live {
        use super::*;
        use sqlx::postgres::PgPoolOptions;

        async fn live_pool() -> sqlx::PgPool {
            let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required for live-db-tests");
            PgPoolOptions::new().connect(&url).await.expect("connect")
        }

        #[tokio::test]
        async fn insert_then_list_round_trip() {
            let pool = live_pool().await;
            let whiteboard_id: i64 =
                sqlx::query_scalar("INSERT INTO whiteboards (is_locked) VALUES (false) RETURNING id")
                    .fetch_one(&pool)
                    .await
                    .expect("create whiteboard");

            insert_object(&pool, whiteboard_id, "o1", &serde_json::json!({"id": "o1", "type": "rect"}))
                .await
                .expect("insert");
            let objects = list_objects(&pool, whiteboard_id).await.expect("list");
            assert_eq!(objects.len(), 1);
            assert_eq!(objects[0].object_id, "o1");

            delete_all(&pool, whiteboard_id).await.expect("cleanup");
            assert!(list_objects(&pool, whiteboard_id).await.expect("list").is_empty());
        }

        #[tokio::test]
        async fn toggle_lock_flips_and_returns_state() {
            let pool = live_pool().await;
            let whiteboard_id: i64 =
                sqlx::query_scalar("INSERT INTO whiteboards (is_locked) VALUES (false) RETURNING id")
                    .fetch_one(&pool)
                    .await
                    .expect("create whiteboard");

            assert!(!get_lock_state(&pool, whiteboard_id).await.expect("get"));
            assert!(toggle_lock(&pool, whiteboard_id).await.expect("toggle"));
            assert!(get_lock_state(&pool, whiteboard_id).await.expect("get"));
        }
    }
}
