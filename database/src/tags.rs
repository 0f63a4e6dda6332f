use sqlx::SqliteConnection;

use crate::{DatabaseError, TagRecord};

/// Uniqueness key of a tag name. Unlike SQLite's NOCASE this also folds
/// non-ASCII letters.
pub fn tag_key(name: &str) -> String {
    name.to_lowercase()
}

pub async fn find_tag(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<TagRecord>, DatabaseError> {
    sqlx::query_as("SELECT id, name FROM tags WHERE name_key = ?")
        .bind(tag_key(name))
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::query)
}

/// Case-insensitive find-or-create. An existing tag keeps its original
/// casing.
pub async fn get_or_create_tag(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<TagRecord, DatabaseError> {
    sqlx::query("INSERT INTO tags (name, name_key) VALUES (?, ?) ON CONFLICT DO NOTHING")
        .bind(name)
        .bind(tag_key(name))
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;

    find_tag(conn, name)
        .await?
        .ok_or_else(|| DatabaseError::Query(format!("tag {name:?} vanished after insert")))
}

pub async fn attach_tag(
    conn: &mut SqliteConnection,
    replay_id: i64,
    tag_id: i64,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT OR IGNORE INTO replay_tags (replay_id, tag_id) VALUES (?, ?)")
        .bind(replay_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(())
}

pub async fn clear_replay_tags(
    conn: &mut SqliteConnection,
    replay_id: i64,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query("DELETE FROM replay_tags WHERE replay_id = ?")
        .bind(replay_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(result.rows_affected())
}

pub async fn tags_for_replay(
    conn: &mut SqliteConnection,
    replay_id: i64,
) -> Result<Vec<TagRecord>, DatabaseError> {
    sqlx::query_as(
        "SELECT t.id, t.name FROM tags t
         JOIN replay_tags rt ON rt.tag_id = t.id
         WHERE rt.replay_id = ?
         ORDER BY t.id",
    )
    .bind(replay_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}
