use sqlx::SqliteConnection;

use crate::{DatabaseError, MapImgRecord, MapRecord};

pub async fn find_map(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<MapRecord>, DatabaseError> {
    sqlx::query_as("SELECT id, name, width, height, startpos FROM maps WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::query)
}

/// Inserts a map unless one with the same name exists. Returns the stored map
/// and whether this call created it.
pub async fn get_or_create_map(
    conn: &mut SqliteConnection,
    name: &str,
    width: i64,
    height: i64,
    startpos: &str,
) -> Result<(MapRecord, bool), DatabaseError> {
    let created = sqlx::query(
        "INSERT INTO maps (name, width, height, startpos) VALUES (?, ?, ?, ?)
         ON CONFLICT (name) DO NOTHING",
    )
    .bind(name)
    .bind(width)
    .bind(height)
    .bind(startpos)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?
    .rows_affected()
        == 1;

    let map = find_map(conn, name)
        .await?
        .ok_or_else(|| DatabaseError::Query(format!("map {name:?} vanished after insert")))?;
    Ok((map, created))
}

pub async fn find_map_img(
    conn: &mut SqliteConnection,
    map_id: i64,
    startpostype: i64,
) -> Result<Option<MapImgRecord>, DatabaseError> {
    sqlx::query_as(
        "SELECT id, filename, startpostype, map_id FROM map_imgs
         WHERE map_id = ? AND startpostype = ?
         ORDER BY id LIMIT 1",
    )
    .bind(map_id)
    .bind(startpostype)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

/// Stores an image shared by every replay on the map. If another image of the
/// same kind was stored first, that one is returned instead.
pub async fn get_or_create_shared_map_img(
    conn: &mut SqliteConnection,
    map_id: i64,
    startpostype: i64,
    filename: &str,
) -> Result<MapImgRecord, DatabaseError> {
    sqlx::query("INSERT OR IGNORE INTO map_imgs (filename, startpostype, map_id) VALUES (?, ?, ?)")
        .bind(filename)
        .bind(startpostype)
        .bind(map_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;

    find_map_img(conn, map_id, startpostype)
        .await?
        .ok_or_else(|| DatabaseError::Query(format!("map image {filename:?} vanished after insert")))
}

/// Stores an image that belongs to a single replay.
pub async fn insert_map_img(
    conn: &mut SqliteConnection,
    map_id: i64,
    startpostype: i64,
    filename: &str,
) -> Result<MapImgRecord, DatabaseError> {
    sqlx::query_as(
        "INSERT INTO map_imgs (filename, startpostype, map_id) VALUES (?, ?, ?)
         RETURNING id, filename, startpostype, map_id",
    )
    .bind(filename)
    .bind(startpostype)
    .bind(map_id)
    .fetch_one(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn map_imgs(
    conn: &mut SqliteConnection,
    map_id: i64,
) -> Result<Vec<MapImgRecord>, DatabaseError> {
    sqlx::query_as(
        "SELECT id, filename, startpostype, map_id FROM map_imgs WHERE map_id = ? ORDER BY id",
    )
    .bind(map_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}
