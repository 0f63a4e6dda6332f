use sqlx::SqliteConnection;

use crate::{DatabaseError, PlayerAccountRecord};

const ACCOUNT_COLUMNS: &str = "id, accountid, countrycode, names";

/// Hands out the next synthetic accountid. The result is always below zero,
/// below every stored accountid and below every id handed out before.
pub async fn allocate_placeholder_id(conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
    sqlx::query_scalar(
        "UPDATE placeholder_sequence
         SET next_id = MIN(next_id, COALESCE((SELECT MIN(accountid) FROM player_accounts), 0), 0) - 1
         WHERE id = 1
         RETURNING next_id",
    )
    .fetch_one(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn find_account(
    conn: &mut SqliteConnection,
    accountid: i64,
) -> Result<Option<PlayerAccountRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM player_accounts WHERE accountid = ?"
    ))
    .bind(accountid)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

/// Returns the account for `accountid`, creating it seeded with `name` when
/// it does not exist yet. The flag tells whether this call created it.
pub async fn get_or_create_account(
    conn: &mut SqliteConnection,
    accountid: i64,
    countrycode: &str,
    name: &str,
) -> Result<(PlayerAccountRecord, bool), DatabaseError> {
    let inserted = sqlx::query(
        "INSERT INTO player_accounts (accountid, countrycode, names) VALUES (?, ?, ?)
         ON CONFLICT (accountid) DO NOTHING",
    )
    .bind(accountid)
    .bind(countrycode)
    .bind(name)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?
    .rows_affected()
        == 1;

    let account = find_account(conn, accountid)
        .await?
        .ok_or(DatabaseError::AccountNotFound(accountid))?;
    Ok((account, inserted))
}

/// Appends `name` to the account's aliases unless it is already one of them.
/// Returns the updated record.
pub async fn add_alias(
    conn: &mut SqliteConnection,
    account: PlayerAccountRecord,
    name: &str,
) -> Result<PlayerAccountRecord, DatabaseError> {
    if account.has_alias(name) {
        return Ok(account);
    }
    let names = if account.names.is_empty() {
        name.to_string()
    } else {
        format!("{};{}", account.names, name)
    };

    sqlx::query("UPDATE player_accounts SET names = ? WHERE id = ?")
        .bind(&names)
        .bind(account.id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;

    Ok(PlayerAccountRecord { names, ..account })
}

pub async fn index_placeholder_name(
    conn: &mut SqliteConnection,
    account_id: i64,
    name: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT OR IGNORE INTO placeholder_names (name, account_id) VALUES (?, ?)")
        .bind(name)
        .bind(account_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(())
}

pub async fn unindex_placeholder_name(
    conn: &mut SqliteConnection,
    account_id: i64,
    name: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("DELETE FROM placeholder_names WHERE name = ? AND account_id = ?")
        .bind(name)
        .bind(account_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(())
}

/// Placeholder accounts known under `name`, as account primary keys.
pub async fn placeholder_accounts_named(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Vec<i64>, DatabaseError> {
    sqlx::query_scalar(
        "SELECT pn.account_id FROM placeholder_names pn
         JOIN player_accounts pa ON pa.id = pn.account_id
         WHERE pn.name = ? AND pa.accountid <= 0
         ORDER BY pn.account_id",
    )
    .bind(name)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

/// Moves every player called `name` from one account to another. Returns the
/// number of players moved.
pub async fn reassign_players(
    conn: &mut SqliteConnection,
    from_account: i64,
    to_account: i64,
    name: &str,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query("UPDATE players SET account_id = ? WHERE account_id = ? AND name = ?")
        .bind(to_account)
        .bind(from_account)
        .bind(name)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(result.rows_affected())
}

/// Deletes the account if no player references it any more.
pub async fn delete_account_if_unused(
    conn: &mut SqliteConnection,
    account_id: i64,
) -> Result<bool, DatabaseError> {
    sqlx::query("DELETE FROM placeholder_names WHERE account_id = ? AND NOT EXISTS (SELECT 1 FROM players WHERE account_id = ?)")
        .bind(account_id)
        .bind(account_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;

    let result = sqlx::query(
        "DELETE FROM player_accounts WHERE id = ? AND NOT EXISTS (SELECT 1 FROM players WHERE account_id = ?)",
    )
    .bind(account_id)
    .bind(account_id)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;
    Ok(result.rows_affected() == 1)
}

/// The account with the highest accountid among those that have played
/// under `name`.
pub async fn owner_account(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<PlayerAccountRecord>, DatabaseError> {
    sqlx::query_as(
        "SELECT pa.id, pa.accountid, pa.countrycode, pa.names FROM player_accounts pa
         WHERE EXISTS (SELECT 1 FROM players p WHERE p.account_id = pa.id AND p.name = ?)
         ORDER BY pa.accountid DESC
         LIMIT 1",
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

