use sqlx::SqliteConnection;

use crate::{
    AllyteamRecord, DatabaseError, NewReplay, OptionKind, OptionRecord, PlayerRecord,
    ReplayFileRecord, ReplayRecord, TeamRecord,
};

pub(crate) const REPLAY_COLUMNS: &str = "id, game_id, version_string, unix_time, wallclock_time, \
     mapname, autohostname, gametype, startpostype, title, short_text, long_text, not_complete, \
     uploader, upload_date, map_id, map_img_id, replay_file_id";

const PLAYER_COLUMNS: &str = "id, replay_id, account_id, name, rank, spectator, team_id";
const TEAM_COLUMNS: &str =
    "id, replay_id, num, allyteam_id, teamleader_id, rgbcolor, side, handicap";
const ALLYTEAM_COLUMNS: &str = "id, replay_id, num, winner, startrectleft, startrecttop, \
     startrectright, startrectbottom";

pub async fn find_replay(
    conn: &mut SqliteConnection,
    game_id: &str,
) -> Result<Option<ReplayRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {REPLAY_COLUMNS} FROM replays WHERE game_id = ?"
    ))
    .bind(game_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn get_replay(
    conn: &mut SqliteConnection,
    game_id: &str,
) -> Result<ReplayRecord, DatabaseError> {
    find_replay(conn, game_id)
        .await?
        .ok_or_else(|| DatabaseError::ReplayNotFound(game_id.to_string()))
}

/// Inserts the replay row. Returns `None` when a replay with the same game id
/// is already stored.
pub async fn insert_replay(
    conn: &mut SqliteConnection,
    replay: &NewReplay,
) -> Result<Option<i64>, DatabaseError> {
    let id = sqlx::query_scalar(
        "INSERT INTO replays (game_id, version_string, unix_time, wallclock_time, mapname,
             autohostname, gametype, startpostype, not_complete, uploader)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT (game_id) DO NOTHING
         RETURNING id",
    )
    .bind(&replay.game_id)
    .bind(&replay.version_string)
    .bind(replay.unix_time)
    .bind(replay.wallclock_time)
    .bind(&replay.mapname)
    .bind(&replay.autohostname)
    .bind(&replay.gametype)
    .bind(replay.startpostype)
    .bind(replay.not_complete)
    .bind(&replay.uploader)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;
    Ok(id)
}

pub async fn insert_replay_file(
    conn: &mut SqliteConnection,
    replay_id: i64,
    filename: &str,
    path: &str,
    ori_filename: &str,
) -> Result<i64, DatabaseError> {
    let file_id = sqlx::query(
        "INSERT INTO replay_files (filename, path, ori_filename, download_count) VALUES (?, ?, ?, 0)",
    )
    .bind(filename)
    .bind(path)
    .bind(ori_filename)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?
    .last_insert_rowid();

    sqlx::query("UPDATE replays SET replay_file_id = ? WHERE id = ?")
        .bind(file_id)
        .bind(replay_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(file_id)
}

pub async fn insert_allyteam(
    conn: &mut SqliteConnection,
    replay_id: i64,
    num: i64,
    winner: bool,
    start_rect: Option<(f64, f64, f64, f64)>,
) -> Result<i64, DatabaseError> {
    let (left, top, right, bottom) = match start_rect {
        Some((l, t, r, b)) => (Some(l), Some(t), Some(r), Some(b)),
        None => (None, None, None, None),
    };
    let result = sqlx::query(
        "INSERT INTO allyteams (replay_id, num, winner, startrectleft, startrecttop, startrectright, startrectbottom)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(replay_id)
    .bind(num)
    .bind(winner)
    .bind(left)
    .bind(top)
    .bind(right)
    .bind(bottom)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;
    Ok(result.last_insert_rowid())
}

pub async fn insert_player(
    conn: &mut SqliteConnection,
    replay_id: i64,
    account_id: i64,
    name: &str,
    rank: i64,
    spectator: bool,
) -> Result<PlayerRecord, DatabaseError> {
    sqlx::query_as(&format!(
        "INSERT INTO players (replay_id, account_id, name, rank, spectator) VALUES (?, ?, ?, ?, ?)
         RETURNING {PLAYER_COLUMNS}"
    ))
    .bind(replay_id)
    .bind(account_id)
    .bind(name)
    .bind(rank)
    .bind(spectator)
    .fetch_one(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_team(
    conn: &mut SqliteConnection,
    replay_id: i64,
    num: i64,
    allyteam_id: i64,
    teamleader_id: i64,
    rgbcolor: &str,
    side: Option<&str>,
    handicap: Option<f64>,
) -> Result<i64, DatabaseError> {
    let result = sqlx::query(
        "INSERT INTO teams (replay_id, num, allyteam_id, teamleader_id, rgbcolor, side, handicap)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(replay_id)
    .bind(num)
    .bind(allyteam_id)
    .bind(teamleader_id)
    .bind(rgbcolor)
    .bind(side)
    .bind(handicap)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;
    Ok(result.last_insert_rowid())
}

pub async fn set_player_team(
    conn: &mut SqliteConnection,
    player_id: i64,
    team_id: i64,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE players SET team_id = ? WHERE id = ?")
        .bind(team_id)
        .bind(player_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(())
}

pub async fn insert_option(
    conn: &mut SqliteConnection,
    kind: OptionKind,
    replay_id: i64,
    name: &str,
    value: &str,
) -> Result<(), DatabaseError> {
    sqlx::query(&format!(
        "INSERT INTO {} (replay_id, name, value) VALUES (?, ?, ?)",
        kind.table()
    ))
    .bind(replay_id)
    .bind(name)
    .bind(value)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;
    Ok(())
}

pub async fn set_replay_map(
    conn: &mut SqliteConnection,
    replay_id: i64,
    map_id: i64,
    map_img_id: i64,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE replays SET map_id = ?, map_img_id = ? WHERE id = ?")
        .bind(map_id)
        .bind(map_img_id)
        .bind(replay_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(())
}

pub async fn set_replay_text(
    conn: &mut SqliteConnection,
    replay_id: i64,
    title: &str,
    short_text: &str,
    long_text: &str,
) -> Result<(), DatabaseError> {
    sqlx::query("UPDATE replays SET title = ?, short_text = ?, long_text = ? WHERE id = ?")
        .bind(title)
        .bind(short_text)
        .bind(long_text)
        .bind(replay_id)
        .execute(&mut *conn)
        .await
        .map_err(DatabaseError::query)?;
    Ok(())
}

/// Deletes the allyteams of a replay that ended up without any team.
pub async fn prune_empty_allyteams(
    conn: &mut SqliteConnection,
    replay_id: i64,
) -> Result<u64, DatabaseError> {
    let result = sqlx::query(
        "DELETE FROM allyteams WHERE replay_id = ?
         AND NOT EXISTS (SELECT 1 FROM teams WHERE teams.allyteam_id = allyteams.id)",
    )
    .bind(replay_id)
    .execute(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;
    Ok(result.rows_affected())
}

/// Number of teams in each allyteam of the replay, in storage order.
pub async fn allyteam_team_counts(
    conn: &mut SqliteConnection,
    replay_id: i64,
) -> Result<Vec<i64>, DatabaseError> {
    sqlx::query_scalar(
        "SELECT (SELECT COUNT(*) FROM teams WHERE teams.allyteam_id = allyteams.id)
         FROM allyteams WHERE replay_id = ?
         ORDER BY id",
    )
    .bind(replay_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn allyteams_for_replay(
    conn: &mut SqliteConnection,
    replay_id: i64,
) -> Result<Vec<AllyteamRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {ALLYTEAM_COLUMNS} FROM allyteams WHERE replay_id = ? ORDER BY id"
    ))
    .bind(replay_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn teams_for_replay(
    conn: &mut SqliteConnection,
    replay_id: i64,
) -> Result<Vec<TeamRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {TEAM_COLUMNS} FROM teams WHERE replay_id = ? ORDER BY id"
    ))
    .bind(replay_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn players_for_replay(
    conn: &mut SqliteConnection,
    replay_id: i64,
) -> Result<Vec<PlayerRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {PLAYER_COLUMNS} FROM players WHERE replay_id = ? ORDER BY id"
    ))
    .bind(replay_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn options_for_replay(
    conn: &mut SqliteConnection,
    kind: OptionKind,
    replay_id: i64,
) -> Result<Vec<OptionRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT id, replay_id, name, value FROM {} WHERE replay_id = ? ORDER BY id",
        kind.table()
    ))
    .bind(replay_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn replay_file(
    conn: &mut SqliteConnection,
    file_id: i64,
) -> Result<Option<ReplayFileRecord>, DatabaseError> {
    sqlx::query_as(
        "SELECT id, filename, path, ori_filename, download_count FROM replay_files WHERE id = ?",
    )
    .bind(file_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

/// Counts one download of the replay's file and returns the updated record.
pub async fn record_download(
    conn: &mut SqliteConnection,
    game_id: &str,
) -> Result<ReplayFileRecord, DatabaseError> {
    sqlx::query_as(
        "UPDATE replay_files SET download_count = download_count + 1
         WHERE id = (SELECT replay_file_id FROM replays WHERE game_id = ?)
         RETURNING id, filename, path, ori_filename, download_count",
    )
    .bind(game_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(DatabaseError::query)?
    .ok_or_else(|| DatabaseError::ReplayNotFound(game_id.to_string()))
}
