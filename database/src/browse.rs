//! Read-only queries behind the listing and search pages.

use std::collections::HashMap;

use sqlx::SqliteConnection;

use crate::replays::{self, REPLAY_COLUMNS};
use crate::{
    tags, AccountSummary, AllyteamDetail, DatabaseError, MapImgRecord, MapRecord, NamedCount,
    OptionKind, PlayerAccountRecord, ReplayDetail, ReplayRecord,
};

pub async fn replay_count(conn: &mut SqliteConnection) -> Result<i64, DatabaseError> {
    sqlx::query_scalar("SELECT COUNT(*) FROM replays")
        .fetch_one(&mut *conn)
        .await
        .map_err(DatabaseError::query)
}

pub async fn newest_replays(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {REPLAY_COLUMNS} FROM replays ORDER BY id DESC LIMIT ?"
    ))
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn top_tags(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<NamedCount>, DatabaseError> {
    sqlx::query_as(
        "SELECT t.name AS name, COUNT(rt.replay_id) AS count FROM tags t
         LEFT JOIN replay_tags rt ON rt.tag_id = t.id
         GROUP BY t.id
         ORDER BY count DESC, t.name
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn top_maps(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<NamedCount>, DatabaseError> {
    sqlx::query_as(
        "SELECT m.name AS name, COUNT(r.id) AS count FROM maps m
         LEFT JOIN replays r ON r.map_id = m.id
         GROUP BY m.id
         ORDER BY count DESC, m.name
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn gametype_counts(conn: &mut SqliteConnection) -> Result<Vec<NamedCount>, DatabaseError> {
    sqlx::query_as(
        "SELECT gametype AS name, COUNT(*) AS count FROM replays
         WHERE gametype IS NOT NULL
         GROUP BY gametype
         ORDER BY count DESC, gametype",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

/// One row per alias of every account, with the number of replays the
/// account took part in and how many of those it only watched.
pub async fn account_summaries(
    conn: &mut SqliteConnection,
) -> Result<Vec<AccountSummary>, DatabaseError> {
    let accounts: Vec<PlayerAccountRecord> =
        sqlx::query_as("SELECT id, accountid, countrycode, names FROM player_accounts ORDER BY accountid")
            .fetch_all(&mut *conn)
            .await
            .map_err(DatabaseError::query)?;

    let counts: Vec<(i64, i64, i64)> = sqlx::query_as(
        "SELECT account_id, COUNT(DISTINCT replay_id), COALESCE(SUM(spectator), 0)
         FROM players GROUP BY account_id",
    )
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)?;
    let counts: HashMap<i64, (i64, i64)> = counts
        .into_iter()
        .map(|(account, replays, specs)| (account, (replays, specs)))
        .collect();

    Ok(accounts
        .iter()
        .flat_map(|account| {
            let (replay_count, spectator_count) =
                counts.get(&account.id).copied().unwrap_or((0, 0));
            account.aliases().map(move |name| AccountSummary {
                accountid: account.accountid,
                name: name.to_string(),
                replay_count,
                spectator_count,
            })
        })
        .collect())
}

async fn replays_matching(
    conn: &mut SqliteConnection,
    condition: &str,
    value: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {REPLAY_COLUMNS} FROM replays WHERE {condition} ORDER BY id DESC"
    ))
    .bind(value)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

pub async fn replays_tagged(
    conn: &mut SqliteConnection,
    tag: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    replays_matching(
        conn,
        "id IN (SELECT rt.replay_id FROM replay_tags rt JOIN tags t ON t.id = rt.tag_id WHERE t.name_key = ?)",
        &crate::tags::tag_key(tag),
    )
    .await
}

pub async fn replays_on_map(
    conn: &mut SqliteConnection,
    mapname: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    replays_matching(
        conn,
        "map_id IN (SELECT id FROM maps WHERE name = ?)",
        mapname,
    )
    .await
}

pub async fn replays_of_gametype(
    conn: &mut SqliteConnection,
    gametype: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    replays_matching(conn, "gametype = ?", gametype).await
}

pub async fn replays_by_uploader(
    conn: &mut SqliteConnection,
    uploader: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    replays_matching(conn, "uploader = ?", uploader).await
}

/// Replays whose match started on a date starting with `prefix`
/// (`2012`, `2012-03`, `2012-03-04`).
pub async fn replays_played_on(
    conn: &mut SqliteConnection,
    prefix: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    replays_matching(conn, "substr(unix_time, 1, length(?1)) = ?1", prefix).await
}

pub async fn replays_uploaded_on(
    conn: &mut SqliteConnection,
    prefix: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    replays_matching(conn, "substr(upload_date, 1, length(?1)) = ?1", prefix).await
}

pub async fn replays_of_account(
    conn: &mut SqliteConnection,
    accountid: i64,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    sqlx::query_as(&format!(
        "SELECT {REPLAY_COLUMNS} FROM replays WHERE id IN (
             SELECT p.replay_id FROM players p
             JOIN player_accounts pa ON pa.id = p.account_id
             WHERE pa.accountid = ?)
         ORDER BY id DESC"
    ))
    .bind(accountid)
    .fetch_all(&mut *conn)
    .await
    .map_err(DatabaseError::query)
}

/// Case-insensitive substring search over the replay texts, game type, map,
/// tags, uploader and the aliases of every participating account.
pub async fn search_replays(
    conn: &mut SqliteConnection,
    term: &str,
) -> Result<Vec<ReplayRecord>, DatabaseError> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = format!("%{escaped}%");

    replays_matching(
        conn,
        "id IN (
             SELECT r.id FROM replays r
             LEFT JOIN maps m ON m.id = r.map_id
             LEFT JOIN replay_tags rt ON rt.replay_id = r.id
             LEFT JOIN tags t ON t.id = rt.tag_id
             LEFT JOIN players p ON p.replay_id = r.id
             LEFT JOIN player_accounts pa ON pa.id = p.account_id
             WHERE r.gametype LIKE ?1 ESCAPE '\\'
                OR r.title LIKE ?1 ESCAPE '\\'
                OR r.short_text LIKE ?1 ESCAPE '\\'
                OR r.long_text LIKE ?1 ESCAPE '\\'
                OR r.uploader LIKE ?1 ESCAPE '\\'
                OR m.name LIKE ?1 ESCAPE '\\'
                OR t.name LIKE ?1 ESCAPE '\\'
                OR pa.names LIKE ?1 ESCAPE '\\')",
        &pattern,
    )
    .await
}

pub async fn replay_detail(
    conn: &mut SqliteConnection,
    game_id: &str,
) -> Result<ReplayDetail, DatabaseError> {
    let replay = replays::get_replay(conn, game_id).await?;
    let tags = tags::tags_for_replay(conn, replay.id).await?;
    let players = replays::players_for_replay(conn, replay.id).await?;
    let teams = replays::teams_for_replay(conn, replay.id).await?;

    let allyteams = replays::allyteams_for_replay(conn, replay.id)
        .await?
        .into_iter()
        .map(|allyteam| AllyteamDetail {
            teams: teams
                .iter()
                .filter(|team| team.allyteam_id == allyteam.id)
                .filter_map(|team| {
                    let leader = players.iter().find(|p| p.id == team.teamleader_id)?;
                    Some((team.clone(), leader.clone()))
                })
                .collect(),
            allyteam,
        })
        .filter(|detail| !detail.teams.is_empty())
        .collect();
    let spectators = players.iter().filter(|p| p.spectator).cloned().collect();

    let map: Option<MapRecord> = match replay.map_id {
        Some(map_id) => sqlx::query_as(
            "SELECT id, name, width, height, startpos FROM maps WHERE id = ?",
        )
        .bind(map_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::query)?,
        None => None,
    };
    let map_img: Option<MapImgRecord> = match replay.map_img_id {
        Some(img_id) => sqlx::query_as(
            "SELECT id, filename, startpostype, map_id FROM map_imgs WHERE id = ?",
        )
        .bind(img_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(DatabaseError::query)?,
        None => None,
    };
    let file = match replay.replay_file_id {
        Some(file_id) => replays::replay_file(conn, file_id).await?,
        None => None,
    };
    let map_options = replays::options_for_replay(conn, OptionKind::Map, replay.id).await?;
    let mod_options = replays::options_for_replay(conn, OptionKind::Mod, replay.id).await?;

    Ok(ReplayDetail {
        replay,
        tags,
        allyteams,
        spectators,
        map,
        map_img,
        file,
        map_options,
        mod_options,
    })
}
