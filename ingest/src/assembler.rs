use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use database::{
    replays, tags as tag_queries, DatabaseError, NewReplay, OptionKind, ReplayDatabase,
    ReplayFileRecord, ReplayRecord,
};
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqliteConnection, Transaction};
use types::{compose_title, floats_to_rgb_hex, ParsedDemo};

use crate::error::IngestError;
use crate::identity::register_player;
use crate::maps::{register_map, MapSource};
use crate::tags::{save_tags, set_autotag};

const UNIX_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Where the uploaded demo file was stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredFile {
    pub filename: String,
    pub path: String,
    pub ori_filename: String,
}

/// What the uploader supplied next to the demo file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Upload {
    /// Comma separated tags.
    pub tags: String,
    pub short: String,
    pub long_text: String,
    pub uploader: String,
    pub file: StoredFile,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Created(ReplayRecord),
    /// A replay with the same game id was already stored; nothing was written.
    Duplicate(ReplayRecord),
}

impl IngestOutcome {
    pub fn replay(&self) -> &ReplayRecord {
        match self {
            IngestOutcome::Created(replay) | IngestOutcome::Duplicate(replay) => replay,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, IngestOutcome::Duplicate(_))
    }
}

/// Builds the stored form of parsed demos. Each ingestion runs in its own
/// transaction; on any error nothing of the replay is kept.
pub struct ReplayIngestor<S> {
    db: ReplayDatabase,
    maps: S,
}

impl<S: MapSource> ReplayIngestor<S> {
    pub fn new(db: ReplayDatabase, maps: S) -> Self {
        Self { db, maps }
    }

    pub fn database(&self) -> &ReplayDatabase {
        &self.db
    }

    #[tracing::instrument(skip(self, demo, upload), fields(game_id = %demo.header.game_id))]
    pub async fn ingest(
        &self,
        demo: &ParsedDemo,
        upload: &Upload,
    ) -> Result<IngestOutcome, IngestError> {
        let shell = replay_shell(demo, &upload.uploader)?;
        let mut tx = self.db.begin().await?;

        // First statement is a write so the transaction holds the write lock
        // from here on.
        let replay_id = match replays::insert_replay(&mut tx, &shell).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                let existing = replays::get_replay(&mut tx, &shell.game_id).await;
                rollback(tx).await;
                let existing = existing?;
                tracing::info!("Replay {} is already stored as {}", shell.game_id, existing.id);
                return Ok(IngestOutcome::Duplicate(existing));
            }
            Err(e) => {
                rollback(tx).await;
                return Err(e.into());
            }
        };

        let assembled = async {
            self.assemble(&mut tx, replay_id, demo, upload).await?;
            Ok::<_, IngestError>(replays::get_replay(&mut tx, &shell.game_id).await?)
        }
        .await;

        match assembled {
            Ok(replay) => {
                commit(tx).await?;
                tracing::info!("Stored replay {} as {} ({})", replay.game_id, replay.id, replay.title);
                Ok(IngestOutcome::Created(replay))
            }
            Err(e) => {
                tracing::warn!("Discarding replay {}: {}", shell.game_id, e);
                rollback(tx).await;
                Err(e)
            }
        }
    }

    async fn assemble(
        &self,
        conn: &mut SqliteConnection,
        replay_id: i64,
        demo: &ParsedDemo,
        upload: &Upload,
    ) -> Result<(), IngestError> {
        let setup = &demo.game_setup;
        let file = &upload.file;
        replays::insert_replay_file(conn, replay_id, &file.filename, &file.path, &file.ori_filename)
            .await?;

        let mut allyteams = BTreeMap::new();
        for (&num, allyteam) in &setup.allyteam {
            let rect = allyteam
                .start_box(num)
                .map(|b| (b.left, b.top, b.right, b.bottom));
            let id = replays::insert_allyteam(conn, replay_id, num, demo.is_winner(num), rect).await?;
            allyteams.insert(num, id);
        }

        let mapname = setup
            .host
            .mapname
            .as_deref()
            .ok_or_else(|| IngestError::MalformedInput("host has no mapname".to_string()))?;
        let startpostype = setup
            .host
            .startpostype
            .ok_or_else(|| IngestError::MalformedInput("host has no startpostype".to_string()))?;
        let (map, map_img) = register_map(
            conn,
            &self.maps,
            mapname,
            startpostype,
            &demo.header.game_id,
            &demo.start_boxes(),
        )
        .await?;
        replays::set_replay_map(conn, replay_id, map.id, map_img.id).await?;

        save_tags(conn, replay_id, &upload.tags).await?;

        for (name, value) in &setup.mapoptions {
            replays::insert_option(conn, OptionKind::Map, replay_id, name, value).await?;
        }
        for (name, value) in &setup.modoptions {
            replays::insert_option(conn, OptionKind::Mod, replay_id, name, value).await?;
        }

        // player slot -> player row, team slot -> player rows
        let mut players = BTreeMap::new();
        let mut team_players: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
        for (&num, player_setup) in &setup.player {
            let player = register_player(conn, replay_id, player_setup).await?;
            if let Some(team) = player_setup.team {
                team_players.entry(team).or_default().push(player.id);
            }
            players.insert(num, player.id);
        }

        for (&num, team) in &setup.team {
            let allyteam_id = *allyteams.get(&team.allyteam).ok_or_else(|| {
                IngestError::MalformedInput(format!(
                    "team {} refers to missing allyteam {}",
                    num, team.allyteam
                ))
            })?;
            let members = team_players.get(&num).map(Vec::as_slice).unwrap_or_default();
            let leader = players
                .get(&team.teamleader)
                .or_else(|| members.first())
                .copied()
                .ok_or_else(|| {
                    IngestError::MalformedInput(format!("team {} has no leader", num))
                })?;
            let rgbcolor = floats_to_rgb_hex(&team.rgbcolor)?;

            let team_id = replays::insert_team(
                conn,
                replay_id,
                num,
                allyteam_id,
                leader,
                &rgbcolor,
                team.side.as_deref(),
                team.handicap,
            )
            .await?;
            for &player_id in members {
                replays::set_player_team(conn, player_id, team_id).await?;
            }
        }

        let pruned = replays::prune_empty_allyteams(conn, replay_id).await?;
        if pruned > 0 {
            tracing::debug!("Removed {} allyteams without teams", pruned);
        }

        let autotag = set_autotag(conn, replay_id).await?;
        let title = compose_title(&autotag, &upload.short);
        replays::set_replay_text(conn, replay_id, &title, &upload.short, &upload.long_text).await?;
        Ok(())
    }

    /// Replaces the description and user tags of a stored replay. The autotag
    /// is derived again and the title rebuilt from it.
    #[tracing::instrument(skip(self, short, long_text, tags))]
    pub async fn update_description(
        &self,
        game_id: &str,
        short: &str,
        long_text: &str,
        tags: &str,
    ) -> Result<ReplayRecord, IngestError> {
        let mut tx = self.db.begin().await?;
        let updated = async {
            let replay = replays::get_replay(&mut tx, game_id).await?;
            tag_queries::clear_replay_tags(&mut tx, replay.id).await?;
            let autotag = set_autotag(&mut tx, replay.id).await?;
            save_tags(&mut tx, replay.id, tags).await?;
            let title = compose_title(&autotag, short);
            replays::set_replay_text(&mut tx, replay.id, &title, short, long_text).await?;
            Ok::<_, IngestError>(replays::get_replay(&mut tx, game_id).await?)
        }
        .await;

        match updated {
            Ok(replay) => {
                commit(tx).await?;
                tracing::info!("Updated description of {}: {}", game_id, replay.title);
                Ok(replay)
            }
            Err(e) => {
                rollback(tx).await;
                Err(e)
            }
        }
    }

    pub async fn record_download(&self, game_id: &str) -> Result<ReplayFileRecord, IngestError> {
        let file = self.db.record_download(game_id).await?;
        tracing::debug!("{} downloaded {} times", file.filename, file.download_count);
        Ok(file)
    }
}

fn replay_shell(demo: &ParsedDemo, uploader: &str) -> Result<NewReplay, IngestError> {
    let header = &demo.header;
    let unix_time = NaiveDateTime::parse_from_str(&header.unix_time, UNIX_TIME_FORMAT)
        .map_err(|e| {
            IngestError::MalformedInput(format!("unixTime {:?}: {}", header.unix_time, e))
        })?;
    let host = &demo.game_setup.host;

    Ok(NewReplay {
        game_id: header.game_id.clone(),
        version_string: header.version_string.clone(),
        unix_time,
        wallclock_time: header.wallclock_time,
        mapname: host.mapname.clone(),
        autohostname: host.autohostname.clone(),
        gametype: host.gametype.clone(),
        startpostype: host.startpostype,
        not_complete: header.winning_ally_teams_size == 0,
        uploader: uploader.to_string(),
    })
}

async fn commit(tx: Transaction<'static, Sqlite>) -> Result<(), DatabaseError> {
    tx.commit()
        .await
        .map_err(|e| DatabaseError::Transaction(e.to_string()))
}

async fn rollback(tx: Transaction<'static, Sqlite>) {
    if let Err(e) = tx.rollback().await {
        tracing::error!("Rollback failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo(unix_time: &str, winners: i64) -> ParsedDemo {
        ParsedDemo::from_json(&format!(
            r#"{{
                "header": {{"gameID": "abc", "versionString": "85.0", "wallclockTime": 60,
                            "unixTime": "{unix_time}", "winningAllyTeamsSize": {winners}}},
                "game_setup": {{"host": {{"mapname": "Tabula", "startpostype": 1}}}},
                "winningAllyTeams": []
            }}"#
        ))
        .unwrap()
    }

    #[test]
    fn test_replay_shell_parses_timestamp() {
        let shell = replay_shell(&demo("2012-03-04 20:15:00", 1), "bob").unwrap();

        assert_eq!(shell.unix_time.to_string(), "2012-03-04 20:15:00");
        assert_eq!(shell.mapname.as_deref(), Some("Tabula"));
        assert_eq!(shell.uploader, "bob");
        assert!(!shell.not_complete);
    }

    #[test]
    fn test_replay_shell_without_winner_is_not_complete() {
        let shell = replay_shell(&demo("2012-03-04 20:15:00", 0), "bob").unwrap();
        assert!(shell.not_complete);
    }

    #[test]
    fn test_replay_shell_rejects_bad_timestamp() {
        let err = replay_shell(&demo("04/03/2012", 1), "bob").unwrap_err();
        assert!(matches!(err, IngestError::MalformedInput(_)));
    }
}
