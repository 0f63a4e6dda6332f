use database::{replays, tags, TagRecord};
use sqlx::SqliteConnection;

use crate::error::IngestError;

/// Attaches every tag of the comma separated `raw` string to the replay,
/// reusing existing tags regardless of their casing.
pub async fn save_tags(
    conn: &mut SqliteConnection,
    replay_id: i64,
    raw: &str,
) -> Result<Vec<TagRecord>, IngestError> {
    let mut saved = Vec::new();
    for name in types::split_tags(raw) {
        let tag = tags::get_or_create_tag(conn, name).await?;
        tags::attach_tag(conn, replay_id, tag.id).await?;
        saved.push(tag);
    }
    Ok(saved)
}

/// Tags the replay with its match shape ("1v1", "2v2", "FFA", ...) and
/// returns that shape.
pub async fn set_autotag(conn: &mut SqliteConnection, replay_id: i64) -> Result<String, IngestError> {
    let team_counts = replays::allyteam_team_counts(conn, replay_id).await?;
    let autotag = types::shape_tag(&team_counts);

    if autotag.is_empty() {
        tracing::warn!("Replay {} has no allyteams left, no autotag", replay_id);
        return Ok(autotag);
    }
    let tag = tags::get_or_create_tag(conn, &autotag).await?;
    tags::attach_tag(conn, replay_id, tag.id).await?;
    Ok(autotag)
}
