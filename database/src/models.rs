use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReplayRecord {
    pub id: i64,
    pub game_id: String,
    pub version_string: String,
    pub unix_time: NaiveDateTime,
    pub wallclock_time: i64,
    pub mapname: Option<String>,
    pub autohostname: Option<String>,
    pub gametype: Option<String>,
    pub startpostype: Option<i64>,
    pub title: String,
    pub short_text: String,
    pub long_text: String,
    pub not_complete: bool,
    pub uploader: String,
    pub upload_date: NaiveDateTime,
    pub map_id: Option<i64>,
    pub map_img_id: Option<i64>,
    pub replay_file_id: Option<i64>,
}

/// Column values of a replay that are known before assembly starts.
#[derive(Debug, Clone)]
pub struct NewReplay {
    pub game_id: String,
    pub version_string: String,
    pub unix_time: NaiveDateTime,
    pub wallclock_time: i64,
    pub mapname: Option<String>,
    pub autohostname: Option<String>,
    pub gametype: Option<String>,
    pub startpostype: Option<i64>,
    pub not_complete: bool,
    pub uploader: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReplayFileRecord {
    pub id: i64,
    pub filename: String,
    pub path: String,
    pub ori_filename: String,
    pub download_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerAccountRecord {
    pub id: i64,
    pub accountid: i64,
    pub countrycode: String,
    /// Display names seen for this account, `;` separated.
    pub names: String,
}

impl PlayerAccountRecord {
    pub fn is_placeholder(&self) -> bool {
        self.accountid <= 0
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.names.split(';').filter(|name| !name.is_empty())
    }

    pub fn has_alias(&self, name: &str) -> bool {
        self.aliases().any(|alias| alias == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerRecord {
    pub id: i64,
    pub replay_id: i64,
    pub account_id: i64,
    pub name: String,
    pub rank: i64,
    pub spectator: bool,
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TeamRecord {
    pub id: i64,
    pub replay_id: i64,
    pub num: i64,
    pub allyteam_id: i64,
    pub teamleader_id: i64,
    pub rgbcolor: String,
    pub side: Option<String>,
    pub handicap: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AllyteamRecord {
    pub id: i64,
    pub replay_id: i64,
    pub num: i64,
    pub winner: bool,
    pub startrectleft: Option<f64>,
    pub startrecttop: Option<f64>,
    pub startrectright: Option<f64>,
    pub startrectbottom: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TagRecord {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MapRecord {
    pub id: i64,
    pub name: String,
    pub width: i64,
    pub height: i64,
    /// Start positions as `x,z|x,z|...`.
    pub startpos: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct MapImgRecord {
    pub id: i64,
    pub filename: String,
    pub startpostype: i64,
    pub map_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct OptionRecord {
    pub id: i64,
    pub replay_id: i64,
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Map,
    Mod,
}

impl OptionKind {
    pub(crate) fn table(self) -> &'static str {
        match self {
            OptionKind::Map => "map_options",
            OptionKind::Mod => "mod_options",
        }
    }
}

/// One alias of an account with its participation counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub accountid: i64,
    pub name: String,
    pub replay_count: i64,
    pub spectator_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct NamedCount {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllyteamDetail {
    pub allyteam: AllyteamRecord,
    pub teams: Vec<(TeamRecord, PlayerRecord)>,
}

/// Everything needed to show one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDetail {
    pub replay: ReplayRecord,
    pub tags: Vec<TagRecord>,
    pub allyteams: Vec<AllyteamDetail>,
    pub spectators: Vec<PlayerRecord>,
    pub map: Option<MapRecord>,
    pub map_img: Option<MapImgRecord>,
    pub file: Option<ReplayFileRecord>,
    pub map_options: Vec<OptionRecord>,
    pub mod_options: Vec<OptionRecord>,
}
