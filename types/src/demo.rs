use std::collections::{BTreeMap, BTreeSet};

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::map::StartBox;

/// Output of the demo file parser: the demo header, the game setup script and
/// the set of allyteams that won the match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDemo {
    pub header: DemoHeader,
    pub game_setup: GameSetup,
    #[serde(rename = "winningAllyTeams", default)]
    pub winning_ally_teams: BTreeSet<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemoHeader {
    #[serde(rename = "gameID")]
    pub game_id: String,
    pub version_string: String,
    pub wallclock_time: i64,
    /// Match start as `YYYY-MM-DD HH:MM:SS`.
    pub unix_time: String,
    pub winning_ally_teams_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSetup {
    pub host: HostSetup,
    #[serde(default)]
    pub allyteam: BTreeMap<i64, AllyteamSetup>,
    #[serde(default)]
    pub team: BTreeMap<i64, TeamSetup>,
    #[serde(default)]
    pub player: BTreeMap<i64, PlayerSetup>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub mapoptions: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map")]
    pub modoptions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostSetup {
    pub mapname: Option<String>,
    pub autohostname: Option<String>,
    pub gametype: Option<String>,
    pub startpostype: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllyteamSetup {
    pub startrectleft: Option<f64>,
    pub startrecttop: Option<f64>,
    pub startrectright: Option<f64>,
    pub startrectbottom: Option<f64>,
}

impl AllyteamSetup {
    pub fn start_box(&self, allyteam: i64) -> Option<StartBox> {
        Some(StartBox {
            allyteam,
            left: self.startrectleft?,
            top: self.startrecttop?,
            right: self.startrectright?,
            bottom: self.startrectbottom?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSetup {
    pub allyteam: i64,
    pub teamleader: i64,
    /// Three floats in `[0, 1]`, space separated.
    pub rgbcolor: String,
    pub side: Option<String>,
    pub handicap: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub name: String,
    pub accountid: Option<i64>,
    pub lobbyid: Option<i64>,
    pub countrycode: Option<String>,
    #[serde(default)]
    pub rank: i64,
    #[serde(default, deserialize_with = "flag")]
    pub spectator: bool,
    pub team: Option<i64>,
}

impl ParsedDemo {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn is_winner(&self, allyteam: i64) -> bool {
        self.winning_ally_teams.contains(&allyteam)
    }

    /// Start boxes of every allyteam that has a complete start rectangle.
    pub fn start_boxes(&self) -> Vec<StartBox> {
        self.game_setup
            .allyteam
            .iter()
            .filter_map(|(num, allyteam)| allyteam.start_box(*num))
            .collect()
    }
}

fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(false),
        Value::Bool(b) => Ok(b),
        Value::Number(n) => Ok(n.as_f64().map_or(false, |v| v != 0.0)),
        Value::String(s) => Ok(!matches!(s.trim(), "" | "0" | "false")),
        other => Err(D::Error::custom(format!("expected a flag, got {other}"))),
    }
}

fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            Value::Number(n) => Ok((key, n.to_string())),
            Value::Bool(b) => Ok((key, b.to_string())),
            other => Err(D::Error::custom(format!(
                "option {key} must be a scalar, got {other}"
            ))),
        })
        .collect()
}
