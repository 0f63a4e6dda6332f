use std::fmt::Display;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Discriminator stored with the full overview image of a map.
pub const OVERVIEW_IMAGE: i64 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartPos {
    pub x: f64,
    pub z: f64,
}

/// Map information as published by the map metadata service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapMetadata {
    pub width: i64,
    pub height: i64,
    #[serde(rename = "StartPos", default)]
    pub start_positions: Vec<StartPos>,
}

/// A start rectangle of one allyteam, in fractions of the map size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StartBox {
    pub allyteam: i64,
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StartPosType {
    /// Start points are fixed by the map.
    Fixed,
    /// Players choose inside the boxes allocated to their allyteam.
    Boxes,
}

impl StartPosType {
    pub fn code(self) -> i64 {
        match self {
            StartPosType::Fixed => 1,
            StartPosType::Boxes => 2,
        }
    }
}

impl TryFrom<i64> for StartPosType {
    type Error = SetupError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StartPosType::Fixed),
            2 => Ok(StartPosType::Boxes),
            other => Err(SetupError::UnsupportedStartPosType(other)),
        }
    }
}

impl Display for StartPosType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartPosType::Fixed => write!(f, "fixed"),
            StartPosType::Boxes => write!(f, "boxes"),
        }
    }
}

/// Formats start positions as `x,z|x,z|...`.
pub fn format_start_positions(positions: &[StartPos]) -> String {
    positions
        .iter()
        .map(|pos| format!("{:.6},{:.6}", pos.x, pos.z))
        .join("|")
}

/// Inverse of [`format_start_positions`]. Malformed pairs are skipped.
pub fn parse_start_positions(startpos: &str) -> Vec<StartPos> {
    startpos
        .split('|')
        .filter_map(|pair| {
            let (x, z) = pair.split_once(',')?;
            Some(StartPos {
                x: x.trim().parse().ok()?,
                z: z.trim().parse().ok()?,
            })
        })
        .collect()
}
