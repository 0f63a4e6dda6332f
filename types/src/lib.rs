pub mod color;
pub mod demo;
pub mod error;
pub mod map;
pub mod tags;

pub use color::floats_to_rgb_hex;
pub use demo::{AllyteamSetup, DemoHeader, GameSetup, HostSetup, ParsedDemo, PlayerSetup, TeamSetup};
pub use error::SetupError;
pub use map::{MapMetadata, StartBox, StartPos, StartPosType, OVERVIEW_IMAGE};
pub use tags::{compose_title, shape_tag, split_tags, FFA_TAG};
