pub mod accounts;
pub mod browse;
pub mod config;
pub mod error;
pub mod maps;
pub mod models;
pub mod replays;
pub mod repository;
pub mod tags;

#[cfg(test)]
mod tests;

pub use config::{run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use models::{
    AccountSummary, AllyteamDetail, AllyteamRecord, MapImgRecord, MapRecord, NamedCount,
    NewReplay, OptionKind, OptionRecord, PlayerAccountRecord, PlayerRecord, ReplayDetail,
    ReplayFileRecord, ReplayRecord, TagRecord, TeamRecord,
};
pub use repository::ReplayDatabase;
