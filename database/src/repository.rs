use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::config::{run_migrations, DatabaseConfig};
use crate::{
    accounts, browse, replays, AccountSummary, DatabaseError, NamedCount, PlayerAccountRecord,
    ReplayDetail, ReplayFileRecord, ReplayRecord,
};

/// Pool handle for the replay database. Writes go through [`Self::begin`];
/// the remaining methods are single reads.
#[derive(Debug, Clone)]
pub struct ReplayDatabase {
    pool: SqlitePool,
}

impl ReplayDatabase {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens the pool described by `config` and applies pending migrations.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let pool = config.create_pool().await?;
        let database = Self::new(pool);
        database.run_migrations().await?;
        Ok(database)
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        tracing::info!("Applying migrations");
        run_migrations(&self.pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, DatabaseError> {
        self.pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Transaction(e.to_string()))
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Sqlite>, DatabaseError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))
    }

    pub async fn find_replay(&self, game_id: &str) -> Result<Option<ReplayRecord>, DatabaseError> {
        replays::find_replay(&mut *self.acquire().await?, game_id).await
    }

    pub async fn replay_detail(&self, game_id: &str) -> Result<ReplayDetail, DatabaseError> {
        browse::replay_detail(&mut *self.acquire().await?, game_id).await
    }

    pub async fn replay_count(&self) -> Result<i64, DatabaseError> {
        browse::replay_count(&mut *self.acquire().await?).await
    }

    pub async fn newest_replays(&self, limit: i64) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::newest_replays(&mut *self.acquire().await?, limit).await
    }

    pub async fn top_tags(&self, limit: i64) -> Result<Vec<NamedCount>, DatabaseError> {
        browse::top_tags(&mut *self.acquire().await?, limit).await
    }

    pub async fn top_maps(&self, limit: i64) -> Result<Vec<NamedCount>, DatabaseError> {
        browse::top_maps(&mut *self.acquire().await?, limit).await
    }

    pub async fn gametype_counts(&self) -> Result<Vec<NamedCount>, DatabaseError> {
        browse::gametype_counts(&mut *self.acquire().await?).await
    }

    pub async fn account_summaries(&self) -> Result<Vec<AccountSummary>, DatabaseError> {
        browse::account_summaries(&mut *self.acquire().await?).await
    }

    pub async fn search_replays(&self, term: &str) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::search_replays(&mut *self.acquire().await?, term).await
    }

    pub async fn replays_tagged(&self, tag: &str) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::replays_tagged(&mut *self.acquire().await?, tag).await
    }

    pub async fn replays_on_map(&self, mapname: &str) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::replays_on_map(&mut *self.acquire().await?, mapname).await
    }

    pub async fn replays_of_gametype(&self, gametype: &str) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::replays_of_gametype(&mut *self.acquire().await?, gametype).await
    }

    pub async fn replays_by_uploader(&self, uploader: &str) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::replays_by_uploader(&mut *self.acquire().await?, uploader).await
    }

    pub async fn replays_played_on(&self, prefix: &str) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::replays_played_on(&mut *self.acquire().await?, prefix).await
    }

    pub async fn replays_uploaded_on(&self, prefix: &str) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::replays_uploaded_on(&mut *self.acquire().await?, prefix).await
    }

    pub async fn replays_of_account(
        &self,
        accountid: i64,
    ) -> Result<Vec<ReplayRecord>, DatabaseError> {
        browse::replays_of_account(&mut *self.acquire().await?, accountid).await
    }

    pub async fn find_account(
        &self,
        accountid: i64,
    ) -> Result<Option<PlayerAccountRecord>, DatabaseError> {
        accounts::find_account(&mut *self.acquire().await?, accountid).await
    }

    pub async fn owner_account(
        &self,
        name: &str,
    ) -> Result<Option<PlayerAccountRecord>, DatabaseError> {
        accounts::owner_account(&mut *self.acquire().await?, name).await
    }

    /// Counts a download of the replay file and returns the file record.
    pub async fn record_download(&self, game_id: &str) -> Result<ReplayFileRecord, DatabaseError> {
        let file = replays::record_download(&mut *self.acquire().await?, game_id).await?;
        tracing::debug!(
            "Replay {} downloaded {} times",
            game_id,
            file.download_count
        );
        Ok(file)
    }
}
