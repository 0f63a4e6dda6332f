use async_trait::async_trait;
use database::{maps, MapImgRecord, MapRecord};
use sqlx::SqliteConnection;
use types::map::format_start_positions;
use types::{MapMetadata, StartBox, StartPosType, OVERVIEW_IMAGE};

use crate::error::{IngestError, MapSourceError};

/// Provider of map metadata and rendered map images. Returned strings are
/// image file names relative to the image directory of the site.
#[async_trait]
pub trait MapSource: Send + Sync {
    async fn fetch_info(&self, mapname: &str) -> Result<MapMetadata, MapSourceError>;

    /// Stores the full overview image of the map.
    async fn fetch_img(&self, mapname: &str) -> Result<String, MapSourceError>;

    /// Renders the small preview used on the home page.
    async fn make_home_thumb(&self, mapname: &str) -> Result<(), MapSourceError>;

    async fn create_map_with_positions(&self, map: &MapRecord) -> Result<String, MapSourceError>;

    async fn create_map_with_boxes(
        &self,
        map: &MapRecord,
        game_id: &str,
        boxes: &[StartBox],
    ) -> Result<String, MapSourceError>;
}

// NoopMapSource for when no map images are wanted
pub struct NoopMapSource;

#[async_trait]
impl MapSource for NoopMapSource {
    async fn fetch_info(&self, _mapname: &str) -> Result<MapMetadata, MapSourceError> {
        Ok(MapMetadata::default())
    }

    async fn fetch_img(&self, mapname: &str) -> Result<String, MapSourceError> {
        Ok(format!("{mapname}.jpg"))
    }

    async fn make_home_thumb(&self, _mapname: &str) -> Result<(), MapSourceError> {
        Ok(())
    }

    async fn create_map_with_positions(&self, map: &MapRecord) -> Result<String, MapSourceError> {
        Ok(format!("{}_positions.jpg", map.name))
    }

    async fn create_map_with_boxes(
        &self,
        map: &MapRecord,
        game_id: &str,
        _boxes: &[StartBox],
    ) -> Result<String, MapSourceError> {
        Ok(format!("{}_{}.jpg", map.name, game_id))
    }
}

/// Resolves the map of a replay and the image matching its start position
/// mode, registering the map first if it has never been seen.
#[tracing::instrument(skip(conn, source, boxes))]
pub async fn register_map<S>(
    conn: &mut SqliteConnection,
    source: &S,
    mapname: &str,
    startpostype: i64,
    game_id: &str,
    boxes: &[StartBox],
) -> Result<(MapRecord, MapImgRecord), IngestError>
where
    S: MapSource + ?Sized,
{
    let kind = StartPosType::try_from(startpostype)?;

    let map = match maps::find_map(conn, mapname).await? {
        Some(map) => {
            tracing::debug!("Using existing map {} (id {})", map.name, map.id);
            map
        }
        None => register_new_map(conn, source, mapname).await?,
    };

    let map_img = match kind {
        StartPosType::Fixed => match maps::find_map_img(conn, map.id, kind.code()).await? {
            Some(img) => {
                tracing::debug!("Using existing {} image {}", kind, img.filename);
                img
            }
            None => {
                let filename = source.create_map_with_positions(&map).await?;
                maps::get_or_create_shared_map_img(conn, map.id, kind.code(), &filename).await?
            }
        },
        StartPosType::Boxes => {
            let filename = source.create_map_with_boxes(&map, game_id, boxes).await?;
            maps::insert_map_img(conn, map.id, kind.code(), &filename).await?
        }
    };
    tracing::debug!("Map image {} (id {})", map_img.filename, map_img.id);

    Ok((map, map_img))
}

async fn register_new_map<S>(
    conn: &mut SqliteConnection,
    source: &S,
    mapname: &str,
) -> Result<MapRecord, IngestError>
where
    S: MapSource + ?Sized,
{
    let metadata = source.fetch_info(mapname).await?;
    let startpos = format_start_positions(&metadata.start_positions);

    let (map, created) =
        maps::get_or_create_map(conn, mapname, metadata.width, metadata.height, &startpos).await?;
    if !created {
        return Ok(map);
    }

    let overview = source.fetch_img(mapname).await?;
    maps::get_or_create_shared_map_img(conn, map.id, OVERVIEW_IMAGE, &overview).await?;
    source.make_home_thumb(mapname).await?;
    tracing::info!("Registered new map {} (id {})", map.name, map.id);

    Ok(map)
}
