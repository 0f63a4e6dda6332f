use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use database::MapRecord;
use image::{imageops, Rgb, RgbImage};
use types::map::parse_start_positions;
use types::{MapMetadata, StartBox, StartPos};

use crate::error::MapSourceError;
use crate::maps::MapSource;

/// Map size unit in world coordinates.
const WORLD_UNITS_PER_SQUARE: f64 = 512.0;
const HOME_THUMB_WIDTH: u32 = 160;
const MARKER_RADIUS: i64 = 6;
const BOX_BORDER: i64 = 2;

const ALLYTEAM_COLORS: [Rgb<u8>; 4] = [
    Rgb([0, 200, 0]),
    Rgb([220, 0, 0]),
    Rgb([0, 90, 255]),
    Rgb([240, 200, 0]),
];

/// Map source backed by a local cache directory holding `<map>.json`
/// metadata and `<map>.jpg` overview images. Rendered images are written to
/// `image_dir`.
///
/// Files the source creates are remembered until [`remove_written`] or
/// [`forget_written`], so a caller whose ingestion rolled back can delete the
/// images no row points at. Clones share that list.
///
/// [`remove_written`]: LocalMapSource::remove_written
/// [`forget_written`]: LocalMapSource::forget_written
#[derive(Debug, Clone)]
pub struct LocalMapSource {
    map_cache: PathBuf,
    image_dir: PathBuf,
    written: Arc<Mutex<Vec<PathBuf>>>,
}

impl LocalMapSource {
    pub fn new(map_cache: impl Into<PathBuf>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            map_cache: map_cache.into(),
            image_dir: image_dir.into(),
            written: Arc::default(),
        }
    }

    /// Deletes every file created since the last call and returns how many
    /// were removed. Failures are logged.
    pub fn remove_written(&self) -> usize {
        let written = std::mem::take(&mut *self.lock_written());
        let mut removed = 0;
        for path in written {
            match std::fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) => tracing::warn!("Could not remove {}: {}", path.display(), e),
            }
        }
        removed
    }

    /// Keeps the created files, e.g. after the ingestion committed.
    pub fn forget_written(&self) {
        self.lock_written().clear();
    }

    fn lock_written(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.written.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // files that existed before were not ours to delete
    fn note_written(&self, path: PathBuf, existed: bool) {
        if !existed {
            self.lock_written().push(path);
        }
    }

    fn cached(&self, mapname: &str, extension: &str) -> PathBuf {
        self.map_cache.join(format!("{}.{}", file_stem(mapname), extension))
    }

    async fn render<F>(&self, mapname: &str, filename: String, draw: F) -> Result<String, MapSourceError>
    where
        F: FnOnce(&mut RgbImage) + Send + 'static,
    {
        let source = self.cached(mapname, "jpg");
        let target = self.image_dir.join(&filename);
        if !tokio::fs::try_exists(&source).await? {
            return Err(MapSourceError::UnknownMap(mapname.to_string()));
        }
        tokio::fs::create_dir_all(&self.image_dir).await?;
        let existed = tokio::fs::try_exists(&target).await?;

        let saved = target.clone();
        tokio::task::spawn_blocking(move || -> Result<(), MapSourceError> {
            let mut img = open_rgb(&source)?;
            draw(&mut img);
            img.save(&saved).map_err(|e| MapSourceError::Image(e.to_string()))
        })
        .await
        .map_err(|e| MapSourceError::Image(e.to_string()))??;
        self.note_written(target, existed);

        tracing::debug!("Rendered {}", filename);
        Ok(filename)
    }
}

#[async_trait]
impl MapSource for LocalMapSource {
    async fn fetch_info(&self, mapname: &str) -> Result<MapMetadata, MapSourceError> {
        let path = self.cached(mapname, "json");
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(MapSourceError::UnknownMap(mapname.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw)
            .map_err(|e| MapSourceError::Metadata(format!("{}: {}", path.display(), e)))
    }

    async fn fetch_img(&self, mapname: &str) -> Result<String, MapSourceError> {
        let filename = format!("{}.jpg", file_stem(mapname));
        let source = self.cached(mapname, "jpg");
        if !tokio::fs::try_exists(&source).await? {
            return Err(MapSourceError::UnknownMap(mapname.to_string()));
        }
        tokio::fs::create_dir_all(&self.image_dir).await?;
        let target = self.image_dir.join(&filename);
        let existed = tokio::fs::try_exists(&target).await?;
        tokio::fs::copy(&source, &target).await?;
        self.note_written(target, existed);
        Ok(filename)
    }

    async fn make_home_thumb(&self, mapname: &str) -> Result<(), MapSourceError> {
        let filename = format!("{}_home.jpg", file_stem(mapname));
        let source = self.cached(mapname, "jpg");
        let target = self.image_dir.join(filename);
        tokio::fs::create_dir_all(&self.image_dir).await?;
        let existed = tokio::fs::try_exists(&target).await?;

        let saved = target.clone();
        tokio::task::spawn_blocking(move || -> Result<(), MapSourceError> {
            let img = open_rgb(&source)?;
            let (width, height) = img.dimensions();
            let thumb_height = (height * HOME_THUMB_WIDTH / width.max(1)).max(1);
            imageops::thumbnail(&img, HOME_THUMB_WIDTH, thumb_height)
                .save(&saved)
                .map_err(|e| MapSourceError::Image(e.to_string()))
        })
        .await
        .map_err(|e| MapSourceError::Image(e.to_string()))??;
        self.note_written(target, existed);
        Ok(())
    }

    async fn create_map_with_positions(&self, map: &MapRecord) -> Result<String, MapSourceError> {
        let positions = parse_start_positions(&map.startpos);
        let world = (
            map.width as f64 * WORLD_UNITS_PER_SQUARE,
            map.height as f64 * WORLD_UNITS_PER_SQUARE,
        );
        let filename = format!("{}_positions.jpg", file_stem(&map.name));
        self.render(&map.name, filename, move |img| {
            draw_positions(img, &positions, world)
        })
        .await
    }

    async fn create_map_with_boxes(
        &self,
        map: &MapRecord,
        game_id: &str,
        boxes: &[StartBox],
    ) -> Result<String, MapSourceError> {
        let boxes = boxes.to_vec();
        let filename = format!("{}_{}_boxes.jpg", file_stem(&map.name), file_stem(game_id));
        self.render(&map.name, filename, move |img| draw_boxes(img, &boxes))
            .await
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

fn open_rgb(path: &Path) -> Result<RgbImage, MapSourceError> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .map_err(|e| MapSourceError::Image(format!("{}: {}", path.display(), e)))
}

fn draw_positions(img: &mut RgbImage, positions: &[StartPos], world: (f64, f64)) {
    if world.0 <= 0.0 || world.1 <= 0.0 {
        return;
    }
    let (width, height) = img.dimensions();
    for (i, pos) in positions.iter().enumerate() {
        let cx = (pos.x / world.0 * width as f64) as i64;
        let cz = (pos.z / world.1 * height as f64) as i64;
        let color = ALLYTEAM_COLORS[i % ALLYTEAM_COLORS.len()];
        fill_rect(
            img,
            (cx - MARKER_RADIUS, cz - MARKER_RADIUS),
            (cx + MARKER_RADIUS, cz + MARKER_RADIUS),
            color,
        );
    }
}

fn draw_boxes(img: &mut RgbImage, boxes: &[StartBox]) {
    let (width, height) = (img.width() as f64, img.height() as f64);
    for start_box in boxes {
        let color = ALLYTEAM_COLORS[start_box.allyteam.rem_euclid(ALLYTEAM_COLORS.len() as i64) as usize];
        let left = (start_box.left * width) as i64;
        let top = (start_box.top * height) as i64;
        let right = (start_box.right * width) as i64 - 1;
        let bottom = (start_box.bottom * height) as i64 - 1;

        fill_rect(img, (left, top), (right, top + BOX_BORDER), color);
        fill_rect(img, (left, bottom - BOX_BORDER), (right, bottom), color);
        fill_rect(img, (left, top), (left + BOX_BORDER, bottom), color);
        fill_rect(img, (right - BOX_BORDER, top), (right, bottom), color);
    }
}

// inclusive corners, clipped to the image
fn fill_rect(img: &mut RgbImage, from: (i64, i64), to: (i64, i64), color: Rgb<u8>) {
    let max_x = img.width() as i64 - 1;
    let max_y = img.height() as i64 - 1;
    for y in from.1.max(0)..=to.1.min(max_y) {
        for x in from.0.max(0)..=to.0.min(max_x) {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Comet Catcher Redux"), "Comet_Catcher_Redux");
        assert_eq!(file_stem("DSD_8.0"), "DSD_8.0");
        assert_eq!(file_stem("../etc"), ".._etc");
    }

    #[test]
    fn test_draw_boxes_outlines_only() {
        let mut img = RgbImage::new(100, 100);
        let boxes = [StartBox {
            allyteam: 1,
            left: 0.0,
            top: 0.0,
            right: 0.5,
            bottom: 0.5,
        }];
        draw_boxes(&mut img, &boxes);

        assert_eq!(*img.get_pixel(0, 0), ALLYTEAM_COLORS[1]);
        assert_eq!(*img.get_pixel(49, 49), ALLYTEAM_COLORS[1]);
        assert_eq!(*img.get_pixel(25, 25), Rgb([0, 0, 0]));
        assert_eq!(*img.get_pixel(75, 75), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_draw_positions_clips_to_image() {
        let mut img = RgbImage::new(64, 64);
        let positions = [StartPos { x: 0.0, z: 0.0 }, StartPos { x: 1024.0, z: 1024.0 }];
        draw_positions(&mut img, &positions, (1024.0, 1024.0));

        assert_eq!(*img.get_pixel(0, 0), ALLYTEAM_COLORS[0]);
        assert_eq!(*img.get_pixel(63, 63), ALLYTEAM_COLORS[1]);
        assert_eq!(*img.get_pixel(32, 32), Rgb([0, 0, 0]));
    }

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("relay_maps_{}", uuid::Uuid::new_v4().simple()))
    }

    fn sample_map(name: &str) -> MapRecord {
        MapRecord {
            id: 1,
            name: name.to_string(),
            width: 8,
            height: 8,
            startpos: "1000.0,1000.0|3000.0,3000.0".to_string(),
        }
    }

    /// Only images this source created are deleted on cleanup
    #[tokio::test]
    async fn test_remove_written_images() {
        let root = scratch_dir();
        let cache = root.join("cache");
        let images = root.join("img");
        std::fs::create_dir_all(&cache).unwrap();
        std::fs::create_dir_all(&images).unwrap();
        RgbImage::new(64, 64).save(cache.join("Delta_Siege_Dry.jpg")).unwrap();
        std::fs::write(images.join("Delta_Siege_Dry_positions.jpg"), b"kept").unwrap();

        let source = LocalMapSource::new(&cache, &images);
        let shared = source.clone();
        let overview = source.fetch_img("Delta Siege Dry").await.unwrap();
        source.make_home_thumb("Delta Siege Dry").await.unwrap();
        source
            .create_map_with_positions(&sample_map("Delta Siege Dry"))
            .await
            .unwrap();

        assert!(images.join(&overview).exists());
        assert_eq!(shared.remove_written(), 2);
        assert!(!images.join(&overview).exists());
        assert!(!images.join("Delta_Siege_Dry_home.jpg").exists());
        assert!(images.join("Delta_Siege_Dry_positions.jpg").exists());
        assert_eq!(source.remove_written(), 0);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_forget_written_keeps_images() {
        let root = scratch_dir();
        let cache = root.join("cache");
        std::fs::create_dir_all(&cache).unwrap();
        RgbImage::new(32, 32).save(cache.join("Altair.jpg")).unwrap();

        let source = LocalMapSource::new(&cache, root.join("img"));
        let overview = source.fetch_img("Altair").await.unwrap();
        source.forget_written();

        assert_eq!(source.remove_written(), 0);
        assert!(root.join("img").join(overview).exists());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[tokio::test]
    async fn test_unknown_map() {
        let source = LocalMapSource::new("/nonexistent/cache", "/nonexistent/img");
        let err = source.fetch_info("Nowhere").await.unwrap_err();
        assert!(matches!(err, MapSourceError::UnknownMap(name) if name == "Nowhere"));
    }
}
