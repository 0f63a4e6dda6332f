use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::assembler::StoredFile;

/// Copies the demo into `media_root` under a unique `<stem>__<uuid>.sdf` name.
pub fn store_demo(demo: &Path, media_root: &Path) -> std::io::Result<StoredFile> {
    let ori_filename = demo
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = demo
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let filename = format!("{}__{}.sdf", stem, Uuid::new_v4().simple());

    std::fs::create_dir_all(media_root)?;
    std::fs::copy(demo, media_root.join(&filename))?;
    tracing::debug!("Stored {} as {}", demo.display(), filename);

    Ok(StoredFile {
        filename,
        path: media_root.to_string_lossy().into_owned(),
        ori_filename,
    })
}

pub fn stored_path(file: &StoredFile) -> PathBuf {
    Path::new(&file.path).join(&file.filename)
}

/// Removes a stored demo that did not end up in the database. A failure is
/// only logged so it cannot hide the error that caused the discard.
pub fn discard_demo(file: &StoredFile) -> bool {
    let path = stored_path(file);
    match std::fs::remove_file(&path) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Could not remove {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("relay_media_{}", Uuid::new_v4().simple()))
    }

    #[test]
    fn test_store_and_discard_demo() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        let demo = dir.join("20120304_201500_Delta Siege Dry_85.sdf");
        std::fs::write(&demo, b"demo").unwrap();

        let file = store_demo(&demo, &dir.join("demos")).unwrap();
        assert_eq!(file.ori_filename, "20120304_201500_Delta Siege Dry_85.sdf");
        assert!(file.filename.starts_with("20120304_201500_Delta Siege Dry_85__"));
        assert!(stored_path(&file).exists());

        assert!(discard_demo(&file));
        assert!(!stored_path(&file).exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    /// A file that is already gone is reported, not raised
    #[test]
    fn test_discard_missing_demo() {
        let file = StoredFile {
            filename: "gone.sdf".to_string(),
            path: scratch_dir().to_string_lossy().into_owned(),
            ori_filename: "gone.sdf".to_string(),
        };

        assert!(!discard_demo(&file));
    }
}
