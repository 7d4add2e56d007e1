//! Filesystem helpers for publishing artifacts.
//!
//! Videos are encoded to a temporary file next to the destination and then
//! moved into place, so the destination path only ever holds a complete file.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

const EXDEV: i32 = 18;

/// Publish `src` at `dst`, replacing whatever is there.
///
/// A plain rename when both live on one filesystem. Otherwise the bytes are
/// copied into a staged file beside `dst`, which is then persisted over it.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).await?;
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            debug!(src = %src.display(), dst = %dst.display(), "Rename crossed devices, copying");
            copy_into_place(src.to_path_buf(), dst.to_path_buf()).await?;
            if let Err(e) = fs::remove_file(src).await {
                warn!(src = %src.display(), error = %e, "Could not remove source after copy");
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn is_cross_device_error(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(EXDEV)
}

async fn copy_into_place(src: PathBuf, dst: PathBuf) -> MediaResult<()> {
    tokio::task::spawn_blocking(move || -> MediaResult<()> {
        let dir = dst.parent().unwrap_or_else(|| Path::new("."));
        let mut staged = tempfile::Builder::new()
            .prefix(".partial-")
            .tempfile_in(dir)?;
        let mut source = std::fs::File::open(&src)?;
        std::io::copy(&mut source, staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged.persist(&dst).map_err(|e| MediaError::from(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| MediaError::internal(format!("copy task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_move_file_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("staged.mp4");
        let dst = dir.path().join("hello_asl.mp4");

        fs::write(&src, b"new").await.unwrap();
        fs::write(&dst, b"old").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_move_file_creates_parent() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("staged.mp4");
        let dst = dir.path().join("output").join("hello_asl.mp4");

        fs::write(&src, b"data").await.unwrap();
        move_file(&src, &dst).await.unwrap();
        assert!(dst.exists());
    }

    #[tokio::test]
    async fn test_copy_into_place_leaves_no_staged_file() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("staged.mp4");
        let dst = dir.path().join("out").join("hello_asl.mp4");
        std::fs::create_dir_all(dst.parent().unwrap()).unwrap();
        fs::write(&src, b"frames").await.unwrap();

        copy_into_place(src.clone(), dst.clone()).await.unwrap();

        assert_eq!(fs::read(&dst).await.unwrap(), b"frames");
        let names: Vec<_> = std::fs::read_dir(dst.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("hello_asl.mp4")]);
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(EXDEV)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
