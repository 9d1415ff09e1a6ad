//! Local image file source.
//!
//! Re-reads the image at `id.path` on every grab, so an external process can keep
//! overwriting the file with the latest capture. Local paths only.

use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;

use super::FrameSource;
use crate::config::CameraConfig;
use crate::frame::Frame;

pub struct FileSource {
    name: String,
    path: PathBuf,
}

impl FileSource {
    pub const INPUT_TYPE: &'static str = "file";

    pub fn new(name: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let display = path.display().to_string();
        if display.contains("://") {
            return Err(anyhow!(
                "file source only supports local paths (got '{}')",
                display
            ));
        }
        Ok(Self {
            name: name.to_string(),
            path,
        })
    }

    pub fn from_camera(camera: &CameraConfig) -> Result<Self> {
        Self::new(&camera.name, camera.id_field("path")?)
    }
}

impl FrameSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn grab(&mut self) -> Result<Option<Frame>> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read image {}", self.path.display()))
            }
        };
        if bytes.is_empty() {
            return Ok(None);
        }
        Frame::decode(&bytes).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn reads_image_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latest.png");
        RgbImage::from_pixel(8, 6, Rgb([1, 2, 3])).save(&path).unwrap();

        let mut source = FileSource::new("dock", &path).unwrap();
        let frame = source.grab().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (8, 6));
    }

    #[test]
    fn missing_file_yields_no_frame() {
        let dir = tempfile::tempdir().unwrap();
        let mut source = FileSource::new("dock", dir.path().join("nope.jpg")).unwrap();
        assert!(source.grab().unwrap().is_none());
    }

    #[test]
    fn rejects_url_paths() {
        assert!(FileSource::new("dock", "http://camera/snap.jpg").is_err());
    }
}
