use anyhow::Result;
use image::{Rgb, RgbImage};
use rand::Rng;

use super::FrameSource;
use crate::config::CameraConfig;
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const BLOCK_SIZE: u32 = 64;

/// Synthetic source for testing and demos.
///
/// Produces a flat gray frame. With `options.motion = true` a white block is drawn at
/// a random position on each grab so motion-triggered detectors fire.
pub struct StubSource {
    name: String,
    width: u32,
    height: u32,
    motion: bool,
}

impl StubSource {
    pub const INPUT_TYPE: &'static str = "stub";

    pub fn new(name: &str, width: u32, height: u32, motion: bool) -> Self {
        Self {
            name: name.to_string(),
            width: width.max(1),
            height: height.max(1),
            motion,
        }
    }

    pub fn from_camera(camera: &CameraConfig) -> Self {
        Self::new(
            &camera.name,
            camera.option_u32("width", DEFAULT_WIDTH),
            camera.option_u32("height", DEFAULT_HEIGHT),
            camera.option_bool("motion", false),
        )
    }
}

impl FrameSource for StubSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn grab(&mut self) -> Result<Option<Frame>> {
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb([96, 96, 96]));
        if self.motion {
            let mut rng = rand::thread_rng();
            let x0 = rng.gen_range(0..self.width);
            let y0 = rng.gen_range(0..self.height);
            for y in y0..(y0 + BLOCK_SIZE).min(self.height) {
                for x in x0..(x0 + BLOCK_SIZE).min(self.width) {
                    image.put_pixel(x, y, Rgb([255, 255, 255]));
                }
            }
        }
        Ok(Some(Frame::new(image)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_configured_dimensions() {
        let mut source = StubSource::new("stub", 32, 24, false);
        let frame = source.grab().unwrap().unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 24));
    }

    #[test]
    fn still_source_repeats_identical_frames() {
        let mut source = StubSource::new("stub", 16, 16, false);
        let a = source.grab().unwrap().unwrap();
        let b = source.grab().unwrap().unwrap();
        assert_eq!(a.image().as_raw(), b.image().as_raw());
    }
}
