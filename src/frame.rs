//! Decoded frames handed from a frame source to a detector worker.
//!
//! - `Frame`: RGB pixels for one capture. Owned by a single worker for one cycle.
//! - JPEG/base64 encoding used when a frame leaves the worker (live review feed,
//!   inference upload, email attachment).
//!
//! Frames are never logged. The only serialized form is the base64 JPEG carried in
//! `LiveReviewMetadata`.

use anyhow::{anyhow, Context, Result};
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};

/// JPEG quality used for every encoded frame.
pub const JPEG_QUALITY: u8 = 85;

/// Upper bound on accepted encoded image size.
pub const MAX_JPEG_BYTES: usize = 5 * 1024 * 1024;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

pub struct Frame {
    image: RgbImage,
}

impl Frame {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    /// Decodes any format the `image` crate was built with (JPEG, PNG).
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(anyhow!("empty image buffer"));
        }
        if bytes.len() > MAX_JPEG_BYTES {
            return Err(anyhow!(
                "image of {} bytes exceeds {} byte limit",
                bytes.len(),
                MAX_JPEG_BYTES
            ));
        }
        let decoded = image::load_from_memory(bytes).context("decode image")?;
        Ok(Self::new(decoded.into_rgb8()))
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn to_luma(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    pub fn to_jpeg(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
        self.image.write_with_encoder(encoder).context("encode jpeg")?;
        Ok(out)
    }

    pub fn to_base64_jpeg(&self) -> Result<String> {
        let jpeg = self.to_jpeg()?;
        Ok(base64::engine::general_purpose::STANDARD.encode(jpeg))
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_jpeg_decodes_back_to_same_dimensions() {
        let frame = Frame::new(RgbImage::from_pixel(32, 16, image::Rgb([200, 10, 10])));
        let b64 = frame.to_base64_jpeg().unwrap();
        let jpeg = base64::engine::general_purpose::STANDARD
            .decode(b64.as_bytes())
            .unwrap();
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);

        let decoded = Frame::decode(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[test]
    fn rejects_empty_buffer() {
        assert!(Frame::decode(&[]).is_err());
    }

    #[test]
    fn debug_does_not_dump_pixels() {
        let frame = Frame::new(RgbImage::new(2, 2));
        assert_eq!(format!("{:?}", frame), "Frame { width: 2, height: 2, .. }");
    }
}
