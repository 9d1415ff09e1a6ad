use image::GrayImage;

use crate::frame::Frame;

/// Frame-difference motion gate for motion-triggered detectors.
///
/// A pixel counts as changed when its grayscale intensity moved by more than
/// `pixel_threshold` since the previous frame; motion is reported when the share of
/// changed pixels exceeds `percent_threshold` percent.
pub struct MotionDetector {
    percent_threshold: f64,
    pixel_threshold: u8,
    previous: Option<GrayImage>,
}

impl MotionDetector {
    pub fn new(percent_threshold: f64, pixel_threshold: u8) -> Self {
        Self {
            percent_threshold,
            pixel_threshold,
            previous: None,
        }
    }

    /// Compares `frame` against the previously seen frame and keeps it as the new
    /// baseline. The first frame, or one whose size changed, counts as motion.
    pub fn detected(&mut self, frame: &Frame) -> bool {
        let current = frame.to_luma();
        let motion = match &self.previous {
            Some(prev) if prev.dimensions() == current.dimensions() => {
                changed_percent(prev, &current, self.pixel_threshold) > self.percent_threshold
            }
            _ => true,
        };
        self.previous = Some(current);
        motion
    }
}

fn changed_percent(prev: &GrayImage, current: &GrayImage, pixel_threshold: u8) -> f64 {
    let total = current.as_raw().len();
    if total == 0 {
        return 0.0;
    }
    let changed = prev
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .filter(|(a, b)| a.abs_diff(**b) > pixel_threshold)
        .count();
    changed as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn solid(value: u8) -> Frame {
        Frame::new(RgbImage::from_pixel(10, 10, Rgb([value, value, value])))
    }

    #[test]
    fn first_frame_counts_as_motion() {
        let mut detector = MotionDetector::new(5.0, 50);
        assert!(detector.detected(&solid(0)));
    }

    #[test]
    fn identical_frames_are_still() {
        let mut detector = MotionDetector::new(5.0, 50);
        detector.detected(&solid(10));
        assert!(!detector.detected(&solid(10)));
    }

    #[test]
    fn small_intensity_change_is_ignored() {
        let mut detector = MotionDetector::new(5.0, 50);
        detector.detected(&solid(10));
        assert!(!detector.detected(&solid(40)));
    }

    #[test]
    fn large_change_over_enough_pixels_is_motion() {
        let mut detector = MotionDetector::new(5.0, 50);
        detector.detected(&solid(0));

        let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        for x in 0..10 {
            image.put_pixel(x, 0, Rgb([255, 255, 255]));
        }
        // 10 of 100 pixels changed
        assert!(detector.detected(&Frame::new(image)));
    }

    #[test]
    fn change_below_percent_threshold_is_still() {
        let mut detector = MotionDetector::new(5.0, 50);
        detector.detected(&solid(0));

        let mut image = RgbImage::from_pixel(10, 10, Rgb([0, 0, 0]));
        image.put_pixel(0, 0, Rgb([255, 255, 255]));
        assert!(!detector.detected(&Frame::new(image)));
    }
}
