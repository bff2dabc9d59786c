//! Fixed-size BGR frames.

use std::time::Duration;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb, RgbaImage};
use recast_session_model::{Color, FrameSize};

/// Three-channel 8-bit image whose channels are stored B, G, R.
///
/// `image::Rgb` is only used as a three-byte container here; draw with
/// [`bgr`] so colors land in the right channels.
pub type BgrImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// A composited video frame at the session's target size.
#[derive(Debug, Clone)]
pub struct Frame {
    image: BgrImage,
    /// Active-clock time at capture (paused time excluded).
    pub timestamp: Duration,
}

impl Frame {
    /// Wrap an existing BGR image.
    pub fn new(image: BgrImage, timestamp: Duration) -> Self {
        Self { image, timestamp }
    }

    /// A black frame, used before the first successful capture.
    pub fn black(size: FrameSize, timestamp: Duration) -> Self {
        Self::new(BgrImage::new(size.width, size.height), timestamp)
    }

    /// Convert raw RGBA screen pixels into a BGR frame of exactly `size`.
    pub fn from_rgba(raw: &RgbaImage, size: FrameSize, timestamp: Duration) -> Self {
        let resized;
        let source = if raw.dimensions() == (size.width, size.height) {
            raw
        } else {
            resized = imageops::resize(raw, size.width, size.height, FilterType::Triangle);
            &resized
        };

        let mut image = BgrImage::new(size.width, size.height);
        for (dst, src) in image.pixels_mut().zip(source.pixels()) {
            let [r, g, b, _] = src.0;
            *dst = Rgb([b, g, r]);
        }
        Self::new(image, timestamp)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width(), self.height())
    }

    pub fn image(&self) -> &BgrImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut BgrImage {
        &mut self.image
    }

    /// Packed BGR bytes, row-major, no padding.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.image.into_raw()
    }
}

/// A color as a BGR pixel.
pub fn bgr(color: Color) -> Rgb<u8> {
    Rgb(color.to_bgr())
}

/// Blend `src` over `dst` with `weight` in `[0, 1]`.
///
/// A weight of 0 leaves `dst` untouched and a weight of 1 writes `src`
/// exactly.
pub fn blend_pixel(dst: &mut Rgb<u8>, src: [u8; 3], weight: f32) {
    if weight <= 0.0 {
        return;
    }
    if weight >= 1.0 {
        dst.0 = src;
        return;
    }
    for (d, s) in dst.0.iter_mut().zip(src) {
        let mixed = *d as f32 * (1.0 - weight) + s as f32 * weight;
        *d = mixed.round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn rgba_is_resized_to_exact_target_and_swizzled() {
        let raw = RgbaImage::from_pixel(333, 77, Rgba([10, 20, 30, 255]));
        let frame = Frame::from_rgba(&raw, FrameSize::new(1280, 720), Duration::ZERO);
        assert_eq!((frame.width(), frame.height()), (1280, 720));
        assert_eq!(frame.as_bytes().len(), FrameSize::new(1280, 720).bgr_len());
        assert_eq!(frame.image().get_pixel(640, 360).0, [30, 20, 10]);
    }

    #[test]
    fn blend_extremes_are_exact() {
        let mut px = Rgb([100, 150, 200]);
        blend_pixel(&mut px, [0, 0, 0], 0.0);
        assert_eq!(px.0, [100, 150, 200]);
        blend_pixel(&mut px, [1, 2, 3], 1.0);
        assert_eq!(px.0, [1, 2, 3]);
    }

    #[test]
    fn blend_halfway_averages() {
        let mut px = Rgb([0, 100, 255]);
        blend_pixel(&mut px, [255, 100, 0], 0.5);
        assert_eq!(px.0, [128, 100, 128]);
    }
}
