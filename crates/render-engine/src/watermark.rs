//! Watermark resolution and drawing.
//!
//! A [`WatermarkSpec`] is resolved once at session start: the font is
//! loaded and the text rasterized into coverage masks, or the image is
//! decoded and pre-scaled to 20 % of the frame height. Per-frame work is
//! then a single blend pass over the anchored box.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use recast_common::error::{RecastError, RecastResult};
use recast_session_model::{
    Anchor, FrameSize, WatermarkKind, WatermarkSettings, WATERMARK_MARGIN_PX,
};

use crate::frame::{blend_pixel, Frame};

/// Image watermarks are scaled to this fraction of the frame height.
pub const IMAGE_HEIGHT_FRACTION: f64 = 0.2;

/// Blank border around rasterized text so the stroke and glyph overhang
/// are not clipped.
const TEXT_PAD: u32 = 2;

const STROKE: [u8; 3] = [0, 0, 0];
const FILL: [u8; 3] = [255, 255, 255];

/// Fonts tried, in order, when no font path is configured.
const FALLBACK_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
    "C:\\Windows\\Fonts\\simhei.ttf",
];

/// A watermark ready to be drawn onto frames of one fixed size.
#[derive(Debug, Clone)]
pub enum WatermarkSpec {
    Text(TextWatermark),
    Image(ImageWatermark),
}

/// Rasterized text: a white fill mask and a dark 1 px stroke mask.
#[derive(Debug, Clone)]
pub struct TextWatermark {
    origin: (i64, i64),
    fill: GrayImage,
    stroke: GrayImage,
    opacity: f32,
}

/// A decoded, pre-scaled image watermark.
#[derive(Debug, Clone)]
pub struct ImageWatermark {
    origin: (i64, i64),
    pixels: RgbaImage,
    opacity: f32,
}

impl WatermarkSpec {
    /// Resolve provider settings for frames of `frame` size.
    ///
    /// Returns `Ok(None)` when the settings describe nothing to draw.
    pub fn resolve(settings: &WatermarkSettings, frame: FrameSize) -> RecastResult<Option<Self>> {
        if !settings.is_enabled() {
            return Ok(None);
        }
        let opacity = settings.clamped_opacity();
        let spec = match settings.kind {
            WatermarkKind::Text => {
                let font_path = match &settings.font_path {
                    Some(path) => path.clone(),
                    None => find_system_font().ok_or_else(|| {
                        RecastError::config("no usable font found for the text watermark")
                    })?,
                };
                let font = load_font(&font_path)?;
                WatermarkSpec::Text(TextWatermark::rasterize(
                    &font,
                    settings.font_size,
                    settings.text.trim(),
                    opacity,
                    settings.anchor,
                    frame,
                ))
            }
            WatermarkKind::Image => {
                let path = settings
                    .image_path
                    .as_deref()
                    .ok_or_else(|| RecastError::config("image watermark has no image path"))?;
                WatermarkSpec::Image(ImageWatermark::load(path, opacity, settings.anchor, frame)?)
            }
        };
        tracing::debug!(
            kind = ?settings.kind,
            anchor = ?settings.anchor,
            opacity,
            "Watermark resolved"
        );
        Ok(Some(spec))
    }

    pub fn apply(&self, frame: &mut Frame) {
        match self {
            WatermarkSpec::Text(text) => text.apply(frame),
            WatermarkSpec::Image(image) => image.apply(frame),
        }
    }
}

impl TextWatermark {
    fn rasterize(
        font: &FontVec,
        font_size: u32,
        text: &str,
        opacity: f32,
        anchor: Anchor,
        frame: FrameSize,
    ) -> Self {
        let scale = PxScale::from(font_size.max(1) as f32);
        let (text_w, text_h) = text_size(scale, font, text);
        let width = text_w + 2 * TEXT_PAD;
        let height = text_h + 2 * TEXT_PAD;

        let mut fill = GrayImage::new(width, height);
        let mut stroke = GrayImage::new(width, height);
        let pad = TEXT_PAD as i32;
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx == 0 && dy == 0 {
                    continue;
                }
                draw_text_mut(&mut stroke, Luma([255]), pad + dx, pad + dy, scale, font, text);
            }
        }
        draw_text_mut(&mut fill, Luma([255]), pad, pad, scale, font, text);

        let (x, y) = anchor.place(frame.width, frame.height, text_w, text_h, WATERMARK_MARGIN_PX);
        let origin = (x - TEXT_PAD as i64, y - TEXT_PAD as i64);
        Self::from_masks(origin, fill, stroke, opacity)
    }

    /// Build from pre-rendered coverage masks of equal size.
    pub fn from_masks(origin: (i64, i64), fill: GrayImage, stroke: GrayImage, opacity: f32) -> Self {
        Self {
            origin,
            fill,
            stroke,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    pub fn apply(&self, frame: &mut Frame) {
        if self.opacity <= 0.0 {
            return;
        }
        let image = frame.image_mut();
        let (fw, fh) = (image.width() as i64, image.height() as i64);
        for (mx, my, fill) in self.fill.enumerate_pixels() {
            let x = self.origin.0 + mx as i64;
            let y = self.origin.1 + my as i64;
            if x < 0 || y < 0 || x >= fw || y >= fh {
                continue;
            }
            let stroke = self.stroke.get_pixel(mx, my).0[0];
            let px = image.get_pixel_mut(x as u32, y as u32);
            blend_pixel(px, STROKE, coverage(stroke) * self.opacity);
            blend_pixel(px, FILL, coverage(fill.0[0]) * self.opacity);
        }
    }
}

impl ImageWatermark {
    fn load(path: &Path, opacity: f32, anchor: Anchor, frame: FrameSize) -> RecastResult<Self> {
        if !path.exists() {
            return Err(RecastError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let decoded = image::open(path).map_err(|e| {
            RecastError::config(format!("cannot decode watermark image {}: {e}", path.display()))
        })?;
        // Images without an alpha channel come back fully opaque.
        Ok(Self::scaled(decoded.to_rgba8(), opacity, anchor, frame))
    }

    /// Scale `pixels` to 20 % of the frame height, keeping the aspect
    /// ratio, and anchor the result.
    pub fn scaled(pixels: RgbaImage, opacity: f32, anchor: Anchor, frame: FrameSize) -> Self {
        let target_h = ((frame.height as f64 * IMAGE_HEIGHT_FRACTION).round() as u32).max(1);
        let (w, h) = pixels.dimensions();
        let target_w = ((w as f64 * target_h as f64 / h.max(1) as f64).round() as u32).max(1);
        let pixels = if (w, h) == (target_w, target_h) {
            pixels
        } else {
            imageops::resize(&pixels, target_w, target_h, FilterType::Lanczos3)
        };
        let origin = anchor.place(
            frame.width,
            frame.height,
            pixels.width(),
            pixels.height(),
            WATERMARK_MARGIN_PX,
        );
        Self {
            origin,
            pixels,
            opacity: opacity.clamp(0.0, 1.0),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn origin(&self) -> (i64, i64) {
        self.origin
    }

    pub fn apply(&self, frame: &mut Frame) {
        if self.opacity <= 0.0 {
            return;
        }
        let image = frame.image_mut();
        let (fw, fh) = (image.width() as i64, image.height() as i64);
        for (mx, my, src) in self.pixels.enumerate_pixels() {
            let x = self.origin.0 + mx as i64;
            let y = self.origin.1 + my as i64;
            if x < 0 || y < 0 || x >= fw || y >= fh {
                continue;
            }
            let [r, g, b, a] = src.0;
            blend_pixel(
                image.get_pixel_mut(x as u32, y as u32),
                [b, g, r],
                coverage(a) * self.opacity,
            );
        }
    }
}

fn coverage(value: u8) -> f32 {
    value as f32 / 255.0
}

/// First fallback font present on this system.
pub fn find_system_font() -> Option<PathBuf> {
    FALLBACK_FONTS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

fn load_font(path: &Path) -> RecastResult<FontVec> {
    let bytes = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RecastError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            RecastError::Io(e)
        }
    })?;
    FontVec::try_from_vec(bytes)
        .map_err(|e| RecastError::config(format!("invalid font {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};
    use std::time::Duration;

    fn grey_frame(size: FrameSize) -> Frame {
        let mut frame = Frame::black(size, Duration::ZERO);
        for px in frame.image_mut().pixels_mut() {
            *px = Rgb([90, 90, 90]);
        }
        frame
    }

    #[test]
    fn disabled_settings_resolve_to_nothing() {
        let settings = WatermarkSettings::default();
        assert!(WatermarkSpec::resolve(&settings, FrameSize::HD).unwrap().is_none());
    }

    #[test]
    fn missing_font_is_an_error() {
        let settings = WatermarkSettings {
            text: "recast".to_string(),
            font_path: Some(PathBuf::from("/definitely/not/here.ttf")),
            ..Default::default()
        };
        let err = WatermarkSpec::resolve(&settings, FrameSize::HD).unwrap_err();
        assert!(matches!(err, RecastError::FileNotFound { .. }));
    }

    #[test]
    fn image_is_prescaled_to_a_fifth_of_frame_height() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        RgbImage::from_pixel(400, 200, Rgb([255, 0, 0])).save(&path).unwrap();

        let settings = WatermarkSettings {
            kind: WatermarkKind::Image,
            image_path: Some(path),
            opacity: 1.0,
            ..Default::default()
        };
        let spec = WatermarkSpec::resolve(&settings, FrameSize::HD).unwrap().unwrap();
        let WatermarkSpec::Image(image) = spec else {
            panic!("expected an image watermark");
        };
        assert_eq!(image.dimensions(), (288, 144));
        assert_eq!(image.origin(), (1280 - 288 - 10, 720 - 144 - 10));
    }

    #[test]
    fn opaque_image_at_full_opacity_is_written_unblended() {
        let size = FrameSize::new(100, 50);
        let pixels = RgbaImage::from_pixel(20, 10, Rgba([10, 20, 30, 255]));
        let watermark = ImageWatermark::scaled(pixels, 1.0, Anchor::TopLeft, size);
        let mut frame = grey_frame(size);
        watermark.apply(&mut frame);
        assert_eq!(frame.image().get_pixel(10, 10).0, [30, 20, 10]);
    }

    #[test]
    fn zero_opacity_never_alters_pixels() {
        let size = FrameSize::new(100, 50);
        let before = grey_frame(size);

        let image = ImageWatermark::scaled(
            RgbaImage::from_pixel(20, 10, Rgba([255, 255, 255, 255])),
            0.0,
            Anchor::BottomRight,
            size,
        );
        let mask = GrayImage::from_pixel(30, 12, Luma([255]));
        let text = TextWatermark::from_masks((5, 5), mask.clone(), mask, 0.0);

        let mut frame = before.clone();
        image.apply(&mut frame);
        text.apply(&mut frame);
        assert_eq!(frame.as_bytes(), before.as_bytes());
    }

    #[test]
    fn full_opacity_text_fill_is_white() {
        let size = FrameSize::new(64, 32);
        let fill = GrayImage::from_pixel(8, 8, Luma([255]));
        let stroke = GrayImage::from_pixel(8, 8, Luma([255]));
        let text = TextWatermark::from_masks((60, 28), fill, stroke, 1.0);
        let mut frame = grey_frame(size);
        text.apply(&mut frame);
        assert_eq!(frame.image().get_pixel(63, 31).0, [255, 255, 255]);
        assert_eq!(frame.image().get_pixel(10, 10).0, [90, 90, 90]);
    }
}
