//! Watermark settings as supplied by the watermark provider.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Margin between a watermark and the two frame edges of its anchor corner.
pub const WATERMARK_MARGIN_PX: i64 = 10;

/// Which kind of watermark to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkKind {
    #[default]
    Text,
    Image,
}

/// Frame corner a watermark is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
}

impl Anchor {
    /// Top-left pixel for a `box_w` x `box_h` box anchored in a
    /// `frame_w` x `frame_h` frame, `margin` pixels from both edges.
    pub fn place(self, frame_w: u32, frame_h: u32, box_w: u32, box_h: u32, margin: i64) -> (i64, i64) {
        let right = frame_w as i64 - box_w as i64 - margin;
        let bottom = frame_h as i64 - box_h as i64 - margin;
        match self {
            Anchor::TopLeft => (margin, margin),
            Anchor::TopRight => (right, margin),
            Anchor::BottomLeft => (margin, bottom),
            Anchor::BottomRight => (right, bottom),
        }
    }
}

/// Watermark provider settings, read once at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkSettings {
    pub kind: WatermarkKind,

    /// Text to draw for [`WatermarkKind::Text`]. Empty disables the watermark.
    pub text: String,

    /// Font size in pixels.
    pub font_size: u32,

    /// TrueType/OpenType font used for text. When unset, common system
    /// font locations are searched.
    pub font_path: Option<PathBuf>,

    /// Image file for [`WatermarkKind::Image`].
    pub image_path: Option<PathBuf>,

    /// Opacity in `[0.0, 1.0]`.
    pub opacity: f32,

    pub anchor: Anchor,
}

impl Default for WatermarkSettings {
    fn default() -> Self {
        Self {
            kind: WatermarkKind::Text,
            text: String::new(),
            font_size: 24,
            font_path: None,
            image_path: None,
            opacity: 0.5,
            anchor: Anchor::BottomRight,
        }
    }
}

impl WatermarkSettings {
    /// Whether these settings describe something to draw.
    pub fn is_enabled(&self) -> bool {
        match self.kind {
            WatermarkKind::Text => !self.text.trim().is_empty(),
            WatermarkKind::Image => self.image_path.is_some(),
        }
    }

    /// Opacity clamped into `[0.0, 1.0]`.
    pub fn clamped_opacity(&self) -> f32 {
        if self.opacity.is_finite() {
            self.opacity.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchors_keep_ten_pixel_margins() {
        let m = WATERMARK_MARGIN_PX;
        assert_eq!(Anchor::TopLeft.place(1280, 720, 100, 40, m), (10, 10));
        assert_eq!(Anchor::TopRight.place(1280, 720, 100, 40, m), (1170, 10));
        assert_eq!(Anchor::BottomLeft.place(1280, 720, 100, 40, m), (10, 670));
        assert_eq!(Anchor::BottomRight.place(1280, 720, 100, 40, m), (1170, 670));
    }

    #[test]
    fn empty_text_disables_text_watermark() {
        let mut settings = WatermarkSettings::default();
        assert!(!settings.is_enabled());
        settings.text = "recast".to_string();
        assert!(settings.is_enabled());
    }

    #[test]
    fn legacy_partial_settings_fill_defaults() {
        let parsed: WatermarkSettings =
            serde_json::from_str(r#"{"kind":"image","image_path":"/tmp/logo.png"}"#).unwrap();
        assert_eq!(parsed.kind, WatermarkKind::Image);
        assert_eq!(parsed.font_size, 24);
        assert_eq!(parsed.anchor, Anchor::BottomRight);
        assert!(parsed.is_enabled());
    }

    #[test]
    fn opacity_is_clamped() {
        let settings = WatermarkSettings {
            opacity: 1.7,
            ..Default::default()
        };
        assert_eq!(settings.clamped_opacity(), 1.0);
    }
}
