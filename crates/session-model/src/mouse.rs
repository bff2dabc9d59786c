//! Mouse-effect settings as supplied by the mouse-effect provider.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// How the cursor highlight is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HighlightStyle {
    /// A single circle outline around the cursor.
    #[default]
    Ring,
    /// The frame is dimmed except for a circle around the cursor.
    Spotlight,
    /// Three concentric circles at decreasing radii.
    Ripple,
}

/// Expanding ring drawn on left-button press.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickEffect {
    pub enabled: bool,
    pub color: Color,
    /// Maximum ripple radius in pixels.
    pub size: u32,
    /// Play a short click sound on press.
    pub sound: bool,
}

impl Default for ClickEffect {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Color::RED,
            size: 20,
            sound: true,
        }
    }
}

/// Line segments following recent cursor motion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrailEffect {
    pub enabled: bool,
    pub color: Color,
    /// Stroke width in pixels.
    pub width: u32,
}

impl Default for TrailEffect {
    fn default() -> Self {
        Self {
            enabled: true,
            color: Color::BLUE,
            width: 2,
        }
    }
}

/// Always-on marker around the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightEffect {
    pub enabled: bool,
    pub style: HighlightStyle,
    /// Radius in pixels.
    pub size: u32,
}

impl Default for HighlightEffect {
    fn default() -> Self {
        Self {
            enabled: true,
            style: HighlightStyle::Ring,
            size: 50,
        }
    }
}

/// Mouse-effect settings, read once at session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MouseEffectSpec {
    pub click: ClickEffect,
    pub trail: TrailEffect,
    pub highlight: HighlightEffect,
}

impl MouseEffectSpec {
    /// Every effect switched off.
    pub fn disabled() -> Self {
        Self {
            click: ClickEffect {
                enabled: false,
                sound: false,
                ..Default::default()
            },
            trail: TrailEffect {
                enabled: false,
                ..Default::default()
            },
            highlight: HighlightEffect {
                enabled: false,
                ..Default::default()
            },
        }
    }

    /// Whether any effect needs the pointer position.
    pub fn needs_pointer(&self) -> bool {
        self.click.enabled || self.trail.enabled || self.highlight.enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_defaults() {
        let spec = MouseEffectSpec::default();
        assert_eq!(spec.click.color, Color::RED);
        assert_eq!(spec.click.size, 20);
        assert_eq!(spec.trail.color, Color::BLUE);
        assert_eq!(spec.trail.width, 2);
        assert_eq!(spec.highlight.style, HighlightStyle::Ring);
        assert_eq!(spec.highlight.size, 50);
    }

    #[test]
    fn highlight_style_parses_from_snake_case() {
        let parsed: HighlightEffect =
            serde_json::from_str(r#"{"style":"spotlight","size":80}"#).unwrap();
        assert_eq!(parsed.style, HighlightStyle::Spotlight);
        assert!(parsed.enabled);
    }

    #[test]
    fn disabled_spec_needs_no_pointer() {
        assert!(!MouseEffectSpec::disabled().needs_pointer());
        assert!(MouseEffectSpec::default().needs_pointer());
    }
}
