//! Capture geometry: screen rectangles and output frame sizes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ModelError;

/// A rectangle on the virtual desktop, in screen pixels.
///
/// Supplied by a region or window picker. `None` in a session config means
/// "the primary display".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRect {
    pub top: i32,
    pub left: i32,
    pub width: u32,
    pub height: u32,
}

impl CaptureRect {
    pub fn new(top: i32, left: i32, width: u32, height: u32) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Whether the rectangle has a positive area.
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    /// Whether `other` lies entirely inside this rectangle.
    pub fn contains_rect(&self, other: &CaptureRect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Whether a global screen point lies inside this rectangle.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        (x as i64) >= self.left as i64
            && (x as i64) < self.right()
            && (y as i64) >= self.top as i64
            && (y as i64) < self.bottom()
    }

    /// Translate a global screen point into capture-relative pixels.
    pub fn to_local(&self, x: i32, y: i32) -> (i32, i32) {
        (x.saturating_sub(self.left), y.saturating_sub(self.top))
    }

    /// Translate a global screen point into pixels of a frame of `size`
    /// that the captured rectangle is resized to.
    pub fn to_frame(&self, x: i32, y: i32, size: FrameSize) -> (i32, i32) {
        let (lx, ly) = self.to_local(x, y);
        let sx = size.width as f64 / self.width.max(1) as f64;
        let sy = size.height as f64 / self.height.max(1) as f64;
        (
            (lx as f64 * sx).round() as i32,
            (ly as f64 * sy).round() as i32,
        )
    }
}

impl fmt::Display for CaptureRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.top, self.left, self.width, self.height
        )
    }
}

impl FromStr for CaptureRect {
    type Err = ModelError;

    /// Parse `top,left,width,height`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(ModelError::parse(
                "capture rectangle",
                s,
                "expected top,left,width,height",
            ));
        }
        let int = |v: &str| {
            v.parse::<i32>()
                .map_err(|e| ModelError::parse("capture rectangle", s, e.to_string()))
        };
        let uint = |v: &str| {
            v.parse::<u32>()
                .map_err(|e| ModelError::parse("capture rectangle", s, e.to_string()))
        };
        let rect = CaptureRect::new(int(parts[0])?, int(parts[1])?, uint(parts[2])?, uint(parts[3])?);
        if !rect.is_valid() {
            return Err(ModelError::parse(
                "capture rectangle",
                s,
                "width and height must be positive",
            ));
        }
        Ok(rect)
    }
}

/// Output frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub const HD: FrameSize = FrameSize::new(1280, 720);
    pub const FULL_HD: FrameSize = FrameSize::new(1920, 1080);
    pub const UHD: FrameSize = FrameSize::new(3840, 2160);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Bytes in a packed 3-channel frame of this size.
    pub fn bgr_len(&self) -> usize {
        self.width as usize * self.height as usize * 3
    }
}

impl Default for FrameSize {
    fn default() -> Self {
        Self::FULL_HD
    }
}

impl fmt::Display for FrameSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for FrameSize {
    type Err = ModelError;

    /// Parse `WIDTHxHEIGHT`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .trim()
            .split_once(['x', 'X'])
            .ok_or_else(|| ModelError::parse("frame size", s, "expected WIDTHxHEIGHT"))?;
        let width = w
            .trim()
            .parse::<u32>()
            .map_err(|e| ModelError::parse("frame size", s, e.to_string()))?;
        let height = h
            .trim()
            .parse::<u32>()
            .map_err(|e| ModelError::parse("frame size", s, e.to_string()))?;
        let size = FrameSize::new(width, height);
        if !size.is_valid() {
            return Err(ModelError::parse(
                "frame size",
                s,
                "width and height must be positive",
            ));
        }
        Ok(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_rect_in_top_left_width_height_order() {
        let rect: CaptureRect = "100, 200, 640, 480".parse().unwrap();
        assert_eq!(rect, CaptureRect::new(100, 200, 640, 480));
        assert_eq!(rect.to_string(), "100,200,640,480");
    }

    #[test]
    fn rejects_zero_area_rect() {
        assert!("0,0,0,480".parse::<CaptureRect>().is_err());
        assert!("0,0,640".parse::<CaptureRect>().is_err());
    }

    #[test]
    fn parses_frame_size() {
        assert_eq!("1280x720".parse::<FrameSize>().unwrap(), FrameSize::HD);
        assert!("1280".parse::<FrameSize>().is_err());
        assert!("0x720".parse::<FrameSize>().is_err());
    }

    #[test]
    fn to_local_is_relative_to_top_left() {
        let rect = CaptureRect::new(100, 50, 800, 600);
        assert_eq!(rect.to_local(60, 130), (10, 30));
        assert!(rect.contains_point(50, 100));
        assert!(!rect.contains_point(850, 100));
    }

    #[test]
    fn to_frame_scales_into_output_size() {
        let rect = CaptureRect::new(0, 0, 2560, 1440);
        assert_eq!(rect.to_frame(1280, 720, FrameSize::HD), (640, 360));
    }

    proptest! {
        #[test]
        fn points_inside_rect_land_inside_frame(
            left in -4000i32..4000,
            top in -4000i32..4000,
            w in 1u32..4000,
            h in 1u32..4000,
            fx in 0.0f64..1.0,
            fy in 0.0f64..1.0,
        ) {
            let rect = CaptureRect::new(top, left, w, h);
            let x = left + (fx * (w - 1) as f64) as i32;
            let y = top + (fy * (h - 1) as f64) as i32;
            prop_assert!(rect.contains_point(x, y));
            let (px, py) = rect.to_frame(x, y, FrameSize::HD);
            prop_assert!((0..=1280).contains(&px));
            prop_assert!((0..=720).contains(&py));
        }
    }
}
