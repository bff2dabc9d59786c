//! Mouse-effect layers: trail, highlight, and click ripples.

use std::collections::VecDeque;
use std::time::Duration;

use image::Rgb;
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use recast_session_model::{ClickEffect, Color, HighlightEffect, HighlightStyle, TrailEffect};

use crate::frame::{bgr, BgrImage};

/// Trail segments kept and drawn.
pub const TRAIL_CAPACITY: usize = 20;

/// Click ripples disappear once this old.
pub const RIPPLE_LIFETIME: Duration = Duration::from_millis(500);

/// Pixels a ripple grows per frame.
pub const RIPPLE_GROWTH_PX: u32 = 2;

/// Brightness kept outside the spotlight circle.
pub const SPOTLIGHT_DIM: f32 = 0.7;

/// Gap between the rings of the ripple highlight.
const RIPPLE_HIGHLIGHT_STEP: i32 = 10;

/// A point in frame pixels.
pub type Point = (i32, i32);

/// An expanding ring started by a left-button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClickRipple {
    pub center: Point,
    pub started: Duration,
    pub radius: u32,
}

/// Mutable per-session overlay state.
#[derive(Debug, Clone, Default)]
pub struct OverlayState {
    trail: VecDeque<(Point, Point)>,
    ripples: Vec<ClickRipple>,
    last_cursor: Option<Point>,
}

impl OverlayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the cursor at `cursor`, extending the trail from the last
    /// known position.
    pub fn push_cursor(&mut self, cursor: Point) {
        if let Some(previous) = self.last_cursor {
            if self.trail.len() == TRAIL_CAPACITY {
                self.trail.pop_front();
            }
            self.trail.push_back((previous, cursor));
        }
        self.last_cursor = Some(cursor);
    }

    pub fn trail(&self) -> impl Iterator<Item = &(Point, Point)> {
        self.trail.iter()
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn last_cursor(&self) -> Option<Point> {
        self.last_cursor
    }

    /// Start a new ripple at `center`.
    pub fn start_ripple(&mut self, center: Point, now: Duration) {
        self.ripples.push(ClickRipple {
            center,
            started: now,
            radius: 0,
        });
    }

    /// Drop expired ripples and grow the rest, capped at `max_radius`.
    pub fn advance_ripples(&mut self, now: Duration, max_radius: u32) {
        self.ripples
            .retain(|r| now.saturating_sub(r.started) < RIPPLE_LIFETIME);
        for ripple in &mut self.ripples {
            ripple.radius = (ripple.radius + RIPPLE_GROWTH_PX).min(max_radius);
        }
    }

    pub fn ripples(&self) -> &[ClickRipple] {
        &self.ripples
    }
}

/// Draw the stored trail segments.
pub fn draw_trail(image: &mut BgrImage, state: &OverlayState, effect: &TrailEffect) {
    let color = bgr(effect.color);
    for &(start, end) in state.trail() {
        draw_thick_segment(image, start, end, effect.width.max(1), color);
    }
}

/// Draw the cursor highlight for the configured style.
pub fn draw_highlight(image: &mut BgrImage, cursor: Point, effect: &HighlightEffect) {
    let size = effect.size as i32;
    match effect.style {
        HighlightStyle::Ring => {
            draw_ring(image, cursor, size, 2, bgr(Color::WHITE));
        }
        HighlightStyle::Spotlight => spotlight(image, cursor, size),
        HighlightStyle::Ripple => {
            for ring in 0..3 {
                let radius = size - ring * RIPPLE_HIGHLIGHT_STEP;
                if radius > 0 {
                    draw_hollow_circle_mut(image, cursor, radius, bgr(Color::WHITE));
                }
            }
        }
    }
}

/// Draw every live click ripple.
pub fn draw_ripples(image: &mut BgrImage, state: &OverlayState, effect: &ClickEffect) {
    let color = bgr(effect.color);
    for ripple in state.ripples() {
        draw_ring(image, ripple.center, ripple.radius as i32, 2, color);
    }
}

/// Dim everything outside a circle of `radius` around `center`.
fn spotlight(image: &mut BgrImage, center: Point, radius: i32) {
    let r2 = (radius.max(0) as i64).pow(2);
    for (x, y, px) in image.enumerate_pixels_mut() {
        let dx = x as i64 - center.0 as i64;
        let dy = y as i64 - center.1 as i64;
        if dx * dx + dy * dy > r2 {
            for channel in px.0.iter_mut() {
                *channel = (*channel as f32 * SPOTLIGHT_DIM).round() as u8;
            }
        }
    }
}

/// Circle outline `thickness` pixels wide, growing inward from `radius`.
fn draw_ring(image: &mut BgrImage, center: Point, radius: i32, thickness: i32, color: Rgb<u8>) {
    for inset in 0..thickness {
        let r = radius - inset;
        if r > 0 {
            draw_hollow_circle_mut(image, center, r, color);
        }
    }
}

/// Line segment `width` pixels wide, offset across its minor axis.
fn draw_thick_segment(image: &mut BgrImage, start: Point, end: Point, width: u32, color: Rgb<u8>) {
    let steep = (end.1 - start.1).abs() > (end.0 - start.0).abs();
    let half = (width as i32 - 1) / 2;
    for offset in -half..(width as i32 - half) {
        let (ox, oy) = if steep { (offset, 0) } else { (0, offset) };
        draw_line_segment_mut(
            image,
            ((start.0 + ox) as f32, (start.1 + oy) as f32),
            ((end.0 + ox) as f32, (end.1 + oy) as f32),
            color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_cursor_sample_starts_no_segment() {
        let mut state = OverlayState::new();
        state.push_cursor((5, 5));
        assert_eq!(state.trail_len(), 0);
        state.push_cursor((6, 7));
        assert_eq!(state.trail().next(), Some(&((5, 5), (6, 7))));
    }

    #[test]
    fn ripples_grow_to_click_size_then_expire() {
        let mut state = OverlayState::new();
        state.start_ripple((10, 10), Duration::ZERO);
        for frame in 1..=15u64 {
            state.advance_ripples(Duration::from_millis(frame * 33), 20);
        }
        assert_eq!(state.ripples()[0].radius, 20);

        state.advance_ripples(Duration::from_millis(499), 20);
        assert_eq!(state.ripples().len(), 1);
        state.advance_ripples(Duration::from_millis(500), 20);
        assert!(state.ripples().is_empty());
    }

    #[test]
    fn spotlight_keeps_circle_and_dims_outside() {
        let mut image = BgrImage::from_pixel(40, 40, Rgb([200, 100, 50]));
        let effect = HighlightEffect {
            enabled: true,
            style: HighlightStyle::Spotlight,
            size: 5,
        };
        draw_highlight(&mut image, (20, 20), &effect);
        assert_eq!(image.get_pixel(20, 20).0, [200, 100, 50]);
        assert_eq!(image.get_pixel(0, 0).0, [140, 70, 35]);
    }

    #[test]
    fn ripple_highlight_skips_non_positive_radii() {
        let mut image = BgrImage::new(30, 30);
        let effect = HighlightEffect {
            enabled: true,
            style: HighlightStyle::Ripple,
            size: 8,
        };
        draw_highlight(&mut image, (15, 15), &effect);
        assert_eq!(image.get_pixel(15 + 8, 15).0, [255, 255, 255]);
        assert_eq!(image.get_pixel(15, 15).0, [0, 0, 0]);
    }

    proptest! {
        #[test]
        fn trail_never_exceeds_capacity(points in prop::collection::vec((-500i32..3000, -500i32..3000), 0..200)) {
            let mut state = OverlayState::new();
            for p in points {
                state.push_cursor(p);
                prop_assert!(state.trail_len() <= TRAIL_CAPACITY);
            }
        }
    }
}
