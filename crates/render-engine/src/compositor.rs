//! Frame compositor: resizes captured pixels and draws overlays.
//!
//! Order of operations per frame is fixed:
//!
//! 1. Resize to the session frame size (BGR)
//! 2. Text or image watermark
//! 3. Mouse trail
//! 4. Cursor highlight
//! 5. Click ripples (and the optional click sound)
//!
//! A step that cannot run is skipped and logged once per session; the
//! frame is still produced.

use std::time::Duration;

use image::RgbaImage;
use recast_common::error::{RecastError, RecastResult};
use recast_input_tracker::PointerState;
use recast_session_model::{CaptureRect, FrameSize, MouseEffectSpec, WatermarkSettings};

use crate::effects::{self, OverlayState};
use crate::frame::Frame;
use crate::watermark::WatermarkSpec;

/// Audible feedback for a left-button press. Implementations must not
/// block the caller.
pub trait ClickFeedback: Send {
    fn click(&mut self);
}

/// Overlay steps that can be skipped independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStep {
    Watermark,
    Trail,
    Highlight,
    Click,
}

impl OverlayStep {
    const ALL: [OverlayStep; 4] = [
        OverlayStep::Watermark,
        OverlayStep::Trail,
        OverlayStep::Highlight,
        OverlayStep::Click,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

enum WatermarkLayer {
    None,
    Ready(WatermarkSpec),
    Unavailable(String),
}

/// Draws the session's overlays onto every captured frame.
pub struct OverlayCompositor {
    frame_size: FrameSize,
    capture_rect: CaptureRect,
    mouse: MouseEffectSpec,
    watermark: WatermarkLayer,
    state: OverlayState,
    feedback: Option<Box<dyn ClickFeedback>>,
    warned: [bool; OverlayStep::ALL.len()],
    skipped: u64,
}

impl OverlayCompositor {
    /// Create a compositor for frames captured from `capture_rect` and
    /// scaled to `frame_size`.
    ///
    /// The watermark is resolved here, once. A resolution failure does not
    /// fail construction: the watermark step is skipped for the session.
    pub fn new(
        frame_size: FrameSize,
        capture_rect: CaptureRect,
        mouse: MouseEffectSpec,
        watermark: &WatermarkSettings,
    ) -> Self {
        let watermark = match WatermarkSpec::resolve(watermark, frame_size) {
            Ok(Some(spec)) => WatermarkLayer::Ready(spec),
            Ok(None) => WatermarkLayer::None,
            Err(e) => WatermarkLayer::Unavailable(e.to_string()),
        };
        Self {
            frame_size,
            capture_rect,
            mouse,
            watermark,
            state: OverlayState::new(),
            feedback: None,
            warned: [false; OverlayStep::ALL.len()],
            skipped: 0,
        }
    }

    /// Attach click-sound feedback; only used when the click effect asks
    /// for sound.
    pub fn with_click_feedback(mut self, feedback: Box<dyn ClickFeedback>) -> Self {
        if self.mouse.click.enabled && self.mouse.click.sound {
            self.feedback = Some(feedback);
        }
        self
    }

    pub fn frame_size(&self) -> FrameSize {
        self.frame_size
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    /// Overlay steps skipped so far.
    pub fn skipped_steps(&self) -> u64 {
        self.skipped
    }

    /// Whether this compositor needs pointer samples at all.
    pub fn wants_pointer(&self) -> bool {
        self.mouse.needs_pointer()
    }

    /// Resize `raw` and draw every overlay onto it.
    pub fn compose(
        &mut self,
        raw: &RgbaImage,
        timestamp: Duration,
        pointer: Option<PointerState>,
    ) -> Frame {
        let mut frame = Frame::from_rgba(raw, self.frame_size, timestamp);
        self.decorate(&mut frame, pointer);
        frame
    }

    /// Draw every overlay onto an already-sized frame.
    pub fn decorate(&mut self, frame: &mut Frame, pointer: Option<PointerState>) {
        let result = self.draw_watermark(frame);
        self.settle(OverlayStep::Watermark, result);

        let cursor = pointer.map(|p| {
            (
                self.capture_rect.to_frame(p.x, p.y, self.frame_size),
                p.pressed,
            )
        });

        if self.mouse.trail.enabled {
            let result = self.draw_trail(frame, cursor.map(|(c, _)| c));
            self.settle(OverlayStep::Trail, result);
        }
        if self.mouse.highlight.enabled {
            let result = self.draw_highlight(frame, cursor.map(|(c, _)| c));
            self.settle(OverlayStep::Highlight, result);
        }
        if self.mouse.click.enabled {
            let result = self.draw_clicks(frame, cursor);
            self.settle(OverlayStep::Click, result);
        }
    }

    fn draw_watermark(&self, frame: &mut Frame) -> RecastResult<()> {
        match &self.watermark {
            WatermarkLayer::None => Ok(()),
            WatermarkLayer::Ready(spec) => {
                spec.apply(frame);
                Ok(())
            }
            WatermarkLayer::Unavailable(reason) => Err(RecastError::config(reason.clone())),
        }
    }

    fn draw_trail(&mut self, frame: &mut Frame, cursor: Option<(i32, i32)>) -> RecastResult<()> {
        let cursor = cursor.ok_or_else(no_pointer)?;
        self.state.push_cursor(cursor);
        effects::draw_trail(frame.image_mut(), &self.state, &self.mouse.trail);
        Ok(())
    }

    fn draw_highlight(&self, frame: &mut Frame, cursor: Option<(i32, i32)>) -> RecastResult<()> {
        let cursor = cursor.ok_or_else(no_pointer)?;
        effects::draw_highlight(frame.image_mut(), cursor, &self.mouse.highlight);
        Ok(())
    }

    fn draw_clicks(
        &mut self,
        frame: &mut Frame,
        cursor: Option<((i32, i32), bool)>,
    ) -> RecastResult<()> {
        let now = frame.timestamp;
        if let Some((position, true)) = cursor {
            self.state.start_ripple(position, now);
            if let Some(feedback) = self.feedback.as_mut() {
                feedback.click();
            }
        }
        self.state.advance_ripples(now, self.mouse.click.size);
        effects::draw_ripples(frame.image_mut(), &self.state, &self.mouse.click);
        Ok(())
    }

    fn settle(&mut self, step: OverlayStep, result: RecastResult<()>) {
        if let Err(e) = result {
            self.skipped += 1;
            let warned = &mut self.warned[step.index()];
            if !*warned {
                *warned = true;
                tracing::warn!(step = ?step, error = %e, "Overlay step skipped");
            }
        }
    }
}

fn no_pointer() -> RecastError {
    RecastError::unsupported("no pointer sample for this frame")
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use recast_session_model::{HighlightStyle, WatermarkKind};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const SIZE: FrameSize = FrameSize::new(320, 180);

    fn raw(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([60, 60, 60, 255]))
    }

    fn rect() -> CaptureRect {
        CaptureRect::new(100, 200, 640, 360)
    }

    fn pointer(x: i32, y: i32, pressed: bool) -> Option<PointerState> {
        Some(PointerState { x, y, pressed })
    }

    struct CountingFeedback(Arc<AtomicU32>);

    impl ClickFeedback for CountingFeedback {
        fn click(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn frames_come_out_at_target_size_without_overlays() {
        let mut compositor = OverlayCompositor::new(
            SIZE,
            rect(),
            MouseEffectSpec::disabled(),
            &WatermarkSettings::default(),
        );
        let frame = compositor.compose(&raw(640, 360), Duration::ZERO, None);
        assert_eq!(frame.size(), SIZE);
        assert!(frame.as_bytes().iter().all(|&b| b == 60));
    }

    #[test]
    fn pointer_is_mapped_into_frame_coordinates() {
        let mut mouse = MouseEffectSpec::disabled();
        mouse.highlight.enabled = true;
        mouse.highlight.style = HighlightStyle::Ring;
        mouse.highlight.size = 10;
        let mut compositor =
            OverlayCompositor::new(SIZE, rect(), mouse, &WatermarkSettings::default());

        // Global (520, 280) is local (320, 180), i.e. frame (160, 90).
        let frame = compositor.compose(&raw(640, 360), Duration::ZERO, pointer(520, 280, false));
        assert_eq!(frame.image().get_pixel(170, 90).0, [255, 255, 255]);
        assert_eq!(frame.image().get_pixel(160, 90).0, [60, 60, 60]);
    }

    #[test]
    fn click_edge_starts_ripple_and_plays_feedback_once() {
        let mut mouse = MouseEffectSpec::disabled();
        mouse.click.enabled = true;
        mouse.click.sound = true;
        let clicks = Arc::new(AtomicU32::new(0));
        let mut compositor =
            OverlayCompositor::new(SIZE, rect(), mouse, &WatermarkSettings::default())
                .with_click_feedback(Box::new(CountingFeedback(clicks.clone())));

        let source = raw(640, 360);
        compositor.compose(&source, Duration::ZERO, pointer(300, 200, true));
        compositor.compose(&source, Duration::from_millis(33), pointer(300, 200, false));
        assert_eq!(clicks.load(Ordering::SeqCst), 1);
        assert_eq!(compositor.state().ripples().len(), 1);
        assert_eq!(compositor.state().ripples()[0].radius, 4);

        compositor.compose(&source, Duration::from_millis(600), pointer(300, 200, false));
        assert!(compositor.state().ripples().is_empty());
    }

    #[test]
    fn unavailable_watermark_is_skipped_and_frame_still_emitted() {
        let watermark = WatermarkSettings {
            kind: WatermarkKind::Image,
            image_path: Some(PathBuf::from("/missing/logo.png")),
            ..Default::default()
        };
        let mut compositor =
            OverlayCompositor::new(SIZE, rect(), MouseEffectSpec::disabled(), &watermark);
        let source = raw(640, 360);
        let frame = compositor.compose(&source, Duration::ZERO, None);
        compositor.compose(&source, Duration::ZERO, None);
        assert_eq!(frame.size(), SIZE);
        assert_eq!(compositor.skipped_steps(), 2);
    }

    #[test]
    fn missing_pointer_skips_mouse_steps() {
        let mut compositor = OverlayCompositor::new(
            SIZE,
            rect(),
            MouseEffectSpec::default(),
            &WatermarkSettings::default(),
        );
        let frame = compositor.compose(&raw(640, 360), Duration::ZERO, None);
        assert!(frame.as_bytes().iter().all(|&b| b == 60));
        assert_eq!(compositor.state().trail_len(), 0);
    }
}
