//! Screen grabbing through `xcap`.

use image::imageops;
use image::RgbaImage;
use recast_common::error::{RecastError, RecastResult};
use recast_session_model::CaptureRect;
use xcap::Monitor;

use super::FrameSource;

/// A display as reported by the OS.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorSummary {
    pub name: String,
    pub bounds: CaptureRect,
    pub is_primary: bool,
    pub scale_factor: f32,
}

/// List connected monitors.
pub fn list_monitors() -> RecastResult<Vec<MonitorSummary>> {
    let monitors = Monitor::all()
        .map_err(|e| RecastError::capture(format!("Failed to enumerate monitors: {e}")))?;
    Ok(monitors
        .iter()
        .enumerate()
        .map(|(idx, monitor)| MonitorSummary {
            name: monitor
                .name()
                .unwrap_or_else(|_| format!("Monitor {idx}")),
            bounds: monitor_bounds(monitor),
            is_primary: monitor.is_primary().unwrap_or(false),
            scale_factor: monitor.scale_factor().unwrap_or(1.0),
        })
        .collect())
}

/// Captures one monitor, cropped to the requested rectangle.
pub struct ScreenSource {
    monitor: Monitor,
    monitor_bounds: CaptureRect,
    region: CaptureRect,
}

impl ScreenSource {
    /// Open the monitor containing `rect`'s top-left corner, or the primary
    /// monitor when `rect` is `None`.
    pub fn open(rect: Option<CaptureRect>) -> RecastResult<Self> {
        let monitors = Monitor::all()
            .map_err(|e| RecastError::capture(format!("Failed to enumerate monitors: {e}")))?;

        let (monitor, region) = match rect {
            None => {
                let primary = monitors
                    .iter()
                    .position(|m| m.is_primary().unwrap_or(false))
                    .unwrap_or(0);
                let monitor = monitors
                    .into_iter()
                    .nth(primary)
                    .ok_or_else(|| RecastError::capture("No display available"))?;
                let bounds = monitor_bounds(&monitor);
                (monitor, bounds)
            }
            Some(rect) => {
                if !rect.is_valid() {
                    return Err(RecastError::capture(format!(
                        "Capture rectangle {}x{} has no area",
                        rect.width, rect.height
                    )));
                }
                let monitor = monitors
                    .into_iter()
                    .find(|m| monitor_bounds(m).contains_point(rect.left, rect.top))
                    .ok_or_else(|| {
                        RecastError::capture(format!(
                            "Capture rectangle at ({}, {}) is outside every display",
                            rect.left, rect.top
                        ))
                    })?;
                (monitor, rect)
            }
        };

        let monitor_bounds = monitor_bounds(&monitor);
        tracing::info!(
            monitor = %monitor.name().unwrap_or_default(),
            top = region.top,
            left = region.left,
            width = region.width,
            height = region.height,
            "Screen source opened"
        );
        Ok(Self {
            monitor,
            monitor_bounds,
            region,
        })
    }
}

impl FrameSource for ScreenSource {
    fn region(&self) -> CaptureRect {
        self.region
    }

    fn capture(&mut self) -> RecastResult<RgbaImage> {
        let full = self
            .monitor
            .capture_image()
            .map_err(|e| RecastError::capture(format!("Failed to capture screen: {e}")))?;

        if self.region == self.monitor_bounds {
            return Ok(full);
        }
        let (x, y, width, height) =
            crop_window(self.monitor_bounds, self.region, full.width(), full.height())
                .ok_or_else(|| RecastError::capture("Capture rectangle left the display"))?;
        Ok(imageops::crop_imm(&full, x, y, width, height).to_image())
    }
}

fn monitor_bounds(monitor: &Monitor) -> CaptureRect {
    CaptureRect::new(
        monitor.y().unwrap_or(0),
        monitor.x().unwrap_or(0),
        monitor.width().unwrap_or(0),
        monitor.height().unwrap_or(0),
    )
}

/// Pixel window of `region` inside a capture of `monitor`.
///
/// The captured image may be larger than the monitor's logical bounds on
/// scaled displays, so offsets are scaled by the image-to-bounds ratio. The
/// window is clipped to the image; `None` when nothing is left.
pub(crate) fn crop_window(
    monitor: CaptureRect,
    region: CaptureRect,
    image_width: u32,
    image_height: u32,
) -> Option<(u32, u32, u32, u32)> {
    if !monitor.is_valid() || image_width == 0 || image_height == 0 {
        return None;
    }
    let sx = image_width as f64 / monitor.width as f64;
    let sy = image_height as f64 / monitor.height as f64;

    let left = (region.left as i64 - monitor.left as i64) as f64 * sx;
    let top = (region.top as i64 - monitor.top as i64) as f64 * sy;
    let right = left + region.width as f64 * sx;
    let bottom = top + region.height as f64 * sy;

    let x0 = left.round().clamp(0.0, image_width as f64) as u32;
    let y0 = top.round().clamp(0.0, image_height as f64) as u32;
    let x1 = right.round().clamp(0.0, image_width as f64) as u32;
    let y1 = bottom.round().clamp(0.0, image_height as f64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_is_relative_to_monitor_origin() {
        let monitor = CaptureRect::new(0, 1920, 2560, 1440);
        let region = CaptureRect::new(100, 2020, 800, 600);
        assert_eq!(
            crop_window(monitor, region, 2560, 1440),
            Some((100, 100, 800, 600))
        );
    }

    #[test]
    fn crop_scales_on_hidpi_captures() {
        let monitor = CaptureRect::new(0, 0, 1440, 900);
        let region = CaptureRect::new(10, 20, 100, 50);
        assert_eq!(
            crop_window(monitor, region, 2880, 1800),
            Some((40, 20, 200, 100))
        );
    }

    #[test]
    fn crop_is_clipped_to_the_image() {
        let monitor = CaptureRect::new(0, 0, 1920, 1080);
        let region = CaptureRect::new(1000, 1800, 400, 400);
        assert_eq!(
            crop_window(monitor, region, 1920, 1080),
            Some((1800, 1000, 120, 80))
        );
        let outside = CaptureRect::new(2000, 0, 10, 10);
        assert_eq!(crop_window(monitor, outside, 1920, 1080), None);
    }
}
