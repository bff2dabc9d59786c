//! Recast Render Engine
//!
//! Real-time overlay compositing for captured screen frames.
//!
//! # Pipeline Architecture
//!
//! ```text
//! raw RGBA capture ──┐
//!                    ├── Resize to frame size (BGR)
//!                    │         │
//! watermark spec ────┘         ├── Watermark (text or image)
//!                              │         │
//! pointer sample ──────────────┘         ├── Trail → Highlight → Click ripples
//!                                        │
//!                                        ▼
//!                                  composited Frame ──► VideoSink
//! ```

pub mod compositor;
pub mod effects;
pub mod frame;
pub mod watermark;

pub use compositor::{ClickFeedback, OverlayCompositor, OverlayStep};
pub use effects::{ClickRipple, OverlayState, TRAIL_CAPACITY};
pub use frame::{BgrImage, Frame};
pub use watermark::WatermarkSpec;
