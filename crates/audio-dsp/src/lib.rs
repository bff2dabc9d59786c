//! Recast Audio DSP
//!
//! Chunk-level audio processing for the capture session's audio path:
//!
//! - **Mixing:** Per-source gain and summation into one stereo stream
//! - **Filtering:** Butterworth band-pass in second-order sections
//! - **Noise reduction:** Speech band-pass, adaptive soft gate, and
//!   soft-knee compression with makeup gain
//!
//! Everything here is synchronous and allocation-bounded per chunk; the
//! audio thread calls it once per mixing cycle.

pub mod chunk;
pub mod filter;
pub mod mixer;
pub mod noise;

pub use chunk::AudioChunk;
pub use filter::BandPass;
pub use mixer::AudioMixer;
pub use noise::{NoiseReducer, Reduced};
