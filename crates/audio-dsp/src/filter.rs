//! Butterworth band-pass filters as cascaded second-order sections.
//!
//! Design follows the classic analog-prototype route: Butterworth lowpass
//! poles, lowpass-to-bandpass transform at the prewarped edges, then the
//! bilinear transform. A band-pass of order `n` yields `2n` poles and `n`
//! zeros at each of `z = 1` and `z = -1`, so every section has the
//! numerator `1 - z^-2`. The cascade is scaled to unity gain at the
//! geometric center frequency.

use std::f64::consts::PI;

use num_complex::Complex64;
use recast_common::error::{RecastError, RecastResult};

/// One biquad: `b0 + b1 z^-1 + b2 z^-2` over `1 + a1 z^-1 + a2 z^-2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Section {
    fn response(&self, z_inv: Complex64) -> Complex64 {
        let z_inv2 = z_inv * z_inv;
        let num = self.b[0] + z_inv * self.b[1] + z_inv2 * self.b[2];
        let den = self.a[0] + z_inv * self.a[1] + z_inv2 * self.a[2];
        num / den
    }
}

/// A Butterworth band-pass filter.
#[derive(Debug, Clone, PartialEq)]
pub struct BandPass {
    sections: Vec<Section>,
    center_hz: f64,
    sample_rate: f64,
}

impl BandPass {
    /// Design an `order`-th order band-pass between `low_hz` and `high_hz`.
    pub fn butterworth(order: usize, low_hz: f64, high_hz: f64, sample_rate: f64) -> RecastResult<Self> {
        let nyquist = sample_rate / 2.0;
        if order == 0 {
            return Err(RecastError::dsp("filter order must be positive"));
        }
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(RecastError::dsp(format!(
                "band {low_hz}-{high_hz} Hz does not fit below Nyquist {nyquist} Hz"
            )));
        }

        let fs2 = 2.0 * sample_rate;
        let w_low = fs2 * (PI * low_hz / sample_rate).tan();
        let w_high = fs2 * (PI * high_hz / sample_rate).tan();
        let bandwidth = w_high - w_low;
        let w_center = (w_low * w_high).sqrt();

        let mut sections = Vec::with_capacity(order);
        for k in 0..order {
            let prototype = Complex64::from_polar(
                1.0,
                PI * (2 * k + order + 1) as f64 / (2 * order) as f64,
            );
            // Conjugate prototype poles produce the conjugate band-pass
            // poles, so only the upper half plane is walked. The real pole
            // of an odd order is handled below.
            if prototype.im <= 1e-9 {
                continue;
            }
            let half = prototype * (bandwidth / 2.0);
            let root = (half * half - w_center * w_center).sqrt();
            for s in [half + root, half - root] {
                let z = (fs2 + s) / (fs2 - s);
                sections.push(Section {
                    b: [1.0, 0.0, -1.0],
                    a: [1.0, -2.0 * z.re, z.norm_sqr()],
                });
            }
        }
        if order % 2 == 1 {
            // The real prototype pole at s = -1.
            let half = Complex64::new(-bandwidth / 2.0, 0.0);
            let root = (half * half - w_center * w_center).sqrt();
            let p1 = (fs2 + half + root) / (fs2 - half - root);
            let p2 = (fs2 + half - root) / (fs2 - half + root);
            let sum = p1 + p2;
            let product = p1 * p2;
            sections.push(Section {
                b: [1.0, 0.0, -1.0],
                a: [1.0, -sum.re, product.re],
            });
        }

        let center_hz = (sample_rate / PI) * (w_center / fs2).atan();
        let mut filter = Self {
            sections,
            center_hz,
            sample_rate,
        };
        filter.normalize_at(center_hz)?;
        Ok(filter)
    }

    fn normalize_at(&mut self, hz: f64) -> RecastResult<()> {
        let magnitude = self.response_at(hz).norm();
        if !magnitude.is_finite() || magnitude <= f64::EPSILON {
            return Err(RecastError::dsp(format!(
                "degenerate band-pass response at {hz:.1} Hz"
            )));
        }
        let per_section = magnitude.powf(-1.0 / self.sections.len() as f64);
        for section in &mut self.sections {
            for b in &mut section.b {
                *b *= per_section;
            }
        }
        Ok(())
    }

    /// Complex frequency response at `hz`.
    pub fn response_at(&self, hz: f64) -> Complex64 {
        let omega = 2.0 * PI * hz / self.sample_rate;
        let z_inv = Complex64::from_polar(1.0, -omega);
        self.sections
            .iter()
            .fold(Complex64::new(1.0, 0.0), |acc, s| acc * s.response(z_inv))
    }

    /// Gain at the geometric center of the pass band.
    pub fn center_hz(&self) -> f64 {
        self.center_hz
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Filter `signal` from zero initial state.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        let mut out = signal.to_vec();
        for section in &self.sections {
            // Transposed direct form II.
            let (mut s1, mut s2) = (0.0, 0.0);
            for x in out.iter_mut() {
                let input = *x;
                let y = section.b[0] * input + s1;
                s1 = section.b[1] * input - section.a[1] * y + s2;
                s2 = section.b[2] * input - section.a[2] * y;
                *x = y;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech_band() -> BandPass {
        BandPass::butterworth(6, 300.0, 3400.0, 44_100.0).unwrap()
    }

    #[test]
    fn sixth_order_band_pass_has_six_sections() {
        assert_eq!(speech_band().sections().len(), 6);
    }

    #[test]
    fn all_poles_are_inside_the_unit_circle() {
        for section in speech_band().sections() {
            // For a conjugate pair, a2 = |p|^2.
            assert!(section.a[2] < 1.0);
        }
    }

    #[test]
    fn passes_band_center_and_rejects_the_edges_of_the_spectrum() {
        let filter = speech_band();
        assert!((filter.response_at(filter.center_hz()).norm() - 1.0).abs() < 1e-9);
        assert!(filter.response_at(1000.0).norm() > 0.9);
        assert!(filter.response_at(50.0).norm() < 1e-3);
        assert!(filter.response_at(15_000.0).norm() < 1e-3);
    }

    #[test]
    fn band_edges_sit_near_half_power() {
        let filter = speech_band();
        let half_power = std::f64::consts::FRAC_1_SQRT_2;
        assert!((filter.response_at(300.0).norm() - half_power).abs() < 0.02);
        assert!((filter.response_at(3400.0).norm() - half_power).abs() < 0.02);
    }

    #[test]
    fn impossible_band_is_rejected() {
        assert!(BandPass::butterworth(6, 300.0, 3400.0, 4000.0).is_err());
        assert!(BandPass::butterworth(6, 3400.0, 300.0, 44_100.0).is_err());
        assert!(BandPass::butterworth(0, 300.0, 3400.0, 44_100.0).is_err());
    }

    #[test]
    fn dc_input_decays_to_zero() {
        let filter = speech_band();
        let out = filter.apply(&vec![0.5; 44_100]);
        assert!(out[44_099].abs() < 1e-3);
    }
}
