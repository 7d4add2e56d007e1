//! Temporal Gaussian smoothing of hand pose channels.
//!
//! Each parameter channel is filtered independently along the frame axis
//! with a normalized Gaussian kernel of radius `floor(4 * sigma + 0.5)` and
//! nearest-edge extension, so the first and last frames only see copies of
//! themselves beyond the boundary.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;
use tracing::debug;

/// Kernel half-width in standard deviations.
const TRUNCATE: f64 = 4.0;

/// Default smoothing width in frames.
pub const DEFAULT_SIGMA: f64 = 0.3;

/// Gaussian low-pass filter applied per channel across frames.
#[derive(Debug, Clone)]
pub struct TemporalSmoother {
    sigma: f64,
    kernel: Vec<f64>,
}

impl Default for TemporalSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_SIGMA)
    }
}

impl TemporalSmoother {
    /// Create a smoother. A non-positive or non-finite sigma disables
    /// smoothing.
    pub fn new(sigma: f64) -> Self {
        Self {
            sigma,
            kernel: gaussian_kernel(sigma),
        }
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Kernel weights for offsets `-r..=r`.
    pub fn kernel(&self) -> &[f64] {
        &self.kernel
    }

    /// Smooth an `[N, C]` sequence along axis 0.
    ///
    /// Sequences shorter than two frames are returned unchanged.
    pub fn smooth(&self, sequence: ArrayView2<'_, f32>) -> Array2<f32> {
        let (frames, channels) = sequence.dim();
        if frames < 2 || self.kernel.len() < 2 {
            return sequence.to_owned();
        }

        debug!(
            frames,
            channels,
            sigma = self.sigma,
            radius = self.kernel.len() / 2,
            "Smoothing hand channels"
        );

        let columns: Vec<Vec<f32>> = (0..channels)
            .into_par_iter()
            .map(|c| self.smooth_channel(sequence.column(c)))
            .collect();

        let mut out = Array2::zeros((frames, channels));
        for (c, column) in columns.into_iter().enumerate() {
            for (dst, value) in out.index_axis_mut(Axis(1), c).iter_mut().zip(column) {
                *dst = value;
            }
        }
        out
    }

    /// Filter one channel with nearest-edge extension.
    ///
    /// Non-finite samples stay where they are and are left out of their
    /// neighbours' weighted sums.
    fn smooth_channel(&self, channel: ArrayView1<'_, f32>) -> Vec<f32> {
        let n = channel.len() as isize;
        let radius = (self.kernel.len() / 2) as isize;

        (0..n)
            .map(|i| {
                let center = channel[i as usize];
                if !center.is_finite() {
                    return center;
                }

                let mut acc = 0.0f64;
                let mut weight_sum = 0.0f64;
                for (k, weight) in (-radius..=radius).zip(self.kernel.iter()) {
                    let j = (i + k).clamp(0, n - 1) as usize;
                    let sample = channel[j];
                    if sample.is_finite() {
                        acc += weight * sample as f64;
                        weight_sum += weight;
                    }
                }
                (acc / weight_sum) as f32
            })
            .collect()
    }
}

/// Normalized Gaussian weights for offsets `-r..=r`.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return vec![1.0];
    }

    let radius = (TRUNCATE * sigma + 0.5) as i64;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let raw: Vec<f64> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / two_sigma_sq).exp())
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}
