//! Principal-component scalarization of color stacks.

use image::{ImageBuffer, Luma};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::stack::{unpack_rgb, ColorPixels, ColorStack};
use super::statistics::ScatterStatistics;
use crate::error::NumericFallback;
use crate::numeric::{eigenvector, solve_eigenvalues, TINY};

/// Single-channel `f32` plane, the working format for registration.
pub type GrayPlane = ImageBuffer<Luma<f32>, Vec<f32>>;

/// ITU-R BT.601 luma weights.
pub const BT601_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Per-channel weights for `gray = w·(r, g, b)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorWeights {
    pub weights: [f64; 3],
    /// Set when the weights are a literal fallback rather than derived from
    /// the data.
    pub fallback: Option<NumericFallback>,
}

impl ColorWeights {
    pub fn bt601() -> Self {
        Self {
            weights: BT601_WEIGHTS,
            fallback: None,
        }
    }

    /// Weights along the dominant principal axis of the stack's colors.
    pub fn from_principal_component(stats: &ScatterStatistics) -> Self {
        let eigenvalues = solve_eigenvalues(&stats.scatter);
        if eigenvalues.sum_of_squares() <= TINY {
            tracing::warn!("color variance is near zero, using BT.601 luma weights");
            return Self {
                weights: BT601_WEIGHTS,
                fallback: Some(NumericFallback::NumericDegenerate),
            };
        }

        let best = eigenvalues.largest_absolute();
        let vector = eigenvector(&stats.scatter, best);
        let mut weights = vector.components;
        let sum: f64 = weights.iter().sum();
        if TINY < sum.abs() {
            for w in &mut weights {
                *w /= sum;
            }
        }
        tracing::debug!(eigenvalue = best, ?weights, "principal color axis");
        Self {
            weights,
            fallback: vector.fallback,
        }
    }

    pub fn apply(&self, rgb: [f64; 3]) -> f32 {
        let [wr, wg, wb] = self.weights;
        (wr * rgb[0] + wg * rgb[1] + wb * rgb[2]) as f32
    }
}

/// Scalar planes of a reduced stack and the weights that produced them.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub planes: Vec<GrayPlane>,
    pub weights: ColorWeights,
}

/// Collapses every slice to one scalar plane along the stack's first
/// principal color axis.
pub fn reduce(stack: &ColorStack) -> Reduction {
    let stats = ScatterStatistics::compute(stack);
    let weights = ColorWeights::from_principal_component(&stats);
    let planes = project(stack, &weights);
    Reduction { planes, weights }
}

/// Projects every slice onto `weights`, one slice per rayon task.
pub fn project(stack: &ColorStack, weights: &ColorWeights) -> Vec<GrayPlane> {
    let (width, height) = stack.dimensions();
    let to_plane = |data: Vec<f32>| {
        GrayPlane::from_raw(width, height, data).unwrap_or_else(|| GrayPlane::new(width, height))
    };
    match stack.pixels() {
        ColorPixels::Indexed { palette, slices } => {
            let lut: Vec<f32> = palette
                .entries()
                .iter()
                .map(|rgb| weights.apply(rgb.map(f64::from)))
                .collect();
            slices
                .par_iter()
                .map(|slice| to_plane(slice.iter().map(|&i| lut[i as usize]).collect()))
                .collect()
        }
        ColorPixels::Packed { slices } => slices
            .par_iter()
            .map(|slice| to_plane(slice.iter().map(|&p| weights.apply(unpack_rgb(p))).collect()))
            .collect(),
    }
}
