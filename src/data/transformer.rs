use image::Luma;
use rayon::prelude::*;

use crate::color::GrayPlane;
use crate::error::RegistrationError;
use crate::numeric::Matrix3;
use crate::registration::TransformChain;
use crate::Result;

pub struct ImageTransformer;

impl ImageTransformer {
    /// Resamples `plane` into the reference frame.
    ///
    /// Output pixel `p` takes the value at `global · p` in the slice; samples
    /// falling outside the slice are 0.
    pub fn warp(plane: &GrayPlane, global: &Matrix3) -> GrayPlane {
        let (width, height) = plane.dimensions();
        GrayPlane::from_fn(width, height, |x, y| {
            let [sx, sy] = global.apply([x as f64, y as f64]);
            Luma([Self::bilinear_interpolate(plane, sx, sy)])
        })
    }

    /// Warps every slice by its global transform, one slice per rayon task.
    pub fn apply_chain(planes: &[GrayPlane], chain: &TransformChain) -> Result<Vec<GrayPlane>> {
        if planes.len() != chain.len() {
            return Err(RegistrationError::InvalidStack(format!(
                "chain covers {} slice(s) but {} were given",
                chain.len(),
                planes.len()
            )));
        }
        Ok(planes
            .par_iter()
            .zip(chain.steps().par_iter())
            .map(|(plane, step)| Self::warp(plane, &step.global))
            .collect())
    }

    /// Bilinear interpolation, clamped to the last row and column.
    fn bilinear_interpolate(plane: &GrayPlane, x: f64, y: f64) -> f32 {
        let width = plane.width();
        let height = plane.height();

        if x < 0.0 || y < 0.0 || x >= width as f64 || y >= height as f64 {
            return 0.0;
        }

        let x1 = x.floor() as u32;
        let y1 = y.floor() as u32;
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f64;
        let fy = y - y1 as f64;

        let p11 = plane.get_pixel(x1, y1)[0] as f64;
        let p12 = plane.get_pixel(x1, y2)[0] as f64;
        let p21 = plane.get_pixel(x2, y1)[0] as f64;
        let p22 = plane.get_pixel(x2, y2)[0] as f64;

        let interpolated = p11 * (1.0 - fx) * (1.0 - fy)
            + p21 * fx * (1.0 - fy)
            + p12 * (1.0 - fx) * fy
            + p22 * fx * fy;

        interpolated as f32
    }
}
