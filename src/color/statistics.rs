use super::stack::{unpack_rgb, ColorPixels, ColorStack};
use crate::numeric::Matrix3;

/// Mean color and population scatter matrix over every pixel of a stack.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScatterStatistics {
    pub mean: [f64; 3],
    pub scatter: Matrix3,
}

impl ScatterStatistics {
    /// Accumulates first and second moments over the whole stack, divides by
    /// the pixel count and subtracts the outer product of the mean.
    pub fn compute(stack: &ColorStack) -> Self {
        let mut moments = Moments::default();
        match stack.pixels() {
            ColorPixels::Indexed { palette, slices } => {
                let mut histogram = [0u64; 256];
                for slice in slices {
                    for &index in slice {
                        histogram[index as usize] += 1;
                    }
                }
                for (index, rgb) in palette.entries().iter().enumerate() {
                    let count = histogram[index];
                    if count > 0 {
                        moments.add(rgb.map(f64::from), count as f64);
                    }
                }
            }
            ColorPixels::Packed { slices } => {
                for slice in slices {
                    for &pixel in slice {
                        moments.add(unpack_rgb(pixel), 1.0);
                    }
                }
            }
        }
        let count = (stack.pixels_per_slice() * stack.slice_count()) as f64;
        moments.finish(count)
    }
}

#[derive(Default)]
struct Moments {
    sum: [f64; 3],
    // upper triangle, row major: rr rg rb gg gb bb
    products: [f64; 6],
}

impl Moments {
    fn add(&mut self, [r, g, b]: [f64; 3], weight: f64) {
        self.sum[0] += weight * r;
        self.sum[1] += weight * g;
        self.sum[2] += weight * b;
        self.products[0] += weight * r * r;
        self.products[1] += weight * r * g;
        self.products[2] += weight * r * b;
        self.products[3] += weight * g * g;
        self.products[4] += weight * g * b;
        self.products[5] += weight * b * b;
    }

    fn finish(self, count: f64) -> ScatterStatistics {
        let mean = self.sum.map(|s| s / count);
        let p = self.products.map(|s| s / count);
        let rr = p[0] - mean[0] * mean[0];
        let rg = p[1] - mean[0] * mean[1];
        let rb = p[2] - mean[0] * mean[2];
        let gg = p[3] - mean[1] * mean[1];
        let gb = p[4] - mean[1] * mean[2];
        let bb = p[5] - mean[2] * mean[2];
        ScatterStatistics {
            mean,
            scatter: Matrix3([[rr, rg, rb], [rg, gg, gb], [rb, gb, bb]]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{pack_rgb, Palette};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_two_colors_half_and_half() {
        let black = pack_rgb([0, 0, 0]);
        let red = pack_rgb([200, 0, 0]);
        let stack = ColorStack::packed(2, 1, vec![vec![black, red], vec![red, black]]).unwrap();
        let stats = ScatterStatistics::compute(&stack);
        assert_eq!(stats.mean, [100.0, 0.0, 0.0]);
        // population variance of {0, 200}
        assert_abs_diff_eq!(stats.scatter[(0, 0)], 10_000.0, epsilon = 1e-9);
        assert_eq!(stats.scatter[(1, 1)], 0.0);
        assert_eq!(stats.scatter[(0, 2)], stats.scatter[(2, 0)]);
    }

    #[test]
    fn test_indexed_matches_packed() {
        let palette = Palette::new(vec![[10, 20, 30], [200, 100, 50], [0, 255, 0]]).unwrap();
        let indices = vec![vec![0u8, 1, 2, 1], vec![2u8, 2, 0, 1]];
        let packed: Vec<Vec<u32>> = indices
            .iter()
            .map(|s| s.iter().map(|&i| pack_rgb(palette.rgb(i).unwrap())).collect())
            .collect();

        let a = ScatterStatistics::compute(&ColorStack::indexed(2, 2, palette, indices).unwrap());
        let b = ScatterStatistics::compute(&ColorStack::packed(2, 2, packed).unwrap());
        for c in 0..3 {
            assert_abs_diff_eq!(a.mean[c], b.mean[c], epsilon = 1e-9);
        }
        assert!(a.scatter.max_abs_diff(&b.scatter) < 1e-9);
    }
}
