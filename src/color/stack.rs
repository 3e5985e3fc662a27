use image::RgbImage;

use crate::error::RegistrationError;
use crate::Result;

/// RGB lookup table of a palette-indexed image.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    entries: Vec<[u8; 3]>,
}

impl Palette {
    /// At most 256 entries, since indices are single bytes.
    pub fn new(entries: Vec<[u8; 3]>) -> Result<Self> {
        if entries.is_empty() || entries.len() > 256 {
            return Err(RegistrationError::InvalidStack(format!(
                "palette must hold 1..=256 entries, got {}",
                entries.len()
            )));
        }
        Ok(Self { entries })
    }

    /// 256-level gray ramp.
    pub fn grayscale() -> Self {
        Self {
            entries: (0..=255u8).map(|v| [v, v, v]).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Color of `index`, or `None` past the end of the table.
    pub fn rgb(&self, index: u8) -> Option<[u8; 3]> {
        self.entries.get(index as usize).copied()
    }

    pub fn entries(&self) -> &[[u8; 3]] {
        &self.entries
    }
}

/// Pixel encoding shared by every slice of a [`ColorStack`].
#[derive(Debug, Clone)]
pub enum ColorPixels {
    /// One byte per pixel indexing into the palette.
    Indexed { palette: Palette, slices: Vec<Vec<u8>> },
    /// `0x00RRGGBB` per pixel.
    Packed { slices: Vec<Vec<u32>> },
}

/// Sequence of equally sized color slices.
#[derive(Debug, Clone)]
pub struct ColorStack {
    width: u32,
    height: u32,
    pixels: ColorPixels,
}

impl ColorStack {
    pub fn indexed(
        width: u32,
        height: u32,
        palette: Palette,
        slices: Vec<Vec<u8>>,
    ) -> Result<Self> {
        validate_shape(width, height, slices.iter().map(Vec::len))?;
        for (s, slice) in slices.iter().enumerate() {
            if let Some(&index) = slice.iter().find(|&&i| i as usize >= palette.len()) {
                return Err(RegistrationError::InvalidStack(format!(
                    "slice {s} uses palette index {index} but the palette has {} entries",
                    palette.len()
                )));
            }
        }
        Ok(Self {
            width,
            height,
            pixels: ColorPixels::Indexed { palette, slices },
        })
    }

    pub fn packed(width: u32, height: u32, slices: Vec<Vec<u32>>) -> Result<Self> {
        validate_shape(width, height, slices.iter().map(Vec::len))?;
        Ok(Self {
            width,
            height,
            pixels: ColorPixels::Packed { slices },
        })
    }

    /// Packs 8-bit RGB images into 24-bit pixels.
    pub fn from_rgb_images(images: &[RgbImage]) -> Result<Self> {
        let first = images.first().ok_or(RegistrationError::EmptySequence)?;
        let (width, height) = first.dimensions();
        let mut slices = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            if image.dimensions() != (width, height) {
                return Err(RegistrationError::DimensionMismatch {
                    index,
                    expected: (width, height),
                    actual: image.dimensions(),
                });
            }
            slices.push(image.pixels().map(|p| pack_rgb(p.0)).collect());
        }
        Self::packed(width, height, slices)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &ColorPixels {
        &self.pixels
    }

    pub fn slice_count(&self) -> usize {
        match &self.pixels {
            ColorPixels::Indexed { slices, .. } => slices.len(),
            ColorPixels::Packed { slices } => slices.len(),
        }
    }

    pub fn pixels_per_slice(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

fn validate_shape(
    width: u32,
    height: u32,
    lengths: impl ExactSizeIterator<Item = usize>,
) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(RegistrationError::InvalidStack(format!(
            "zero-area slices ({width}x{height})"
        )));
    }
    if lengths.len() == 0 {
        return Err(RegistrationError::EmptySequence);
    }
    let expected = width as usize * height as usize;
    for (s, len) in lengths.enumerate() {
        if len != expected {
            return Err(RegistrationError::InvalidStack(format!(
                "slice {s} holds {len} pixels, expected {expected}"
            )));
        }
    }
    Ok(())
}

pub fn pack_rgb([r, g, b]: [u8; 3]) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

pub fn unpack_rgb(pixel: u32) -> [f64; 3] {
    [
        ((pixel & 0x00FF_0000) >> 16) as f64,
        ((pixel & 0x0000_FF00) >> 8) as f64,
        (pixel & 0x0000_00FF) as f64,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_pack_ignores_high_byte_on_unpack() {
        assert_eq!(pack_rgb([1, 2, 3]), 0x0001_0203);
        assert_eq!(unpack_rgb(0xFF01_0203), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_from_rgb_images_rejects_mixed_sizes() {
        let a = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let b = RgbImage::from_pixel(4, 5, Rgb([1, 2, 3]));
        let err = ColorStack::from_rgb_images(&[a, b]).unwrap_err();
        assert!(matches!(err, RegistrationError::DimensionMismatch { index: 1, .. }));
    }

    #[test]
    fn test_indexed_rejects_index_beyond_palette() {
        let palette = Palette::new(vec![[0, 0, 0], [255, 255, 255]]).unwrap();
        let err = ColorStack::indexed(2, 1, palette, vec![vec![0, 2]]).unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidStack(_)));
    }

    #[test]
    fn test_palette_lookup_past_end_is_none() {
        let palette = Palette::new(vec![[9, 8, 7], [255, 255, 255]]).unwrap();
        assert_eq!(palette.rgb(0), Some([9, 8, 7]));
        assert_eq!(palette.rgb(2), None);
        assert_eq!(Palette::grayscale().rgb(255), Some([255, 255, 255]));
    }

    #[test]
    fn test_empty_and_zero_area_stacks_are_rejected() {
        assert!(matches!(
            ColorStack::packed(2, 2, vec![]),
            Err(RegistrationError::EmptySequence)
        ));
        assert!(matches!(
            ColorStack::packed(0, 2, vec![vec![]]),
            Err(RegistrationError::InvalidStack(_))
        ));
    }
}
