use image::{open, GrayImage, Luma, RgbImage};
use std::path::{Path, PathBuf};

use crate::color::GrayPlane;
use crate::error::RegistrationError;
use crate::Result;

pub fn load_rgb_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let img = open(path)?;
    Ok(img.to_rgb8())
}

/// Loads any image as a single `f32` plane with values in 0..=255.
pub fn load_gray_plane<P: AsRef<Path>>(path: P) -> Result<GrayPlane> {
    let gray = open(path)?.to_luma8();
    Ok(to_plane(&gray))
}

/// Loads RGB slices in order; they must all share the first slice's size.
pub fn load_rgb_sequence<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<RgbImage>> {
    let images = paths.iter().map(load_rgb_image).collect::<Result<Vec<_>>>()?;
    validate_sequence(images.iter().map(|img| img.dimensions()))?;
    tracing::debug!(slices = images.len(), "loaded RGB sequence");
    Ok(images)
}

pub fn load_gray_sequence<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<GrayPlane>> {
    let planes = paths.iter().map(load_gray_plane).collect::<Result<Vec<_>>>()?;
    validate_sequence(planes.iter().map(|p| p.dimensions()))?;
    tracing::debug!(slices = planes.len(), "loaded gray sequence");
    Ok(planes)
}

fn validate_sequence(mut sizes: impl Iterator<Item = (u32, u32)>) -> Result<()> {
    let expected = sizes.next().ok_or(RegistrationError::EmptySequence)?;
    for (offset, actual) in sizes.enumerate() {
        if actual != expected {
            return Err(RegistrationError::DimensionMismatch {
                index: offset + 1,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

pub fn to_plane(gray: &GrayImage) -> GrayPlane {
    GrayPlane::from_fn(gray.width(), gray.height(), |x, y| {
        Luma([gray.get_pixel(x, y)[0] as f32])
    })
}

/// Rounds and clamps a plane to 8 bits.
pub fn to_gray8(plane: &GrayPlane) -> GrayImage {
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        Luma([plane.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Writes `slice_0000.png`, `slice_0001.png`, ... into `dir`.
pub fn save_planes<P: AsRef<Path>>(planes: &[GrayPlane], dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(planes.len());
    for (index, plane) in planes.iter().enumerate() {
        let path = dir.join(format!("slice_{index:04}.png"));
        to_gray8(plane).save(&path)?;
        written.push(path);
    }
    tracing::info!(slices = written.len(), dir = %dir.display(), "saved planes");
    Ok(written)
}
