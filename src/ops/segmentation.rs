// ============================================================================
// SEGMENTATION INTERFACE — provider trait, confidence mask, threshold apply
// ============================================================================
//
// The model itself is an external collaborator: the engine hands a provider
// an RGBA raster and receives one confidence value per pixel. Everything
// downstream of that — validation, the strict/loose operating points, and
// zeroing alpha for discarded pixels — lives here.
// ============================================================================

use std::path::PathBuf;

use image::RgbaImage;
use image::imageops::FilterType;

/// Per-pixel foreground confidence in `[0, 1]`, row-major, matching the
/// dimensions of the raster it was computed from.
#[derive(Clone, Debug)]
pub struct ConfidenceMask {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl ConfidenceMask {
    /// Build a mask from raw provider output, rejecting malformed data:
    /// wrong length, or values that are non-finite / outside `[0, 1]`.
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self, String> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(format!(
                "confidence mask has {} values, expected {} for {}x{}",
                values.len(),
                expected,
                width,
                height
            ));
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite() || **v < 0.0 || **v > 1.0) {
            return Err(format!("confidence mask contains invalid value {}", bad));
        }
        Ok(Self { width, height, values })
    }

    /// Interpret an 8-bit grayscale image as confidences (255 = certain
    /// foreground). Used by the mask-file provider.
    pub fn from_gray_image(gray: &image::GrayImage) -> Self {
        Self {
            width: gray.width(),
            height: gray.height(),
            values: gray.as_raw().iter().map(|&v| v as f32 / 255.0).collect(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn value_at(&self, x: u32, y: u32) -> f32 {
        self.values[y as usize * self.width as usize + x as usize]
    }
}

/// The two operating points for turning confidences into a keep/discard
/// decision. Strict keeps only confident foreground; loose keeps more of the
/// uncertain edge region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MaskThreshold {
    #[default]
    Strict,
    Loose,
}

impl MaskThreshold {
    pub fn cutoff(self) -> f32 {
        match self {
            MaskThreshold::Strict => 0.6,
            MaskThreshold::Loose => 0.35,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            MaskThreshold::Strict => MaskThreshold::Loose,
            MaskThreshold::Loose => MaskThreshold::Strict,
        }
    }
}

/// An opaque segmentation backend: raster in, confidence mask out.
pub trait SegmentationProvider {
    fn segment(&mut self, image: &RgbaImage) -> Result<ConfidenceMask, String>;
}

/// Zero the alpha of every pixel whose confidence falls below `cutoff`.
/// Pixels at or above the cutoff keep their existing alpha. Errors (and
/// leaves the raster untouched) when the mask dimensions don't match.
pub fn apply_confidence_mask(
    img: &mut RgbaImage,
    mask: &ConfidenceMask,
    cutoff: f32,
) -> Result<(), String> {
    if mask.width != img.width() || mask.height != img.height() {
        return Err(format!(
            "confidence mask is {}x{} but raster is {}x{}",
            mask.width,
            mask.height,
            img.width(),
            img.height()
        ));
    }
    for (i, px) in img.pixels_mut().enumerate() {
        if mask.values[i] < cutoff {
            px[3] = 0;
        }
    }
    Ok(())
}

// ============================================================================
// Mask-file provider — the shipped backend for headless runs
// ============================================================================

/// Reads a grayscale confidence mask from an image file. The mask is resized
/// to the input raster's dimensions when they differ, so masks exported at
/// model resolution work unchanged.
pub struct MaskFileProvider {
    path: PathBuf,
}

impl MaskFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SegmentationProvider for MaskFileProvider {
    fn segment(&mut self, image: &RgbaImage) -> Result<ConfidenceMask, String> {
        let gray = image::open(&self.path)
            .map_err(|e| format!("could not read mask '{}': {}", self.path.display(), e))?
            .to_luma8();

        let gray = if gray.dimensions() != image.dimensions() {
            image::imageops::resize(&gray, image.width(), image.height(), FilterType::Lanczos3)
        } else {
            gray
        };

        Ok(ConfidenceMask::from_gray_image(&gray))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn mask_validation_rejects_malformed_data() {
        assert!(ConfidenceMask::new(2, 2, vec![0.0; 3]).is_err());
        assert!(ConfidenceMask::new(2, 2, vec![0.0, 0.5, 1.0, 1.5]).is_err());
        assert!(ConfidenceMask::new(2, 2, vec![0.0, 0.5, f32::NAN, 1.0]).is_err());
        assert!(ConfidenceMask::new(2, 2, vec![0.0, 0.5, 0.9, 1.0]).is_ok());
    }

    #[test]
    fn threshold_zeroes_alpha_below_cutoff_only() {
        let mut img = RgbaImage::from_pixel(2, 1, Rgba([9, 9, 9, 200]));
        let mask = ConfidenceMask::new(2, 1, vec![0.7, 0.5]).unwrap();
        apply_confidence_mask(&mut img, &mask, MaskThreshold::Strict.cutoff()).unwrap();
        assert_eq!(img.get_pixel(0, 0)[3], 200);
        assert_eq!(img.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn loose_operating_point_keeps_more_pixels() {
        let mask = ConfidenceMask::new(2, 1, vec![0.5, 0.2]).unwrap();

        let mut strict = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        apply_confidence_mask(&mut strict, &mask, MaskThreshold::Strict.cutoff()).unwrap();
        let mut loose = RgbaImage::from_pixel(2, 1, Rgba([0, 0, 0, 255]));
        apply_confidence_mask(&mut loose, &mask, MaskThreshold::Loose.cutoff()).unwrap();

        assert_eq!(strict.get_pixel(0, 0)[3], 0);
        assert_eq!(loose.get_pixel(0, 0)[3], 255);
        assert_eq!(loose.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn dimension_mismatch_leaves_raster_untouched() {
        let mut img = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]));
        let before = img.clone();
        let mask = ConfidenceMask::new(3, 3, vec![0.0; 9]).unwrap();
        assert!(apply_confidence_mask(&mut img, &mask, 0.6).is_err());
        assert_eq!(img.as_raw(), before.as_raw());
    }

    #[test]
    fn threshold_toggle_round_trips() {
        let t = MaskThreshold::Strict;
        assert_eq!(t.toggled(), MaskThreshold::Loose);
        assert_eq!(t.toggled().toggled(), MaskThreshold::Strict);
        assert!((MaskThreshold::Strict.cutoff() - 0.6).abs() < f32::EPSILON);
        assert!((MaskThreshold::Loose.cutoff() - 0.35).abs() < f32::EPSILON);
    }
}
