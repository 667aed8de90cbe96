// ============================================================================
// ADJUSTMENT OPERATIONS — nondestructive tonal model
// ============================================================================
//
// `AdjustmentState` is pure description: the sliders' current values. Each
// render it is lowered to an ordered list of tone operations (the same
// brightness/contrast/saturate/sepia/hue-rotate functions a CSS `filter`
// string provides) which are then applied per pixel, parallelized per row
// via rayon. The mapping is order-stable: the same state always yields the
// same op list.
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Descriptive tonal state, consumed each render.
///
/// `brightness`, `contrast`, `saturation` (and the secondary sliders) are in
/// -100..100 UI units; 0 everywhere means "no adjustment". `tint` is an
/// optional RGBA overlay color composited only inside the foreground's alpha
/// footprint — it is handled by the compositor, not the tone-op list.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustmentState {
    pub brightness: f32,
    pub contrast: f32,
    pub saturation: f32,
    pub exposure: f32,
    pub shadows: f32,
    pub highlights: f32,
    pub temperature: f32,
    pub tint_shift: f32,
    pub vibrance: f32,
    pub clarity: f32,
    pub tint: Option<Rgba<u8>>,
}

impl Default for AdjustmentState {
    fn default() -> Self {
        Self {
            brightness: 0.0,
            contrast: 0.0,
            saturation: 0.0,
            exposure: 0.0,
            shadows: 0.0,
            highlights: 0.0,
            temperature: 0.0,
            tint_shift: 0.0,
            vibrance: 0.0,
            clarity: 0.0,
            tint: None,
        }
    }
}

impl AdjustmentState {
    /// True when the tone-op list derived from this state is a no-op
    /// (the tint overlay is tracked separately).
    pub fn is_tonally_neutral(&self) -> bool {
        self.brightness == 0.0
            && self.contrast == 0.0
            && self.saturation == 0.0
            && self.exposure == 0.0
            && self.shadows == 0.0
            && self.highlights == 0.0
            && self.temperature == 0.0
            && self.tint_shift == 0.0
            && self.vibrance == 0.0
            && self.clarity == 0.0
    }

    pub fn is_neutral(&self) -> bool {
        self.is_tonally_neutral() && self.tint.is_none()
    }
}

// ============================================================================
// Tone-op list
// ============================================================================

/// One tonal operation. Multiplier ops carry the final factor (1.0 = no-op);
/// `Shadows`/`Highlights` carry a -1..1 lift amount; `Sepia` carries a 0..1
/// mix; `HueRotate` carries degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToneOp {
    Brightness(f32),
    Contrast(f32),
    Saturate(f32),
    Shadows(f32),
    Highlights(f32),
    Sepia(f32),
    HueRotate(f32),
}

/// Lower an [`AdjustmentState`] to its ordered tone-op list.
///
/// The combination rules: exposure folds into the brightness multiplier,
/// clarity adds a subtle contrast boost, vibrance is a weaker saturation.
/// Positive temperature warms via sepia; negative cools via a slight hue
/// rotation, as does the green/magenta tint shift.
pub fn build_tone_ops(adj: &AdjustmentState) -> Vec<ToneOp> {
    let brightness = (1.0 + (adj.brightness + adj.exposure) / 100.0).max(0.0);
    let contrast = (1.0 + adj.contrast / 100.0 + adj.clarity / 300.0).max(0.0);
    let saturation = (1.0 + adj.saturation / 100.0 + adj.vibrance / 200.0).max(0.0);

    let mut ops = vec![
        ToneOp::Brightness(brightness),
        ToneOp::Contrast(contrast),
        ToneOp::Saturate(saturation),
    ];
    if adj.shadows != 0.0 {
        ops.push(ToneOp::Shadows(adj.shadows / 100.0));
    }
    if adj.highlights != 0.0 {
        ops.push(ToneOp::Highlights(adj.highlights / 100.0));
    }
    if adj.temperature > 0.0 {
        ops.push(ToneOp::Sepia(adj.temperature / 200.0));
    } else if adj.temperature < 0.0 {
        ops.push(ToneOp::HueRotate(adj.temperature / 5.0));
    }
    if adj.tint_shift != 0.0 {
        ops.push(ToneOp::HueRotate(adj.tint_shift));
    }
    ops
}

fn op_is_neutral(op: &ToneOp) -> bool {
    matches!(
        op,
        ToneOp::Brightness(1.0) | ToneOp::Contrast(1.0) | ToneOp::Saturate(1.0)
    )
}

// ============================================================================
// Per-pixel application
// ============================================================================

/// Apply one tone op to an (r, g, b) triple in the 0..255 f32 domain.
/// Alpha is never touched by tonal ops.
fn apply_op(op: &ToneOp, r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    match *op {
        ToneOp::Brightness(m) => (r * m, g * m, b * m),
        ToneOp::Contrast(m) => (
            (r - 127.5) * m + 127.5,
            (g - 127.5) * m + 127.5,
            (b - 127.5) * m + 127.5,
        ),
        ToneOp::Saturate(s) => (
            (0.213 + 0.787 * s) * r + (0.715 - 0.715 * s) * g + (0.072 - 0.072 * s) * b,
            (0.213 - 0.213 * s) * r + (0.715 + 0.285 * s) * g + (0.072 - 0.072 * s) * b,
            (0.213 - 0.213 * s) * r + (0.715 - 0.715 * s) * g + (0.072 + 0.928 * s) * b,
        ),
        ToneOp::Shadows(amt) => {
            // Lift weighted toward dark pixels: strong for shadows, falls off
            // quadratically toward the highlights.
            let lum = (0.2126 * r + 0.7152 * g + 0.0722 * b) / 255.0;
            let lift = (1.0 - lum) * (1.0 - lum) * amt * 128.0;
            (r + lift, g + lift, b + lift)
        }
        ToneOp::Highlights(amt) => {
            let lum = (0.2126 * r + 0.7152 * g + 0.0722 * b) / 255.0;
            let lift = lum * lum * amt * 128.0;
            (r + lift, g + lift, b + lift)
        }
        ToneOp::Sepia(t) => {
            let inv = 1.0 - t;
            (
                (0.393 + 0.607 * inv) * r + (0.769 - 0.769 * inv) * g + (0.189 - 0.189 * inv) * b,
                (0.349 - 0.349 * inv) * r + (0.686 + 0.314 * inv) * g + (0.168 - 0.168 * inv) * b,
                (0.272 - 0.272 * inv) * r + (0.534 - 0.534 * inv) * g + (0.131 + 0.869 * inv) * b,
            )
        }
        ToneOp::HueRotate(deg) => {
            let (sin, cos) = deg.to_radians().sin_cos();
            (
                (0.213 + cos * 0.787 - sin * 0.213) * r
                    + (0.715 - cos * 0.715 - sin * 0.715) * g
                    + (0.072 - cos * 0.072 + sin * 0.928) * b,
                (0.213 - cos * 0.213 + sin * 0.143) * r
                    + (0.715 + cos * 0.285 + sin * 0.140) * g
                    + (0.072 - cos * 0.072 - sin * 0.283) * b,
                (0.213 - cos * 0.213 - sin * 0.787) * r
                    + (0.715 - cos * 0.715 + sin * 0.715) * g
                    + (0.072 + cos * 0.928 + sin * 0.072) * b,
            )
        }
    }
}

/// Apply an ordered tone-op list to a straight-alpha RGBA raster.
///
/// A neutral op list returns pixels bit-identical to the input (callers rely
/// on this for render determinism when no adjustment is active). Rows are
/// processed in parallel.
pub fn apply_tone_ops(src: &RgbaImage, ops: &[ToneOp]) -> RgbaImage {
    if ops.iter().all(op_is_neutral) {
        return src.clone();
    }

    let w = src.width() as usize;
    let h = src.height() as usize;
    if w == 0 || h == 0 {
        return src.clone();
    }

    let src_raw = src.as_raw();
    let stride = w * 4;
    let mut dst_raw = vec![0u8; w * h * 4];

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row_out)| {
        let row_in = &src_raw[y * stride..(y + 1) * stride];
        for x in 0..w {
            let pi = x * 4;
            let mut r = row_in[pi] as f32;
            let mut g = row_in[pi + 1] as f32;
            let mut b = row_in[pi + 2] as f32;
            for op in ops {
                (r, g, b) = apply_op(op, r, g, b);
            }
            row_out[pi] = r.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 1] = g.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 2] = b.round().clamp(0.0, 255.0) as u8;
            row_out[pi + 3] = row_in[pi + 3];
        }
    });

    RgbaImage::from_raw(w as u32, h as u32, dst_raw)
        .unwrap_or_else(|| src.clone())
}

/// Composite a tint color into the raster, restricted to its alpha footprint
/// (source-atop: fully transparent pixels are left untouched, so the tint
/// never bleeds onto whatever the raster is later composited over).
pub fn apply_tint(img: &mut RgbaImage, tint: Rgba<u8>) {
    let ta = tint[3] as f32 / 255.0;
    if ta <= 0.0 {
        return;
    }
    for px in img.pixels_mut() {
        if px[3] == 0 {
            continue;
        }
        for c in 0..3 {
            let blended = tint[c] as f32 * ta + px[c] as f32 * (1.0 - ta);
            px[c] = blended.round().clamp(0.0, 255.0) as u8;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
