// ============================================================================
// CROP / BAKE — flatten the visible state into a new base raster
// ============================================================================
//
// The crop rectangle is given in surface coordinates. The current composite
// (background + filtered foreground + tint, under the current view transform)
// is rendered offscreen, the sub-rectangle is extracted, and that extract
// becomes the new base image: new foreground, new retained original, new
// canvas dimensions. Everything that was baked into those pixels is then
// reset — view transform to identity, adjustments to neutral, background
// cleared — so the next render reproduces the extract exactly instead of
// re-applying any of it.
// ============================================================================

use image::RgbaImage;

use crate::compositor;
use crate::components::tools::MIN_CROP_EDGE;
use crate::ops::adjustments::AdjustmentState;
use crate::ops::transform::ViewTransform;
use crate::session::EditorSession;

/// Bake the `(x, y, w, h)` surface-space rectangle into a new base image.
///
/// Rectangles at or below the minimum edge length are treated as accidental
/// drags and ignored (returns `false`, no state change), as are regions that
/// fall entirely outside the surface after clamping. Does not touch history;
/// the session's `crop` action takes the checkpoint.
pub fn bake(session: &mut EditorSession, x: f32, y: f32, w: f32, h: f32) -> bool {
    if !session.has_image() {
        return false;
    }
    if w <= MIN_CROP_EDGE || h <= MIN_CROP_EDGE {
        return false;
    }

    // Round like the interactive editor does, then clamp to the surface.
    let x0 = (x.round().max(0.0) as u32).min(session.width);
    let y0 = (y.round().max(0.0) as u32).min(session.height);
    let cw = (w.round() as u32).min(session.width - x0);
    let ch = (h.round() as u32).min(session.height - y0);
    if cw == 0 || ch == 0 {
        return false;
    }

    let composite = compositor::render_composite(session);
    let extracted = extract_region(&composite, x0, y0, cw, ch);

    session.foreground = extracted.clone();
    session.original = Some(extracted);
    session.width = cw;
    session.height = ch;
    session.view = ViewTransform::identity();
    session.adjustments = AdjustmentState::default();
    session.background = None;
    true
}

/// Copy a sub-rectangle out of a raster. Caller guarantees bounds.
fn extract_region(src: &RgbaImage, x: u32, y: u32, w: u32, h: u32) -> RgbaImage {
    let mut out = RgbaImage::new(w, h);
    for dy in 0..h {
        for dx in 0..w {
            out.put_pixel(dx, dy, *src.get_pixel(x + dx, y + dy));
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
