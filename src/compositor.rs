// ============================================================================
// COMPOSITOR — state → raster, CPU-only, deterministic
// ============================================================================
//
// Draw order: background layer (flat color fills the whole surface; an image
// background is placed by its own scale/offset and warped by the view
// transform), then the tone-filtered and tinted foreground under the view
// transform, then — for interactive renders only — the live crop outline in
// untransformed surface coordinates.
//
// Non-identity layers are drawn by inverse-mapping every destination pixel
// and sampling the source bilinearly; identity draws take an exact blit path
// so a freshly baked image renders back bit-for-bit. Rows are processed in
// parallel; all math is pure, so identical state renders identically.
// ============================================================================

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::ops::adjustments::{self, build_tone_ops};
use crate::ops::transform::{self, ViewTransform};
use crate::session::{BackgroundSpec, EditorSession};

/// Crop outline color (the UI accent purple).
const CROP_OUTLINE: Rgba<u8> = Rgba([124, 58, 237, 255]);

/// Render the full interactive view, crop affordance included.
pub fn render(session: &EditorSession) -> RgbaImage {
    let mut target = render_composite(session);
    if let Some(region) = session.tool_state.active_crop() {
        stroke_crop_outline(&mut target, region.x, region.y, region.w, region.h);
    }
    target
}

/// Render the persisted composite — what export and the crop bake see.
/// Pure function of the session state.
pub fn render_composite(session: &EditorSession) -> RgbaImage {
    let mut target = RgbaImage::new(session.width, session.height);
    if session.width == 0 || session.height == 0 {
        return target;
    }

    if session.show_background {
        match &session.background {
            Some(BackgroundSpec::Color(color)) => fill_surface(&mut target, *color),
            Some(BackgroundSpec::Image {
                image,
                scale,
                offset_x,
                offset_y,
            }) => {
                let placement =
                    Placement::centered(image, *scale, *offset_x, *offset_y, session.width, session.height);
                draw_layer(&mut target, image, &session.view, Some(placement));
            }
            None => {}
        }
    }

    let ops = build_tone_ops(&session.adjustments);
    let mut foreground = adjustments::apply_tone_ops(&session.foreground, &ops);
    if let Some(tint) = session.adjustments.tint {
        adjustments::apply_tint(&mut foreground, tint);
    }
    draw_layer(&mut target, &foreground, &session.view, None);

    target
}

// ============================================================================
// Layer placement & drawing
// ============================================================================

/// Destination rectangle of a background image in canvas space: scaled about
/// the canvas center, then shifted by the background's own offset.
struct Placement {
    scale: f32,
    origin_x: f32,
    origin_y: f32,
}

impl Placement {
    fn centered(
        image: &RgbaImage,
        scale: f32,
        offset_x: f32,
        offset_y: f32,
        canvas_w: u32,
        canvas_h: u32,
    ) -> Self {
        let w = image.width() as f32 * scale;
        let h = image.height() as f32 * scale;
        Self {
            scale,
            origin_x: offset_x - (w - canvas_w as f32) / 2.0,
            origin_y: offset_y - (h - canvas_h as f32) / 2.0,
        }
    }
}

/// Source-over one layer onto the target under the view transform (and an
/// optional local placement for background images).
fn draw_layer(
    target: &mut RgbaImage,
    src: &RgbaImage,
    view: &ViewTransform,
    placement: Option<Placement>,
) {
    if src.width() == 0 || src.height() == 0 {
        return;
    }
    if let Some(p) = &placement {
        if p.scale <= 0.0 {
            return;
        }
    }

    if view.is_identity() && placement.is_none() {
        blit_over(target, src);
        return;
    }

    let tw = target.width();
    let th = target.height();
    let center = (tw as f32 / 2.0, th as f32 / 2.0);
    let stride = tw as usize * 4;
    let dst_raw: &mut [u8] = target.as_mut();

    dst_raw.par_chunks_mut(stride).enumerate().for_each(|(y, row)| {
        for x in 0..tw as usize {
            // Destination pixel center → canvas space → source space.
            let p = (x as f32 + 0.5, y as f32 + 0.5);
            let c = transform::inverse(p, view, center);
            let (sx, sy) = match &placement {
                Some(pl) => ((c.0 - pl.origin_x) / pl.scale, (c.1 - pl.origin_y) / pl.scale),
                None => c,
            };
            let sample = bilinear_sample(src, sx - 0.5, sy - 0.5);
            blend_px(&mut row[x * 4..x * 4 + 4], sample);
        }
    });
}

/// Exact source-over blit for identity transforms — no resampling, so baked
/// pixels render back unchanged.
fn blit_over(target: &mut RgbaImage, src: &RgbaImage) {
    let w = target.width().min(src.width()) as usize;
    let h = target.height().min(src.height()) as usize;
    let dst_stride = target.width() as usize * 4;
    let src_stride = src.width() as usize * 4;
    let src_raw = src.as_raw();
    let dst_raw: &mut [u8] = target.as_mut();

    dst_raw
        .par_chunks_mut(dst_stride)
        .take(h)
        .enumerate()
        .for_each(|(y, row)| {
            let src_row = &src_raw[y * src_stride..y * src_stride + w * 4];
            for x in 0..w {
                let pi = x * 4;
                let sample = Rgba([
                    src_row[pi],
                    src_row[pi + 1],
                    src_row[pi + 2],
                    src_row[pi + 3],
                ]);
                blend_px(&mut row[pi..pi + 4], sample);
            }
        });
}

/// Straight-alpha source-over blend of one sample into a destination pixel.
/// Opaque samples and transparent destinations replace exactly.
fn blend_px(dst: &mut [u8], sample: Rgba<u8>) {
    let sa = sample[3];
    if sa == 0 {
        return;
    }
    if sa == 255 || dst[3] == 0 {
        dst[0] = sample[0];
        dst[1] = sample[1];
        dst[2] = sample[2];
        dst[3] = sa;
        return;
    }
    let sa_f = sa as f32 / 255.0;
    let db_f = dst[3] as f32 / 255.0 * (1.0 - sa_f);
    let oa = sa_f + db_f;
    for c in 0..3 {
        dst[c] = ((sample[c] as f32 * sa_f + dst[c] as f32 * db_f) / oa)
            .round()
            .clamp(0.0, 255.0) as u8;
    }
    dst[3] = (oa * 255.0).round().clamp(0.0, 255.0) as u8;
}

/// Bilinear sample in index space (pixel `i` sits at coordinate `i`), fully
/// transparent outside the source bounds.
fn bilinear_sample(src: &RgbaImage, x: f32, y: f32) -> Rgba<u8> {
    let src_w = src.width() as i32;
    let src_h = src.height() as i32;
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    if x0 < -1 || y0 < -1 || x0 >= src_w || y0 >= src_h {
        return Rgba([0, 0, 0, 0]);
    }
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let fetch = |sx: i32, sy: i32| -> [f32; 4] {
        if sx < 0 || sy < 0 || sx >= src_w || sy >= src_h {
            [0.0; 4]
        } else {
            let p = src.get_pixel(sx as u32, sy as u32);
            [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
        }
    };

    let tl = fetch(x0, y0);
    let tr = fetch(x0 + 1, y0);
    let bl = fetch(x0, y0 + 1);
    let br = fetch(x0 + 1, y0 + 1);

    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = tl[c] + (tr[c] - tl[c]) * fx;
        let bot = bl[c] + (br[c] - bl[c]) * fx;
        out[c] = (top + (bot - top) * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgba(out)
}

fn fill_surface(target: &mut RgbaImage, color: Rgba<u8>) {
    for px in target.pixels_mut() {
        *px = color;
    }
}

/// 2-px crop outline in untransformed surface coordinates. UI affordance
/// only — never part of the persisted composite.
fn stroke_crop_outline(target: &mut RgbaImage, x: f32, y: f32, w: f32, h: f32) {
    let tw = target.width() as i32;
    let th = target.height() as i32;
    let x0 = x.round() as i32;
    let y0 = y.round() as i32;
    let x1 = (x + w).round() as i32;
    let y1 = (y + h).round() as i32;

    let mut put = |px: i32, py: i32| {
        if px >= 0 && py >= 0 && px < tw && py < th {
            target.put_pixel(px as u32, py as u32, CROP_OUTLINE);
        }
    };

    for t in 0..2 {
        for px in x0..=x1 {
            put(px, y0 + t);
            put(px, y1 - t);
        }
        for py in y0..=y1 {
            put(x0 + t, py);
            put(x1 - t, py);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::tools::{CropRegion, ToolState};
    use crate::ops::adjustments::AdjustmentState;
    use crate::session::EditorSession;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x * 3 % 256) as u8, (y * 5 % 256) as u8, 77, 255])
        })
    }

    fn session_with(w: u32, h: u32) -> EditorSession {
        let mut session = EditorSession::new();
        session.load_image(gradient(w, h));
        session
    }

    #[test]
    fn identical_state_renders_bit_identical_output() {
        let mut session = session_with(64, 48);
        session.view.rotate_cw();
        session.view.zoom_out();
        session.view.pan_by(3.0, -7.0);
        session.adjustments = AdjustmentState {
            brightness: 15.0,
            saturation: -40.0,
            tint: Some(Rgba([0, 40, 60, 102])),
            ..AdjustmentState::default()
        };
        session.set_background_color(Rgba([10, 20, 30, 255]));

        let a = render(&session);
        let b = render(&session);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn identity_render_reproduces_foreground_exactly() {
        let session = session_with(40, 30);
        let out = render_composite(&session);
        assert_eq!(out.as_raw(), session.foreground.as_raw());
    }

    #[test]
    fn rotation_180_reverses_pixel_order() {
        let mut session = session_with(20, 10);
        session.view.rotate_cw();
        session.view.rotate_cw();
        let out = render_composite(&session);
        for y in 0..10 {
            for x in 0..20 {
                assert_eq!(
                    out.get_pixel(x, y),
                    session.foreground.get_pixel(19 - x, 9 - y)
                );
            }
        }
    }

    #[test]
    fn flat_background_fills_full_surface_even_when_zoomed_out() {
        let mut session = session_with(30, 30);
        session.set_background_color(Rgba([200, 10, 10, 255]));
        for _ in 0..8 {
            session.view.zoom_out();
        }
        let out = render_composite(&session);
        // With scale 0.2 the foreground shrinks toward the center; the
        // corners must still be background, not transparent.
        assert_eq!(out.get_pixel(0, 0), &Rgba([200, 10, 10, 255]));
        assert_eq!(out.get_pixel(29, 29), &Rgba([200, 10, 10, 255]));
    }

    #[test]
    fn hidden_background_layer_is_not_drawn() {
        let mut session = session_with(16, 16);
        session.set_background_color(Rgba([1, 2, 3, 255]));
        session.show_background = false;
        let out = render_composite(&session);
        assert_eq!(out.as_raw(), session.foreground.as_raw());
    }

    #[test]
    fn tint_never_bleeds_onto_background() {
        let mut session = session_with(16, 16);
        // Punch a transparent hole in the foreground, tint, add background.
        for y in 0..4 {
            for x in 0..4 {
                session.foreground.get_pixel_mut(x, y)[3] = 0;
            }
        }
        session.adjustments.tint = Some(Rgba([255, 0, 0, 200]));
        session.set_background_color(Rgba([0, 99, 0, 255]));
        let out = render_composite(&session);
        assert_eq!(out.get_pixel(1, 1), &Rgba([0, 99, 0, 255]));
    }

    #[test]
    fn same_size_background_image_at_default_placement_is_exact() {
        let mut session = session_with(24, 18);
        for y in 0..4 {
            for x in 0..4 {
                session.foreground.get_pixel_mut(x, y)[3] = 0;
            }
        }
        let bg = RgbaImage::from_pixel(24, 18, Rgba([9, 9, 9, 255]));
        session.set_background_image(bg);
        let out = render_composite(&session);
        assert_eq!(out.get_pixel(2, 2), &Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn crop_outline_appears_in_interactive_render_only() {
        let mut session = session_with(40, 40);
        session.tool_state = ToolState::Cropping {
            anchor: (5.0, 5.0),
            region: Some(CropRegion {
                x: 5.0,
                y: 5.0,
                w: 20.0,
                h: 20.0,
            }),
        };
        let interactive = render(&session);
        let persisted = render_composite(&session);
        assert_eq!(interactive.get_pixel(5, 5), &CROP_OUTLINE);
        assert_ne!(persisted.get_pixel(5, 5), &CROP_OUTLINE);
    }
}
