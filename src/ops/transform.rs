// ============================================================================
// VIEW TRANSFORM — scale / quarter-turn rotation / flip / pan, plus the
// surface↔raster point mapping used by every pointer-driven edit
// ============================================================================

/// Smallest zoom the UI can request. Keeping this strictly positive means the
/// inverse mapping never divides by zero.
pub const MIN_SCALE: f32 = 0.2;
/// Largest zoom the UI can request.
pub const MAX_SCALE: f32 = 4.0;
/// Increment applied by one zoom-in / zoom-out action.
pub const ZOOM_STEP: f32 = 0.1;

/// The composed scale/rotate/flip/pan applied at render time without
/// altering underlying pixel data.
///
/// Rotation is restricted to quarter turns (0/90/180/270 degrees); flips
/// mirror horizontally by negating the X scale factor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
    pub rotation_deg: u16,
    pub flipped: bool,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            rotation_deg: 0,
            flipped: false,
        }
    }
}

impl ViewTransform {
    /// The identity transform (what a freshly loaded or just-cropped image has).
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn is_identity(&self) -> bool {
        self.scale == 1.0
            && self.offset_x == 0.0
            && self.offset_y == 0.0
            && self.rotation_deg == 0
            && !self.flipped
    }

    /// Signed X scale factor — a flip mirrors by negating it.
    pub fn signed_scale_x(&self) -> f32 {
        if self.flipped { -self.scale } else { self.scale }
    }

    pub fn zoom_in(&mut self) {
        self.scale = (self.scale + ZOOM_STEP).min(MAX_SCALE);
    }

    pub fn zoom_out(&mut self) {
        self.scale = (self.scale - ZOOM_STEP).max(MIN_SCALE);
    }

    /// Advance the rotation one quarter turn clockwise.
    pub fn rotate_cw(&mut self) {
        self.rotation_deg = (self.rotation_deg + 90) % 360;
    }

    pub fn toggle_flip(&mut self) {
        self.flipped = !self.flipped;
    }

    /// Accumulate a pan/move delta in surface pixels.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset_x += dx;
        self.offset_y += dy;
    }
}

/// Exact (sin, cos) for quarter-turn angles. `sin`/`cos` of `FRAC_PI_2` are
/// off by a few ulps, which would smear axis-aligned renders across pixel
/// boundaries; the table keeps 90/180/270 renders crisp.
fn quarter_sin_cos(rotation_deg: u16) -> (f32, f32) {
    match rotation_deg % 360 {
        90 => (1.0, 0.0),
        180 => (0.0, -1.0),
        270 => (-1.0, 0.0),
        _ => (0.0, 1.0),
    }
}

/// Map a point from raster (image-local) space to surface space.
///
/// Composition, innermost first: un-center, rotate by `rotation_deg`, scale
/// by `(±scale, scale)`, translate to `center + (offset_x, offset_y)`. This
/// is the same operation the compositor applies to the foreground layer, so
/// `forward` answers "where does raster pixel p land on screen".
pub fn forward(p: (f32, f32), view: &ViewTransform, center: (f32, f32)) -> (f32, f32) {
    let (sin, cos) = quarter_sin_cos(view.rotation_deg);
    let x = p.0 - center.0;
    let y = p.1 - center.1;
    let rx = x * cos - y * sin;
    let ry = x * sin + y * cos;
    (
        rx * view.signed_scale_x() + center.0 + view.offset_x,
        ry * view.scale + center.1 + view.offset_y,
    )
}

/// Map a point from surface space back to raster space — the exact algebraic
/// inverse of [`forward`]: un-translate, divide by the signed scale factors
/// (a flip is its own inverse), rotate by `-rotation_deg`, re-center.
///
/// This is what lets pointer coordinates collected on screen be converted
/// into foreground-local coordinates for brush editing, independent of the
/// current pan/zoom/rotate/flip.
pub fn inverse(p: (f32, f32), view: &ViewTransform, center: (f32, f32)) -> (f32, f32) {
    let (sin, cos) = quarter_sin_cos(view.rotation_deg);
    let x = (p.0 - center.0 - view.offset_x) / view.signed_scale_x();
    let y = (p.1 - center.1 - view.offset_y) / view.scale;
    (
        x * cos + y * sin + center.0,
        -x * sin + y * cos + center.1,
    )
}

// ============================================================================
// Tests
// ============================================================================
