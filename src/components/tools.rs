// ============================================================================
// TOOL STATE MACHINE — tagged states, exhaustive transitions
// ============================================================================
//
// Exactly one tool can be armed at a time; a pointer-down enters the state
// matching the armed tool and captures its anchor. The transition *effects*
// (stamping, panning, committing a crop) are driven by the session's
// pointer handlers — this module owns the types and the pure transitions.
// ============================================================================

/// Minimum crop edge in surface pixels. Drags at or below this are treated
/// as accidental and ignored rather than reported as errors.
pub const MIN_CROP_EDGE: f32 = 5.0;

/// The user-armable tools. `Move` shares `Pan`'s translation behavior but is
/// presented as a separate tool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tool {
    Crop,
    Brush,
    Pan,
    Move,
}

/// An in-progress crop rectangle in surface coordinates. Ephemeral: lives
/// only while a crop drag is active and is consumed by the bake.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRegion {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl CropRegion {
    /// Normalized rectangle spanning two drag corners (handles drags in any
    /// direction).
    pub fn from_corners(a: (f32, f32), b: (f32, f32)) -> Self {
        Self {
            x: a.0.min(b.0),
            y: a.1.min(b.1),
            w: (b.0 - a.0).abs(),
            h: (b.1 - a.1).abs(),
        }
    }

    /// True when the drag is big enough to commit.
    pub fn exceeds_minimum(&self) -> bool {
        self.w > MIN_CROP_EDGE && self.h > MIN_CROP_EDGE
    }
}

/// Pointer-interaction state. `Brushing` counts stamps so the stroke's
/// checkpoint is only emitted when something was actually painted.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum ToolState {
    #[default]
    Idle,
    Cropping {
        anchor: (f32, f32),
        region: Option<CropRegion>,
    },
    Brushing {
        stamps: u32,
    },
    Panning {
        last: (f32, f32),
    },
    Moving {
        last: (f32, f32),
    },
}

impl ToolState {
    /// State entered by a pointer-down with `tool` armed, anchored at `p`.
    pub fn begin(tool: Tool, p: (f32, f32)) -> Self {
        match tool {
            Tool::Crop => ToolState::Cropping {
                anchor: p,
                region: None,
            },
            Tool::Brush => ToolState::Brushing { stamps: 0 },
            Tool::Pan => ToolState::Panning { last: p },
            Tool::Move => ToolState::Moving { last: p },
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, ToolState::Idle)
    }

    /// The live crop rectangle, if a crop drag has one.
    pub fn active_crop(&self) -> Option<CropRegion> {
        match self {
            ToolState::Cropping { region, .. } => *region,
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
