//! CutoutFE — a cut-out compositing engine.
//!
//! The engine composites an alpha-carrying foreground (a segmented subject)
//! over a replaceable background, applies nondestructive tonal adjustments,
//! and supports crop/rotate/flip/brush edits with snapshot-based undo/redo.
//! All state lives in an explicit [`session::EditorSession`]; rendering is a
//! pure function of it. The segmentation model is an external collaborator
//! behind [`ops::segmentation::SegmentationProvider`].

pub mod cli;
pub mod components;
pub mod compositor;
pub mod io;
pub mod logger;
pub mod ops;
pub mod session;

pub use components::history::{HistoryLog, MAX_HISTORY, Snapshot};
pub use components::presets::Preset;
pub use components::tools::{CropRegion, Tool, ToolState};
pub use ops::adjustments::{AdjustmentState, ToneOp};
pub use ops::brush::{BrushMode, BrushSettings};
pub use ops::segmentation::{ConfidenceMask, MaskThreshold, SegmentationProvider};
pub use ops::transform::ViewTransform;
pub use session::{BackgroundSpec, EditorSession, SessionError};
