// ============================================================================
// EDITOR SESSION — the single explicit state object
// ============================================================================
//
// Everything the engine knows lives here: the cut-out foreground raster, the
// retained pre-segmentation original, the replaceable background, the view
// transform, the adjustment sliders, the armed tool and its pointer state,
// the history log, and the segmentation in-flight guard. No ambient globals;
// multiple sessions can coexist, which is also what makes the engine
// testable.
//
// Checkpoints are taken only at discrete action boundaries (stroke end, crop
// commit, preset application, ...) so history memory is bounded regardless
// of edit granularity.
// ============================================================================

use std::fmt;

use image::{Rgba, RgbaImage};

use crate::components::history::{HistoryLog, Snapshot};
use crate::components::presets::Preset;
use crate::components::tools::{Tool, ToolState};
use crate::log_warn;
use crate::ops::adjustments::AdjustmentState;
use crate::ops::brush::{self, BrushSettings};
use crate::ops::crop;
use crate::ops::segmentation::{
    ConfidenceMask, MaskThreshold, SegmentationProvider, apply_confidence_mask,
};
use crate::ops::transform::{self, ViewTransform};

// ============================================================================
// Supporting types
// ============================================================================

/// The replaceable layer behind the cut-out: a flat color, or an image with
/// its own placement parameters (independent of the view transform, though
/// the view transform warps it too at render time).
#[derive(Clone, PartialEq)]
pub enum BackgroundSpec {
    Color(Rgba<u8>),
    Image {
        image: RgbaImage,
        scale: f32,
        offset_x: f32,
        offset_y: f32,
    },
}

/// Non-fatal engine errors. Everything here is absorbed locally or surfaced
/// as an advisory message; nothing panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A segmentation request is outstanding; destructive edits and further
    /// requests are rejected until it resolves.
    RasterBusy,
    /// A segmentation result arrived for a superseded request generation.
    StaleResult,
    /// The provider failed or returned malformed data.
    Provider(String),
    /// The action needs a loaded image.
    NoImage,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::RasterBusy => {
                write!(f, "the image is busy with a background-removal request")
            }
            SessionError::StaleResult => write!(f, "stale segmentation result dropped"),
            SessionError::Provider(msg) => write!(f, "segmentation provider failed: {}", msg),
            SessionError::NoImage => write!(f, "no image is loaded"),
        }
    }
}

/// Proof that a segmentation request was admitted. Must be handed back to
/// `complete_segmentation` / `fail_segmentation`; the embedded generation is
/// how stale results are detected.
#[derive(Debug)]
pub struct SegmentationTicket {
    generation: u64,
}

// ============================================================================
// EditorSession
// ============================================================================

pub struct EditorSession {
    pub width: u32,
    pub height: u32,
    /// The editable cut-out. The only thing brush stamps mutate.
    pub foreground: RgbaImage,
    /// Pre-segmentation source — what brush restore refills from and what
    /// background removal re-derives from. Replaced wholesale by crop.
    pub original: Option<RgbaImage>,
    pub background: Option<BackgroundSpec>,
    pub show_background: bool,
    pub view: ViewTransform,
    pub adjustments: AdjustmentState,
    pub brush: BrushSettings,
    pub mask_threshold: MaskThreshold,
    pub active_tool: Option<Tool>,
    pub tool_state: ToolState,
    pub history: HistoryLog,
    seg_busy: bool,
    seg_generation: u64,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// An empty session — no image loaded yet.
    pub fn new() -> Self {
        Self {
            width: 0,
            height: 0,
            foreground: RgbaImage::new(0, 0),
            original: None,
            background: None,
            show_background: true,
            view: ViewTransform::identity(),
            adjustments: AdjustmentState::default(),
            brush: BrushSettings::default(),
            mask_threshold: MaskThreshold::Strict,
            active_tool: None,
            tool_state: ToolState::Idle,
            history: HistoryLog::new(),
            seg_busy: false,
            seg_generation: 0,
        }
    }

    pub fn has_image(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Surface center — the pivot of the view transform.
    pub fn canvas_center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    // ------------------------------------------------------------------
    // Loading & lifetime
    // ------------------------------------------------------------------

    /// Install a new source image. Resets the view, background and
    /// adjustments, drops any in-flight segmentation, and reseeds history
    /// with the initial checkpoint.
    pub fn load_image(&mut self, image: RgbaImage) {
        if image.width() == 0 || image.height() == 0 {
            return;
        }
        self.width = image.width();
        self.height = image.height();
        self.foreground = image.clone();
        self.original = Some(image);
        self.background = None;
        self.show_background = true;
        self.view = ViewTransform::identity();
        self.adjustments = AdjustmentState::default();
        self.tool_state = ToolState::Idle;
        self.seg_busy = false;
        self.seg_generation += 1;
        let snapshot = self.snapshot();
        self.history.clear_with("init", snapshot);
    }

    /// Drop everything back to the empty state.
    pub fn clear(&mut self) {
        *self = Self {
            seg_generation: self.seg_generation + 1,
            ..Self::new()
        };
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.width,
            height: self.height,
            foreground: self.foreground.clone(),
            original: self.original.clone(),
            background: self.background.clone(),
            show_background: self.show_background,
            view: self.view,
            adjustments: self.adjustments,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.width = snapshot.width;
        self.height = snapshot.height;
        self.foreground = snapshot.foreground;
        self.original = snapshot.original;
        self.background = snapshot.background;
        self.show_background = snapshot.show_background;
        self.view = snapshot.view;
        self.adjustments = snapshot.adjustments;
        self.tool_state = ToolState::Idle;
    }

    /// Take a checkpoint of the current structured state.
    pub fn checkpoint(&mut self, label: &str) {
        if !self.has_image() {
            return;
        }
        let snapshot = self.snapshot();
        self.history.push(label, snapshot);
    }

    /// Step back one checkpoint. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Step forward one checkpoint. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // View actions
    // ------------------------------------------------------------------

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
    }

    pub fn rotate_cw(&mut self) {
        if !self.has_image() {
            return;
        }
        self.view.rotate_cw();
        self.checkpoint("rotate");
    }

    pub fn toggle_flip(&mut self) {
        if !self.has_image() {
            return;
        }
        self.view.toggle_flip();
        self.checkpoint("flip");
    }

    /// Restore the un-segmented original and neutral settings (the "start
    /// over" button, minus reloading the file).
    pub fn reset(&mut self) {
        let Some(original) = self.original.clone() else {
            return;
        };
        self.foreground = original;
        self.background = None;
        self.view = ViewTransform::identity();
        self.adjustments = AdjustmentState::default();
        self.checkpoint("reset");
    }

    /// One-shot clarity/contrast boost (the "enhance" button).
    pub fn enhance(&mut self) {
        if !self.has_image() {
            return;
        }
        self.adjustments.contrast += 10.0;
        self.adjustments.clarity += 20.0;
    }

    // ------------------------------------------------------------------
    // Background layer
    // ------------------------------------------------------------------

    pub fn set_background_color(&mut self, color: Rgba<u8>) {
        self.background = Some(BackgroundSpec::Color(color));
    }

    pub fn set_background_image(&mut self, image: RgbaImage) {
        self.background = Some(BackgroundSpec::Image {
            image,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        });
        self.checkpoint("bg-change");
    }

    pub fn set_background_scale(&mut self, new_scale: f32) {
        if let Some(BackgroundSpec::Image { scale, .. }) = &mut self.background {
            *scale = new_scale.max(0.0);
        }
    }

    pub fn set_background_offset(&mut self, x: f32, y: f32) {
        if let Some(BackgroundSpec::Image {
            offset_x, offset_y, ..
        }) = &mut self.background
        {
            *offset_x = x;
            *offset_y = y;
        }
    }

    pub fn toggle_background(&mut self) {
        self.show_background = !self.show_background;
    }

    // ------------------------------------------------------------------
    // Segmentation (the engine's only suspension point)
    // ------------------------------------------------------------------

    pub fn segmentation_busy(&self) -> bool {
        self.seg_busy
    }

    /// Admit a segmentation request. Rejected while another is outstanding
    /// (single-slot guard) or with no image loaded.
    pub fn begin_segmentation(&mut self) -> Result<SegmentationTicket, SessionError> {
        if !self.has_image() || self.original.is_none() {
            return Err(SessionError::NoImage);
        }
        if self.seg_busy {
            return Err(SessionError::RasterBusy);
        }
        self.seg_busy = true;
        self.seg_generation += 1;
        Ok(SegmentationTicket {
            generation: self.seg_generation,
        })
    }

    /// Apply a finished segmentation: threshold the confidences against the
    /// current operating point and zero the discarded pixels' alpha, always
    /// re-deriving from the retained original. Results from a superseded
    /// generation are dropped — a stale mask must never overwrite a raster
    /// already touched by a newer action.
    pub fn complete_segmentation(
        &mut self,
        ticket: SegmentationTicket,
        mask: ConfidenceMask,
    ) -> Result<(), SessionError> {
        if ticket.generation != self.seg_generation {
            log_warn!(
                "dropping stale segmentation result (generation {} != {})",
                ticket.generation,
                self.seg_generation
            );
            return Err(SessionError::StaleResult);
        }
        self.seg_busy = false;

        let Some(original) = self.original.clone() else {
            return Err(SessionError::NoImage);
        };
        let mut cutout = original;
        apply_confidence_mask(&mut cutout, &mask, self.mask_threshold.cutoff())
            .map_err(SessionError::Provider)?;

        self.width = cutout.width();
        self.height = cutout.height();
        self.foreground = cutout;
        self.checkpoint("bg-removed");
        Ok(())
    }

    /// Resolve an outstanding request as failed: the prior foreground stays
    /// untouched and the raster becomes editable again.
    pub fn fail_segmentation(&mut self, ticket: SegmentationTicket) {
        if ticket.generation == self.seg_generation {
            self.seg_busy = false;
        }
    }

    /// Synchronous convenience wrapper: begin, run the provider, complete.
    /// Used by the headless CLI where the provider call cannot suspend.
    pub fn remove_background<P: SegmentationProvider>(
        &mut self,
        provider: &mut P,
    ) -> Result<(), SessionError> {
        let ticket = self.begin_segmentation()?;
        let source = match &self.original {
            Some(original) => original.clone(),
            None => {
                self.fail_segmentation(ticket);
                return Err(SessionError::NoImage);
            }
        };
        match provider.segment(&source) {
            Ok(mask) => self.complete_segmentation(ticket, mask),
            Err(msg) => {
                self.fail_segmentation(ticket);
                Err(SessionError::Provider(msg))
            }
        }
    }

    /// Flip between the strict (0.6) and loose (0.35) operating points.
    pub fn toggle_mask_strictness(&mut self) {
        self.mask_threshold = self.mask_threshold.toggled();
    }

    /// The magic-eraser action: flip the operating point and re-run
    /// background removal at the new cutoff, with its own checkpoint.
    pub fn magic_erase<P: SegmentationProvider>(
        &mut self,
        provider: &mut P,
    ) -> Result<(), SessionError> {
        self.toggle_mask_strictness();
        self.remove_background(provider)?;
        self.checkpoint("magic-eraser");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Presets
    // ------------------------------------------------------------------

    /// Atomically overwrite the whole adjustment state with the preset's
    /// assignment and checkpoint it.
    pub fn apply_preset(&mut self, preset: Preset) {
        if !self.has_image() {
            return;
        }
        self.adjustments = preset.adjustments();
        self.checkpoint(&format!("preset-{}", preset.label()));
    }

    // ------------------------------------------------------------------
    // Crop
    // ------------------------------------------------------------------

    /// Bake the surface-space rectangle into a new base image and checkpoint.
    /// Undersized or out-of-surface rectangles are ignored; so is a crop
    /// while a segmentation request is outstanding.
    pub fn crop(&mut self, x: f32, y: f32, w: f32, h: f32) -> bool {
        if self.seg_busy {
            log_warn!("crop rejected: segmentation in flight");
            return false;
        }
        if crop::bake(self, x, y, w, h) {
            self.checkpoint("crop");
            true
        } else {
            false
        }
    }

    // ------------------------------------------------------------------
    // Tools & pointer input
    // ------------------------------------------------------------------

    /// Arm a tool. Selecting the armed tool again disarms it; selecting a
    /// different one deactivates the previous (mutual exclusion). Any
    /// in-progress interaction is abandoned.
    pub fn select_tool(&mut self, tool: Tool) {
        self.active_tool = if self.active_tool == Some(tool) {
            None
        } else {
            Some(tool)
        };
        self.tool_state = ToolState::Idle;
    }

    /// Pointer pressed at surface coordinates.
    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if !self.has_image() {
            return;
        }
        let Some(tool) = self.active_tool else {
            return;
        };
        if tool == Tool::Brush && self.seg_busy {
            log_warn!("brush rejected: segmentation in flight");
            return;
        }
        self.tool_state = ToolState::begin(tool, (x, y));
        if tool == Tool::Brush {
            let stamped = self.stamp_at_surface(x, y);
            self.tool_state = ToolState::Brushing {
                stamps: stamped as u32,
            };
        }
    }

    /// Pointer moved to surface coordinates.
    pub fn pointer_move(&mut self, x: f32, y: f32) {
        match self.tool_state {
            ToolState::Idle => {}
            ToolState::Cropping { anchor, .. } => {
                self.tool_state = ToolState::Cropping {
                    anchor,
                    region: Some(crate::components::tools::CropRegion::from_corners(
                        anchor,
                        (x, y),
                    )),
                };
            }
            ToolState::Brushing { stamps } => {
                if self.seg_busy {
                    return;
                }
                let stamped = self.stamp_at_surface(x, y);
                self.tool_state = ToolState::Brushing {
                    stamps: stamps + stamped as u32,
                };
            }
            ToolState::Panning { last } => {
                self.view.pan_by(x - last.0, y - last.1);
                self.tool_state = ToolState::Panning { last: (x, y) };
            }
            ToolState::Moving { last } => {
                self.view.pan_by(x - last.0, y - last.1);
                self.tool_state = ToolState::Moving { last: (x, y) };
            }
        }
    }

    /// Pointer released: finalize the in-progress interaction.
    pub fn pointer_up(&mut self) {
        let state = std::mem::take(&mut self.tool_state);
        match state {
            ToolState::Cropping {
                region: Some(region),
                ..
            } if region.exceeds_minimum() => {
                self.crop(region.x, region.y, region.w, region.h);
            }
            ToolState::Brushing { stamps } if stamps > 0 => {
                self.checkpoint("brush");
            }
            _ => {}
        }
    }

    /// Pointer canceled: abandon the interaction. The crop region is
    /// discarded with no partial bake; already-applied brush stamps stay
    /// (only an undo removes them) but no checkpoint is taken.
    pub fn pointer_cancel(&mut self) {
        self.tool_state = ToolState::Idle;
    }

    /// Map a surface point into the foreground raster and stamp the brush.
    fn stamp_at_surface(&mut self, x: f32, y: f32) -> bool {
        let p = transform::inverse((x, y), &self.view, self.canvas_center());
        brush::stamp(&mut self.foreground, self.original.as_ref(), &self.brush, p)
    }

    pub fn grow_brush(&mut self) {
        self.brush.grow();
    }

    pub fn shrink_brush(&mut self) {
        self.brush.shrink();
    }

    // ------------------------------------------------------------------
    // Render & export
    // ------------------------------------------------------------------

    /// The interactive view (crop affordance included).
    pub fn render(&self) -> RgbaImage {
        crate::compositor::render(self)
    }

    /// The persisted composite at native resolution — what export encodes.
    pub fn render_composite(&self) -> RgbaImage {
        crate::compositor::render_composite(self)
    }

    /// Encode the current composite as a lossless PNG byte stream.
    pub fn export_png(&self) -> Result<Vec<u8>, String> {
        if !self.has_image() {
            return Err(SessionError::NoImage.to_string());
        }
        crate::io::encode_png(&self.render_composite()).map_err(|e| e.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::segmentation::ConfidenceMask;

    fn gradient(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    fn loaded(w: u32, h: u32) -> EditorSession {
        let mut session = EditorSession::new();
        session.load_image(gradient(w, h));
        session
    }

    struct FixedMaskProvider {
        keep_left_half: bool,
    }

    impl SegmentationProvider for FixedMaskProvider {
        fn segment(&mut self, image: &RgbaImage) -> Result<ConfidenceMask, String> {
            let (w, h) = image.dimensions();
            let values = (0..w * h)
                .map(|i| {
                    let x = i % w;
                    if self.keep_left_half == (x < w / 2) { 0.9 } else { 0.1 }
                })
                .collect();
            ConfidenceMask::new(w, h, values)
        }
    }

    struct FailingProvider;

    impl SegmentationProvider for FailingProvider {
        fn segment(&mut self, _image: &RgbaImage) -> Result<ConfidenceMask, String> {
            Err("model unavailable".to_string())
        }
    }

    #[test]
    fn load_seeds_history_with_init() {
        let session = loaded(20, 10);
        assert_eq!(session.history.len(), 1);
        assert_eq!(session.history.current_label(), Some("init"));
        assert!(!session.history.can_undo());
    }

    #[test]
    fn preset_bw_scenario() {
        let mut session = loaded(200, 100);
        session.apply_preset(Preset::Bw);

        assert_eq!(session.adjustments.brightness, 0.0);
        assert_eq!(session.adjustments.contrast, 20.0);
        assert_eq!(session.adjustments.saturation, -100.0);
        assert_eq!(session.adjustments.tint, None);
        assert_eq!(session.history.len(), 2);
        assert_eq!(session.history.current_label(), Some("preset-bw"));
    }

    #[test]
    fn rotate_flip_crop_scenario() {
        let mut session = loaded(200, 100);
        session.rotate_cw();
        session.toggle_flip();
        assert!(session.crop(20.0, 20.0, 50.0, 50.0));

        assert_eq!(session.foreground.dimensions(), (50, 50));
        assert_eq!((session.width, session.height), (50, 50));
        assert_eq!(session.view, ViewTransform::identity());
    }

    #[test]
    fn undo_restores_structured_state_not_just_pixels() {
        let mut session = loaded(40, 40);
        session.set_background_color(Rgba([9, 9, 9, 255]));
        session.rotate_cw();
        session.apply_preset(Preset::Warm);

        assert!(session.undo());
        // Back at the "rotate" checkpoint: rotation kept, preset gone.
        assert_eq!(session.view.rotation_deg, 90);
        assert_eq!(session.adjustments, AdjustmentState::default());
        assert!(matches!(
            session.background,
            Some(BackgroundSpec::Color(_))
        ));

        assert!(session.undo());
        assert_eq!(session.view.rotation_deg, 0);
        assert!(!session.undo(), "underflow is a no-op");
        assert!(session.redo());
        assert_eq!(session.view.rotation_deg, 90);
    }

    #[test]
    fn brush_stroke_maps_through_view_transform() {
        let mut session = loaded(60, 60);
        session.view.rotate_cw();
        session.view.toggle_flip();
        session.select_tool(Tool::Brush);
        session.brush.size = 10.0;

        // Stamp at the surface center: under any center-pivot transform that
        // maps back to the raster center.
        session.pointer_down(30.0, 30.0);
        session.pointer_up();

        assert_eq!(session.foreground.get_pixel(30, 30)[3], 0);
        assert_eq!(session.history.current_label(), Some("brush"));
    }

    #[test]
    fn pan_accumulates_deltas_into_view_offsets() {
        let mut session = loaded(50, 50);
        session.select_tool(Tool::Pan);
        session.pointer_down(10.0, 10.0);
        session.pointer_move(14.0, 7.0);
        session.pointer_move(20.0, 7.0);
        session.pointer_up();
        assert_eq!(session.view.offset_x, 10.0);
        assert_eq!(session.view.offset_y, -3.0);

        // Move shares the same translation behavior.
        session.select_tool(Tool::Move);
        session.pointer_down(0.0, 0.0);
        session.pointer_move(-4.0, 2.0);
        session.pointer_up();
        assert_eq!(session.view.offset_x, 6.0);
        assert_eq!(session.view.offset_y, -1.0);
    }

    #[test]
    fn crop_drag_commits_only_past_minimum() {
        let mut session = loaded(80, 80);
        session.select_tool(Tool::Crop);

        session.pointer_down(10.0, 10.0);
        session.pointer_move(14.0, 14.0);
        session.pointer_up();
        assert_eq!(session.width, 80, "tiny drag must not bake");

        session.pointer_down(10.0, 10.0);
        session.pointer_move(40.0, 35.0);
        session.pointer_up();
        assert_eq!((session.width, session.height), (30, 25));
        assert_eq!(session.history.current_label(), Some("crop"));
    }

    #[test]
    fn pointer_cancel_discards_crop_but_keeps_stamps() {
        let mut session = loaded(60, 60);
        session.select_tool(Tool::Crop);
        session.pointer_down(5.0, 5.0);
        session.pointer_move(50.0, 50.0);
        session.pointer_cancel();
        assert_eq!(session.width, 60, "cancel must not bake a partial crop");
        assert!(session.tool_state.is_idle());

        session.select_tool(Tool::Brush);
        session.brush.size = 10.0;
        let history_before = session.history.len();
        session.pointer_down(30.0, 30.0);
        session.pointer_cancel();
        assert_eq!(
            session.foreground.get_pixel(30, 30)[3],
            0,
            "cancel keeps already-applied stamps"
        );
        assert_eq!(session.history.len(), history_before, "but takes no checkpoint");
    }

    #[test]
    fn selecting_a_tool_deactivates_the_previous_one() {
        let mut session = loaded(30, 30);
        session.select_tool(Tool::Brush);
        assert_eq!(session.active_tool, Some(Tool::Brush));
        session.select_tool(Tool::Crop);
        assert_eq!(session.active_tool, Some(Tool::Crop));
        session.select_tool(Tool::Crop);
        assert_eq!(session.active_tool, None, "re-selecting disarms");
    }

    #[test]
    fn segmentation_guard_rejects_concurrent_requests_and_edits() {
        let mut session = loaded(40, 40);
        let ticket = session.begin_segmentation().unwrap();
        assert!(session.segmentation_busy());

        assert_eq!(
            session.begin_segmentation().unwrap_err(),
            SessionError::RasterBusy
        );
        assert!(!session.crop(0.0, 0.0, 20.0, 20.0), "crop rejected while busy");

        session.select_tool(Tool::Brush);
        session.pointer_down(20.0, 20.0);
        assert_eq!(
            session.foreground.get_pixel(20, 20)[3],
            255,
            "brush rejected while busy"
        );

        let mask = ConfidenceMask::new(40, 40, vec![0.9; 1600]).unwrap();
        session.complete_segmentation(ticket, mask).unwrap();
        assert!(!session.segmentation_busy());
    }

    #[test]
    fn stale_segmentation_result_is_dropped() {
        let mut session = loaded(10, 10);
        let stale = session.begin_segmentation().unwrap();
        session.fail_segmentation(stale);

        // Hold a stale ticket from before a reload bumps the generation.
        let old = session.begin_segmentation().unwrap();
        session.load_image(gradient(10, 10));

        let before = session.foreground.clone();
        let mask = ConfidenceMask::new(10, 10, vec![0.0; 100]).unwrap();
        assert_eq!(
            session.complete_segmentation(old, mask).unwrap_err(),
            SessionError::StaleResult
        );
        assert_eq!(session.foreground.as_raw(), before.as_raw());
    }

    #[test]
    fn remove_background_applies_threshold_and_checkpoints() {
        let mut session = loaded(20, 10);
        let mut provider = FixedMaskProvider {
            keep_left_half: true,
        };
        session.remove_background(&mut provider).unwrap();

        assert_eq!(session.foreground.get_pixel(2, 5)[3], 255);
        assert_eq!(session.foreground.get_pixel(15, 5)[3], 0);
        assert_eq!(session.history.current_label(), Some("bg-removed"));
        assert!(!session.segmentation_busy());
    }

    #[test]
    fn provider_failure_leaves_foreground_untouched() {
        let mut session = loaded(12, 12);
        let before = session.foreground.clone();
        let err = session.remove_background(&mut FailingProvider).unwrap_err();
        assert!(matches!(err, SessionError::Provider(_)));
        assert_eq!(session.foreground.as_raw(), before.as_raw());
        assert!(!session.segmentation_busy(), "failed request frees the slot");
    }

    #[test]
    fn loose_threshold_keeps_uncertain_pixels() {
        let mut session = loaded(10, 10);
        session.toggle_mask_strictness();
        assert_eq!(session.mask_threshold, MaskThreshold::Loose);

        struct HalfConfident;
        impl SegmentationProvider for HalfConfident {
            fn segment(&mut self, image: &RgbaImage) -> Result<ConfidenceMask, String> {
                let (w, h) = image.dimensions();
                ConfidenceMask::new(w, h, vec![0.5; (w * h) as usize])
            }
        }
        session.remove_background(&mut HalfConfident).unwrap();
        assert_eq!(session.foreground.get_pixel(5, 5)[3], 255);
    }

    #[test]
    fn magic_erase_toggles_operating_point_and_checkpoints() {
        let mut session = loaded(20, 10);
        let mut provider = FixedMaskProvider {
            keep_left_half: true,
        };
        session.magic_erase(&mut provider).unwrap();
        assert_eq!(session.mask_threshold, MaskThreshold::Loose);
        assert_eq!(session.history.current_label(), Some("magic-eraser"));
        assert_eq!(session.foreground.get_pixel(15, 5)[3], 0);
    }

    #[test]
    fn reset_restores_original_and_checkpoints() {
        let mut session = loaded(30, 30);
        session.select_tool(Tool::Brush);
        session.pointer_down(15.0, 15.0);
        session.pointer_up();
        session.rotate_cw();
        session.set_background_color(Rgba([1, 1, 1, 255]));

        session.reset();
        assert_eq!(session.foreground.get_pixel(15, 15)[3], 255);
        assert_eq!(session.view, ViewTransform::identity());
        assert!(session.background.is_none());
        assert_eq!(session.history.current_label(), Some("reset"));
    }

    #[test]
    fn export_png_round_trips_through_the_codec() {
        let mut session = loaded(8, 8);
        session.set_background_color(Rgba([4, 5, 6, 255]));
        let bytes = session.export_png().unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded.as_raw(), session.render_composite().as_raw());
    }

    #[test]
    fn actions_without_an_image_are_no_ops() {
        let mut session = EditorSession::new();
        session.rotate_cw();
        session.apply_preset(Preset::Bw);
        session.pointer_down(5.0, 5.0);
        assert!(session.history.is_empty());
        assert!(session.export_png().is_err());
        assert!(!session.undo());
        assert!(!session.redo());
    }
}
