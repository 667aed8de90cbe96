// ============================================================================
// HISTORY LOG — bounded snapshot undo/redo over structured editor state
// ============================================================================
//
// Each checkpoint stores the *structured* state — foreground raster, retained
// original, background spec, view transform, adjustments — not a flattened
// render, so undo restores editability rather than merely appearance. The log
// is a bounded deque with a cursor: pushing after an undo prunes the redo
// branch; pushing past capacity evicts the oldest entry.
// ============================================================================

use std::collections::VecDeque;

use image::RgbaImage;

use crate::ops::adjustments::AdjustmentState;
use crate::ops::transform::ViewTransform;
use crate::session::BackgroundSpec;

/// Upper bound on retained checkpoints. Snapshots hold full rasters, so this
/// also bounds history memory at roughly `MAX_HISTORY` composites.
pub const MAX_HISTORY: usize = 30;

/// The structured state captured at one checkpoint.
#[derive(Clone)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub foreground: RgbaImage,
    /// Pre-segmentation source, kept so the restore brush still has a
    /// meaningful source after undoing across a crop.
    pub original: Option<RgbaImage>,
    pub background: Option<BackgroundSpec>,
    pub show_background: bool,
    pub view: ViewTransform,
    pub adjustments: AdjustmentState,
}

pub struct HistoryEntry {
    pub label: String,
    pub snapshot: Snapshot,
}

/// Bounded ordered checkpoint sequence plus a cursor into it.
///
/// Invariant: `0 <= index < len` whenever the log is non-empty.
#[derive(Default)]
pub struct HistoryLog {
    entries: VecDeque<HistoryEntry>,
    index: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cursor position of the current state. Meaningless while empty.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Label of the entry the cursor points at.
    pub fn current_label(&self) -> Option<&str> {
        self.entries.get(self.index).map(|e| e.label.as_str())
    }

    /// Labels oldest-first, for display.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.label.as_str()).collect()
    }

    /// Append a checkpoint at the cursor. Entries past the cursor (the redo
    /// branch) are discarded first; if the log then exceeds capacity the
    /// oldest entry is evicted and the cursor shifts with it.
    pub fn push(&mut self, label: &str, snapshot: Snapshot) {
        if !self.entries.is_empty() && self.index + 1 < self.entries.len() {
            self.entries.truncate(self.index + 1);
        }
        self.entries.push_back(HistoryEntry {
            label: label.to_string(),
            snapshot,
        });
        if self.entries.len() > MAX_HISTORY {
            self.entries.pop_front();
        }
        self.index = self.entries.len() - 1;
    }

    pub fn can_undo(&self) -> bool {
        self.index > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.entries.is_empty() && self.index + 1 < self.entries.len()
    }

    /// Step the cursor back and return a copy of that snapshot.
    /// Underflow (already at the oldest entry) is a quiet no-op.
    pub fn undo(&mut self) -> Option<Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.index -= 1;
        Some(self.entries[self.index].snapshot.clone())
    }

    /// Step the cursor forward and return a copy of that snapshot.
    /// Overflow (already at the newest entry) is a quiet no-op.
    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.index += 1;
        Some(self.entries[self.index].snapshot.clone())
    }

    /// Drop everything and reseed with an initial checkpoint (new image load).
    pub fn clear_with(&mut self, label: &str, snapshot: Snapshot) {
        self.entries.clear();
        self.index = 0;
        self.entries.push_back(HistoryEntry {
            label: label.to_string(),
            snapshot,
        });
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = 0;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(tag: u8) -> Snapshot {
        // A tiny raster whose first byte encodes the checkpoint identity.
        Snapshot {
            width: 1,
            height: 1,
            foreground: RgbaImage::from_pixel(1, 1, image::Rgba([tag, 0, 0, 255])),
            original: None,
            background: None,
            show_background: true,
            view: ViewTransform::default(),
            adjustments: AdjustmentState::default(),
        }
    }

    fn tag_of(s: &Snapshot) -> u8 {
        s.foreground.get_pixel(0, 0)[0]
    }

    #[test]
    fn undo_redo_flow() {
        let mut log = HistoryLog::new();
        log.clear_with("init", snap(0));
        log.push("a", snap(1));
        log.push("b", snap(2));

        assert_eq!(log.undo().map(|s| tag_of(&s)), Some(1));
        assert_eq!(log.undo().map(|s| tag_of(&s)), Some(0));
        assert!(log.undo().is_none(), "underflow must be a no-op");

        assert_eq!(log.redo().map(|s| tag_of(&s)), Some(1));
        assert_eq!(log.redo().map(|s| tag_of(&s)), Some(2));
        assert!(log.redo().is_none(), "overflow must be a no-op");
    }

    #[test]
    fn capacity_evicts_oldest_first() {
        let mut log = HistoryLog::new();
        log.clear_with("init", snap(0));
        for i in 1..=(MAX_HISTORY as u8 + 5) {
            log.push("edit", snap(i));
        }
        assert_eq!(log.len(), MAX_HISTORY);
        assert_eq!(log.index(), MAX_HISTORY - 1);

        // Walk all the way back: the oldest surviving entry is the 6th push.
        let mut oldest = None;
        while log.can_undo() {
            oldest = log.undo();
            assert!(log.index() < log.len());
        }
        assert_eq!(oldest.map(|s| tag_of(&s)), Some(6));
    }

    #[test]
    fn push_after_undo_prunes_redo_branch() {
        let mut log = HistoryLog::new();
        log.clear_with("init", snap(0));
        log.push("a", snap(1));
        log.push("b", snap(2));

        log.undo();
        log.undo();
        log.push("c", snap(9));

        assert!(!log.can_redo(), "pruned future must be unreachable");
        assert_eq!(log.len(), 2);
        assert_eq!(log.current_label(), Some("c"));
    }

    #[test]
    fn index_stays_in_bounds_through_mixed_use() {
        let mut log = HistoryLog::new();
        log.clear_with("init", snap(0));
        for i in 0..10u8 {
            log.push("x", snap(i));
            if i % 3 == 0 {
                log.undo();
            }
        }
        assert!(log.index() < log.len());
    }

    #[test]
    fn clear_with_reseeds_single_entry() {
        let mut log = HistoryLog::new();
        log.clear_with("init", snap(0));
        log.push("a", snap(1));
        log.clear_with("init", snap(7));
        assert_eq!(log.len(), 1);
        assert_eq!(log.index(), 0);
        assert!(!log.can_undo());
        assert!(!log.can_redo());
        assert_eq!(log.labels(), vec!["init"]);
    }
}
