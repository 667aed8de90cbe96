// ============================================================================
// PRESETS — named, total adjustment assignments
// ============================================================================
//
// A preset is data, not behavior: applying one overwrites the whole
// adjustment state (secondary sliders included, reset to zero), never merges
// with prior values. Tint colors are the looks' signature overlays.
// ============================================================================

use image::Rgba;

use crate::ops::adjustments::AdjustmentState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Preset {
    Moody,
    Cinematic,
    Vintage,
    Warm,
    Cool,
    Bw,
}

impl Preset {
    pub fn all() -> &'static [Preset] {
        &[
            Preset::Moody,
            Preset::Cinematic,
            Preset::Vintage,
            Preset::Warm,
            Preset::Cool,
            Preset::Bw,
        ]
    }

    /// Stable name, used in history labels (`preset-<label>`).
    pub fn label(&self) -> &'static str {
        match self {
            Preset::Moody => "moody",
            Preset::Cinematic => "cinematic",
            Preset::Vintage => "vintage",
            Preset::Warm => "warm",
            Preset::Cool => "cool",
            Preset::Bw => "bw",
        }
    }

    pub fn from_label(label: &str) -> Option<Preset> {
        Preset::all().iter().copied().find(|p| p.label() == label)
    }

    /// The full adjustment assignment for this look.
    pub fn adjustments(&self) -> AdjustmentState {
        let neutral = AdjustmentState::default();
        match self {
            // Low brightness, high contrast, muted, deep teal overlay
            Preset::Moody => AdjustmentState {
                brightness: -10.0,
                contrast: 20.0,
                saturation: -20.0,
                tint: Some(Rgba([0, 40, 60, 102])),
                ..neutral
            },
            // High contrast, slightly muted, steel blue overlay
            Preset::Cinematic => AdjustmentState {
                contrast: 15.0,
                saturation: -10.0,
                tint: Some(Rgba([0, 100, 150, 64])),
                ..neutral
            },
            // Soft contrast, faded, warm yellow overlay
            Preset::Vintage => AdjustmentState {
                brightness: 5.0,
                contrast: -10.0,
                saturation: -20.0,
                tint: Some(Rgba([220, 180, 50, 77])),
                ..neutral
            },
            // Bright, punchy, orange overlay
            Preset::Warm => AdjustmentState {
                brightness: 5.0,
                contrast: 5.0,
                saturation: 10.0,
                tint: Some(Rgba([255, 140, 0, 51])),
                ..neutral
            },
            // Crisp, muted, sky blue overlay
            Preset::Cool => AdjustmentState {
                contrast: 10.0,
                saturation: -10.0,
                tint: Some(Rgba([0, 180, 255, 51])),
                ..neutral
            },
            // Full desaturation, boosted contrast, no overlay
            Preset::Bw => AdjustmentState {
                contrast: 20.0,
                saturation: -100.0,
                tint: None,
                ..neutral
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bw_is_the_documented_assignment() {
        let adj = Preset::Bw.adjustments();
        assert_eq!(adj.brightness, 0.0);
        assert_eq!(adj.contrast, 20.0);
        assert_eq!(adj.saturation, -100.0);
        assert_eq!(adj.tint, None);
    }

    #[test]
    fn presets_are_total_assignments() {
        // Secondary sliders always come back zeroed — a preset never merges.
        for preset in Preset::all() {
            let adj = preset.adjustments();
            assert_eq!(adj.exposure, 0.0);
            assert_eq!(adj.shadows, 0.0);
            assert_eq!(adj.highlights, 0.0);
            assert_eq!(adj.temperature, 0.0);
            assert_eq!(adj.tint_shift, 0.0);
            assert_eq!(adj.vibrance, 0.0);
            assert_eq!(adj.clarity, 0.0);
        }
    }

    #[test]
    fn labels_round_trip() {
        for preset in Preset::all() {
            assert_eq!(Preset::from_label(preset.label()), Some(*preset));
        }
        assert_eq!(Preset::from_label("nope"), None);
    }

    #[test]
    fn application_is_order_independent() {
        // Whatever was applied before, the result is the preset's table entry.
        let a = Preset::Moody.adjustments();
        let after_detour = {
            let _ = Preset::Warm.adjustments();
            Preset::Moody.adjustments()
        };
        assert_eq!(a, after_detour);
    }
}
