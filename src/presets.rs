//! Club tempo presets
//!
//! Each club carries an allowed BPM range, the optimal sub-range a coach
//! would aim for, and the default the trainer opens with. The engine itself
//! only requires `bpm > 0`; these ranges are for the caller.

use serde::Serialize;

/// Inclusive BPM range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TempoRange {
    pub min: u32,
    pub max: u32,
}

impl TempoRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, bpm: u32) -> bool {
        (self.min..=self.max).contains(&bpm)
    }

    pub fn clamp(&self, bpm: u32) -> u32 {
        bpm.clamp(self.min, self.max)
    }
}

/// Tempo settings for one club.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClubPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub range: TempoRange,
    pub optimal: TempoRange,
    pub default_bpm: u32,
}

impl ClubPreset {
    pub fn is_optimal(&self, bpm: u32) -> bool {
        self.optimal.contains(bpm)
    }

    /// Bring `bpm` into this club's allowed range.
    pub fn clamp(&self, bpm: u32) -> u32 {
        self.range.clamp(bpm)
    }
}

pub const CLUB_PRESETS: [ClubPreset; 4] = [
    ClubPreset {
        id: "driver",
        name: "Driver",
        range: TempoRange::new(100, 126),
        optimal: TempoRange::new(108, 118),
        default_bpm: 112,
    },
    ClubPreset {
        id: "long_iron",
        name: "Long iron",
        range: TempoRange::new(105, 126),
        optimal: TempoRange::new(110, 120),
        default_bpm: 115,
    },
    ClubPreset {
        id: "mid_iron",
        name: "Mid iron",
        range: TempoRange::new(109, 133),
        optimal: TempoRange::new(116, 126),
        default_bpm: 121,
    },
    ClubPreset {
        id: "wedge",
        name: "Wedge",
        range: TempoRange::new(115, 141),
        optimal: TempoRange::new(122, 134),
        default_bpm: 128,
    },
];

/// Look a preset up by id (`driver`, `long_iron`, `mid_iron`, `wedge`).
/// Dashes are accepted in place of underscores.
pub fn find(id: &str) -> Option<&'static ClubPreset> {
    let id = id.trim().to_ascii_lowercase().replace('-', "_");
    CLUB_PRESETS.iter().find(|preset| preset.id == id)
}

/// The trainer opens on the mid iron.
pub fn default_preset() -> &'static ClubPreset {
    &CLUB_PRESETS[2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_inside_optimal_range() {
        for preset in &CLUB_PRESETS {
            assert!(preset.range.contains(preset.default_bpm), "{}", preset.id);
            assert!(preset.is_optimal(preset.default_bpm), "{}", preset.id);
            assert!(preset.range.min <= preset.optimal.min);
            assert!(preset.optimal.max <= preset.range.max);
        }
    }

    #[test]
    fn test_find_by_id() {
        assert_eq!(find("wedge").unwrap().default_bpm, 128);
        assert_eq!(find("Long-Iron").unwrap().id, "long_iron");
        assert!(find("putter").is_none());
    }

    #[test]
    fn test_default_is_mid_iron() {
        let preset = default_preset();
        assert_eq!(preset.id, "mid_iron");
        assert_eq!(preset.default_bpm, 121);
    }

    #[test]
    fn test_default_download_name() {
        let preset = default_preset();
        assert_eq!(
            crate::audio::AudioArtifact::suggested_file_name(preset.name, preset.default_bpm),
            "golf_metronome_Mid_iron_121bpm.wav"
        );
        let names: Vec<_> = CLUB_PRESETS.iter().map(|p| p.name).collect();
        assert_eq!(names, ["Driver", "Long iron", "Mid iron", "Wedge"]);
    }

    #[test]
    fn test_clamp_to_range() {
        let driver = find("driver").unwrap();
        assert_eq!(driver.clamp(90), 100);
        assert_eq!(driver.clamp(130), 126);
        assert_eq!(driver.clamp(115), 115);
    }

    #[test]
    fn test_overall_bounds() {
        let min = CLUB_PRESETS.iter().map(|p| p.range.min).min().unwrap();
        let max = CLUB_PRESETS.iter().map(|p| p.range.max).max().unwrap();
        assert_eq!((min, max), (100, 141));
    }
}
