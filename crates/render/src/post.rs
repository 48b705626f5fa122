use serde::{Deserialize, Serialize};

/// Bright-pass bloom: extract, separable blur, additive composite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BloomSettings {
    /// Luminance above which pixels start to glow.
    pub threshold: f32,
    /// Weight of the blurred glow added back onto the image.
    pub strength: f32,
    /// Blur spread in texels.
    pub radius: f32,
}

impl Default for BloomSettings {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            strength: 1.2,
            radius: 1.0,
        }
    }
}

/// Time-varying film grain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrainSettings {
    pub intensity: f32,
    /// Relative intensity modulation over time, 0 keeps it constant.
    pub flicker: f32,
}

impl Default for GrainSettings {
    fn default() -> Self {
        Self {
            intensity: 0.08,
            flicker: 0.25,
        }
    }
}

impl GrainSettings {
    /// Grain intensity at `time` seconds.
    pub fn intensity_at(&self, time: f32) -> f32 {
        (self.intensity * (1.0 + self.flicker * (time * 3.0).sin())).max(0.0)
    }
}

/// A full-screen pass of the post-processing chain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PostEffect {
    Bloom(BloomSettings),
    Grain(GrainSettings),
}

impl PostEffect {
    pub fn label(&self) -> &'static str {
        match self {
            PostEffect::Bloom(_) => "bloom",
            PostEffect::Grain(_) => "grain",
        }
    }

    /// Number of intermediate targets the effect needs besides its input and output.
    pub fn scratch_targets(&self) -> usize {
        match self {
            PostEffect::Bloom(_) => 2,
            PostEffect::Grain(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grain_flicker_stays_non_negative() {
        let grain = GrainSettings {
            intensity: 0.1,
            flicker: 2.0,
        };
        for i in 0..100 {
            assert!(grain.intensity_at(i as f32 * 0.1) >= 0.0);
        }
        let steady = GrainSettings {
            intensity: 0.1,
            flicker: 0.0,
        };
        assert_eq!(steady.intensity_at(1.7), 0.1);
    }

    #[test]
    fn scratch_requirements() {
        assert_eq!(PostEffect::Bloom(BloomSettings::default()).scratch_targets(), 2);
        assert_eq!(PostEffect::Grain(GrainSettings::default()).scratch_targets(), 0);
    }

    #[test]
    fn settings_fill_missing_fields() {
        let bloom: BloomSettings = serde_json::from_str(r#"{"strength": 2.0}"#).unwrap();
        assert_eq!(bloom.strength, 2.0);
        assert_eq!(bloom.threshold, BloomSettings::default().threshold);
    }
}
