//! The five hard-coded knot experiments.
//!
//! Each experiment is a function building an [`ExperimentSetup`]: its scene,
//! camera and frame plan. Nothing here composes experiments with each other.
//!
//! # Invariants
//! - Every setup passes [`ExperimentSetup::validate`] as built.
//! - Refraction plans always have a subject knot.

mod glow;
mod iridescence;
mod normals;
mod refraction;

use glam::Vec3;
use knotlab_render::ExperimentSetup;
use knotlab_scene::{OrbitCamera, SceneError, Shape, TorusKnot};

/// One of the visuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExperimentKind {
    Glow,
    Iridescence,
    Normals,
    Refraction,
    Dispersion,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown experiment `{0}` (expected one of: glow, iridescence, normals, refraction, dispersion)")]
pub struct UnknownExperiment(pub String);

impl ExperimentKind {
    pub const ALL: [ExperimentKind; 5] = [
        ExperimentKind::Glow,
        ExperimentKind::Iridescence,
        ExperimentKind::Normals,
        ExperimentKind::Refraction,
        ExperimentKind::Dispersion,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ExperimentKind::Glow => "glow",
            ExperimentKind::Iridescence => "iridescence",
            ExperimentKind::Normals => "normals",
            ExperimentKind::Refraction => "refraction",
            ExperimentKind::Dispersion => "dispersion",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExperimentKind::Glow => "fresnel edge glow with bloom",
            ExperimentKind::Iridescence => "view-angle cosine palette",
            ExperimentKind::Normals => "surface normals as colour",
            ExperimentKind::Refraction => "multi-pass refraction with per-channel IOR",
            ExperimentKind::Dispersion => "chromatic dispersion with bloom and film grain",
        }
    }

    /// Assemble scene, camera and plan.
    pub fn setup(&self) -> Result<ExperimentSetup, SceneError> {
        let setup = match self {
            ExperimentKind::Glow => glow::setup(),
            ExperimentKind::Iridescence => iridescence::setup(),
            ExperimentKind::Normals => normals::setup(),
            ExperimentKind::Refraction => refraction::refraction(),
            ExperimentKind::Dispersion => refraction::dispersion(),
        }?;
        tracing::debug!(
            "assembled `{}`: {} objects, {} passes",
            setup.name,
            setup.scene.len(),
            setup.plan.passes.len()
        );
        Ok(setup)
    }
}

impl std::fmt::Display for ExperimentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ExperimentKind {
    type Err = UnknownExperiment;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| UnknownExperiment(s.to_string()))
    }
}

/// The trefoil used as the subject of every experiment.
fn knot() -> Shape {
    Shape::TorusKnot(TorusKnot {
        radius: 1.0,
        tube: 0.32,
        tubular_segments: 256,
        radial_segments: 32,
        p: 2,
        q: 3,
    })
}

fn camera() -> OrbitCamera {
    OrbitCamera::looking_at(Vec3::new(0.0, 0.0, 6.0), Vec3::ZERO).with_fov_degrees(45.0)
}

/// Slow tumble shared by the knots.
const KNOT_SPIN: Vec3 = Vec3::new(0.0, 0.25, 0.1);

#[cfg(test)]
mod tests {
    use super::*;
    use knotlab_common::{Extent, Viewport};
    use knotlab_render::{Command, Experiment, Output, RecordingBackend};

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in ExperimentKind::ALL {
            assert_eq!(kind.name().parse::<ExperimentKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
        assert_eq!(" Glow ".parse::<ExperimentKind>().unwrap(), ExperimentKind::Glow);
        assert!("bubbles".parse::<ExperimentKind>().is_err());
    }

    #[test]
    fn every_setup_validates() {
        for kind in ExperimentKind::ALL {
            let setup = kind.setup().unwrap();
            assert_eq!(setup.name, kind.name());
            setup.validate().unwrap_or_else(|e| panic!("{kind}: {e}"));
        }
    }

    #[test]
    fn every_experiment_renders_frames_and_exports() {
        for kind in ExperimentKind::ALL {
            let mut backend = RecordingBackend::new();
            let mut experiment =
                Experiment::new(kind.setup().unwrap(), Viewport::new(64.0, 48.0, 1.0), &mut backend)
                    .unwrap();
            for _ in 0..3 {
                experiment.advance(1.0 / 60.0);
                experiment.render_frame(&mut backend).unwrap();
            }
            let capture = experiment.export(&mut backend).unwrap();
            assert_eq!(capture.extent, Extent::new(256, 192), "{kind}");
            assert_eq!(experiment.canvas(), Extent::new(64, 48));
            assert_eq!(backend.frames_completed(), 4);
        }
    }

    #[test]
    fn refraction_kinds_run_three_scene_passes() {
        for kind in [ExperimentKind::Refraction, ExperimentKind::Dispersion] {
            let mut backend = RecordingBackend::new();
            let mut experiment =
                Experiment::new(kind.setup().unwrap(), Viewport::new(32.0, 32.0, 1.0), &mut backend)
                    .unwrap();
            backend.take_commands();
            experiment.render_frame(&mut backend).unwrap();
            let labels: Vec<_> = backend.scene_records().map(|r| r.label.clone()).collect();
            assert_eq!(labels, ["background", "back-faces", "front-faces"]);
        }
    }

    #[test]
    fn single_pass_kinds_draw_once() {
        let expected_post = [
            (ExperimentKind::Glow, 1),
            (ExperimentKind::Iridescence, 0),
            (ExperimentKind::Normals, 0),
        ];
        for (kind, post) in expected_post {
            let mut backend = RecordingBackend::new();
            let mut experiment =
                Experiment::new(kind.setup().unwrap(), Viewport::new(32.0, 32.0, 1.0), &mut backend)
                    .unwrap();
            backend.take_commands();
            experiment.render_frame(&mut backend).unwrap();
            assert_eq!(backend.scene_records().count(), 1, "{kind}");
            assert_eq!(backend.post_records().count(), post, "{kind}");
            let last_draw = backend
                .commands()
                .iter()
                .rev()
                .find_map(|c| match c {
                    Command::Scene(r) => Some(r.output),
                    Command::Post(r) => Some(r.output),
                    _ => None,
                })
                .unwrap();
            assert_eq!(last_draw, Output::Screen, "{kind}");
        }
    }

    #[test]
    fn dispersion_runs_bloom_then_grain() {
        let mut backend = RecordingBackend::new();
        let mut experiment = Experiment::new(
            ExperimentKind::Dispersion.setup().unwrap(),
            Viewport::new(32.0, 32.0, 1.0),
            &mut backend,
        )
        .unwrap();
        backend.take_commands();
        experiment.render_frame(&mut backend).unwrap();
        let post: Vec<_> = backend.post_records().map(|r| r.label.clone()).collect();
        assert_eq!(post, ["bloom", "grain"]);
    }
}
