//! Frame plans: the explicit per-frame list of scene passes and post effects.

use crate::RenderError;
use crate::post::PostEffect;
use knotlab_scene::FaceSide;
use std::collections::BTreeSet;

/// Named offscreen buffer a plan renders into and samples from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// What lies behind the subject.
    Back,
    /// The subject's rear faces refracting [`Slot::Back`].
    Main,
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Slot::Back => f.write_str("back"),
            Slot::Main => f.write_str("main"),
        }
    }
}

/// Destination of a scene pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutput {
    Slot(Slot),
    /// The screen, or the post chain's input when the chain is non-empty.
    Final,
}

/// One scene render: subject state going in, buffer coming out.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenePass {
    pub label: &'static str,
    pub subject_visible: bool,
    /// Face side forced on the subject; `None` keeps the material's own.
    pub subject_side: Option<FaceSide>,
    /// Slot the subject's texture uniform points at during this pass.
    pub source: Option<Slot>,
    pub output: PassOutput,
}

/// Ordered scene passes followed by a linear post-processing chain.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    pub passes: Vec<ScenePass>,
    pub post: Vec<PostEffect>,
}

impl FramePlan {
    /// One render of the whole scene straight to the final output.
    pub fn single_pass(post: Vec<PostEffect>) -> Self {
        Self {
            passes: vec![ScenePass {
                label: "scene",
                subject_visible: true,
                subject_side: None,
                source: None,
                output: PassOutput::Final,
            }],
            post,
        }
    }

    /// Background, back faces, front faces.
    pub fn refraction(post: Vec<PostEffect>) -> Self {
        Self {
            passes: vec![
                ScenePass {
                    label: "background",
                    subject_visible: false,
                    subject_side: None,
                    source: None,
                    output: PassOutput::Slot(Slot::Back),
                },
                ScenePass {
                    label: "back-faces",
                    subject_visible: true,
                    subject_side: Some(FaceSide::Back),
                    source: Some(Slot::Back),
                    output: PassOutput::Slot(Slot::Main),
                },
                ScenePass {
                    label: "front-faces",
                    subject_visible: true,
                    subject_side: Some(FaceSide::Front),
                    source: Some(Slot::Main),
                    output: PassOutput::Final,
                },
            ],
            post,
        }
    }

    /// Offscreen slots written by the plan.
    pub fn slots(&self) -> BTreeSet<Slot> {
        self.passes
            .iter()
            .filter_map(|p| match p.output {
                PassOutput::Slot(s) => Some(s),
                PassOutput::Final => None,
            })
            .collect()
    }

    /// Whether any pass samples an offscreen slot.
    pub fn samples_slots(&self) -> bool {
        self.passes.iter().any(|p| p.source.is_some())
    }

    pub fn is_multi_pass(&self) -> bool {
        self.passes.len() > 1
    }

    /// Reject plans that would feed back into themselves or sample stale buffers.
    ///
    /// A pass may only sample the slot written by the pass right before it.
    pub fn validate(&self) -> Result<(), RenderError> {
        let Some(last) = self.passes.last() else {
            return Err(RenderError::EmptyPlan);
        };
        if last.output != PassOutput::Final {
            return Err(RenderError::MissingFinalPass);
        }
        for (i, pass) in self.passes.iter().enumerate() {
            if pass.output == PassOutput::Final && i + 1 != self.passes.len() {
                return Err(RenderError::FinalPassNotLast(pass.label));
            }
            let Some(source) = pass.source else {
                continue;
            };
            if pass.output == PassOutput::Slot(source) {
                return Err(RenderError::FeedbackLoop {
                    pass: pass.label,
                    slot: source,
                });
            }
            if !pass.subject_visible {
                return Err(RenderError::HiddenSampler(pass.label));
            }
            let previous = i.checked_sub(1).map(|p| self.passes[p].output);
            if previous != Some(PassOutput::Slot(source)) {
                return Err(RenderError::StaleSource {
                    pass: pass.label,
                    slot: source,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::BloomSettings;

    #[test]
    fn builtin_plans_validate() {
        FramePlan::single_pass(vec![]).validate().unwrap();
        FramePlan::single_pass(vec![PostEffect::Bloom(BloomSettings::default())])
            .validate()
            .unwrap();
        FramePlan::refraction(vec![]).validate().unwrap();
    }

    #[test]
    fn refraction_plan_shape() {
        let plan = FramePlan::refraction(vec![]);
        assert!(plan.is_multi_pass());
        assert!(plan.samples_slots());
        assert_eq!(plan.slots().into_iter().collect::<Vec<_>>(), vec![Slot::Back, Slot::Main]);
        assert!(!plan.passes[0].subject_visible);
        assert_eq!(plan.passes[1].subject_side, Some(FaceSide::Back));
        assert_eq!(plan.passes[2].subject_side, Some(FaceSide::Front));
    }

    #[test]
    fn empty_plan_is_rejected() {
        let plan = FramePlan {
            passes: vec![],
            post: vec![],
        };
        assert!(matches!(plan.validate(), Err(RenderError::EmptyPlan)));
    }

    #[test]
    fn sampling_two_passes_back_is_stale() {
        let mut plan = FramePlan::refraction(vec![]);
        plan.passes[2].source = Some(Slot::Back);
        assert!(matches!(
            plan.validate(),
            Err(RenderError::StaleSource {
                pass: "front-faces",
                slot: Slot::Back
            })
        ));
    }

    #[test]
    fn sampling_own_output_is_a_feedback_loop() {
        let mut plan = FramePlan::refraction(vec![]);
        plan.passes[1].source = Some(Slot::Main);
        assert!(matches!(plan.validate(), Err(RenderError::FeedbackLoop { .. })));
    }

    #[test]
    fn final_output_must_come_last() {
        let mut plan = FramePlan::refraction(vec![]);
        plan.passes[1].output = PassOutput::Final;
        assert!(matches!(plan.validate(), Err(RenderError::FinalPassNotLast(_))));

        let mut plan = FramePlan::refraction(vec![]);
        plan.passes[2].output = PassOutput::Slot(Slot::Back);
        assert!(matches!(plan.validate(), Err(RenderError::MissingFinalPass)));
    }
}
