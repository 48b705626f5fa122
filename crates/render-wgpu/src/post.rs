use crate::pipelines::PostStage;
use crate::uniforms::PostUniforms;
use knotlab_common::Extent;
use knotlab_render::PostEffect;

/// Source of a texture binding within one post stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageInput {
    /// The effect's input target.
    Input,
    Scratch(usize),
}

/// Destination of one post stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutput {
    Scratch(usize),
    /// The call's output: an offscreen target or the frame canvas.
    Output,
}

/// One full-screen draw of an effect.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageDesc {
    pub stage: PostStage,
    pub primary: StageInput,
    pub extra: StageInput,
    pub output: StageOutput,
    pub uniforms: PostUniforms,
}

/// Expand an effect into its full-screen stages.
///
/// Bloom: bright-pass into scratch 0, horizontal blur into scratch 1, vertical
/// blur back into scratch 0, then the input plus the glow into the output.
pub fn stages(effect: &PostEffect, extent: Extent, time: f32) -> Vec<StageDesc> {
    match effect {
        PostEffect::Bloom(bloom) => vec![
            StageDesc {
                stage: PostStage::BloomExtract,
                primary: StageInput::Input,
                extra: StageInput::Input,
                output: StageOutput::Scratch(0),
                uniforms: PostUniforms::new(extent, [0.0, 0.0], bloom.threshold, time),
            },
            StageDesc {
                stage: PostStage::Blur,
                primary: StageInput::Scratch(0),
                extra: StageInput::Scratch(0),
                output: StageOutput::Scratch(1),
                uniforms: PostUniforms::new(extent, [bloom.radius, 0.0], 0.0, time),
            },
            StageDesc {
                stage: PostStage::Blur,
                primary: StageInput::Scratch(1),
                extra: StageInput::Scratch(1),
                output: StageOutput::Scratch(0),
                uniforms: PostUniforms::new(extent, [0.0, bloom.radius], 0.0, time),
            },
            StageDesc {
                stage: PostStage::BloomComposite,
                primary: StageInput::Input,
                extra: StageInput::Scratch(0),
                output: StageOutput::Output,
                uniforms: PostUniforms::new(extent, [0.0, 0.0], bloom.strength, time),
            },
        ],
        PostEffect::Grain(grain) => vec![StageDesc {
            stage: PostStage::Grain,
            primary: StageInput::Input,
            extra: StageInput::Input,
            output: StageOutput::Output,
            uniforms: PostUniforms::new(extent, [0.0, 0.0], grain.intensity_at(time), time),
        }],
    }
}

pub fn fullscreen_pass(
    encoder: &mut wgpu::CommandEncoder,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
    output: &wgpu::TextureView,
) {
    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("post_pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: output,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        ..Default::default()
    });
    pass.set_pipeline(pipeline);
    pass.set_bind_group(0, bind_group, &[]);
    pass.draw(0..3, 0..1);
}
