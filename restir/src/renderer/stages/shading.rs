use glam::Vec3;

use crate::{Config, Dispatch, FrameBuffers, FrameContext, Scene, Shaded};

/// Composes the direct lightning into the output.
#[derive(Debug)]
pub struct ShadingStage;

impl ShadingStage {
    pub fn new(_: &Config) -> Self {
        Self
    }

    pub fn run<S, D>(
        &self,
        ctx: &FrameContext<'_, S, D>,
        buffers: &mut FrameBuffers,
    ) where
        S: Scene,
        D: Dispatch,
    {
        let surfaces = buffers.surfaces.curr();
        let direct_samples = &buffers.direct_samples;

        ctx.dispatcher.dispatch(&mut buffers.output, |idx, out| {
            let surface = &surfaces[idx];

            let albedo = if surface.is_some() {
                ctx.scene.albedo(surface)
            } else {
                Vec3::ZERO
            };

            *out = Shaded {
                color: direct_samples[idx].radiance,
                albedo,
            };
        });
    }
}
