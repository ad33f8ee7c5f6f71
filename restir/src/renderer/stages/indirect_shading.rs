use glam::Vec3;

use crate::{
    Config, Dispatch, FrameBuffers, FrameContext, Scene, VisibilityTest,
};

/// Adds the indirect lightning on top of the direct one (or replaces it).
#[derive(Debug)]
pub struct IndirectShadingStage {
    indirect_only: bool,
}

impl IndirectShadingStage {
    pub fn new(config: &Config) -> Self {
        Self {
            indirect_only: config.gi_indirect_only,
        }
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
        let reservoirs = &buffers.gi_reservoirs;
        let view = ctx.view();

        ctx.dispatcher.dispatch(&mut buffers.output, |idx, out| {
            let surface = &surfaces[idx];
            let reservoir = &reservoirs[idx];

            let is_valid = surface.is_some()
                && reservoir.is_some()
                && (!ctx.capabilities.ray_queries
                    || view.is_visible(surface, &reservoir.sample));

            let radiance = if is_valid {
                view.indirect_radiance(surface, &reservoir.sample) * reservoir.w
            } else {
                Vec3::ZERO
            };

            if self.indirect_only {
                out.color = radiance;
            } else {
                out.color += radiance;
            }
        });
    }
}
