use crate::{
    Config, DirectSample, Dispatch, FrameBuffers, FrameContext, Scene,
    VisibilityTest,
};

/// Evaluates the sample chosen by each pixel's reservoir, tracing a shadow
/// ray towards it if the host supports them.
#[derive(Debug)]
pub struct DirectSamplesStage;

impl DirectSamplesStage {
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
        let reservoirs = buffers.di_reservoirs.curr();
        let view = ctx.view();

        ctx.dispatcher.dispatch(&mut buffers.direct_samples, |idx, out| {
            let surface = &surfaces[idx];
            let reservoir = &reservoirs[idx];

            *out = DirectSample::default();

            if surface.is_none() || !reservoir.is_some() {
                return;
            }

            let is_visible = !ctx.capabilities.ray_queries
                || view.is_visible(surface, &reservoir.sample);

            out.light_point = reservoir.sample.light_point;

            if is_visible {
                out.radiance = view.direct_radiance(surface, &reservoir.sample)
                    * reservoir.w;
            }
        });
    }
}
