use crate::{
    Config, Dispatch, FrameBuffers, FrameContext, GiReservoir, GiSample,
    Sample, Scene, TargetFunction,
};

/// Traces a single indirect path per pixel, turning it into a one-candidate
/// reservoir.
#[derive(Debug)]
pub struct GiTracingStage {
    bounces: u32,
}

impl GiTracingStage {
    const SALT: u32 = 0x27d4eb2f;

    pub fn new(config: &Config) -> Self {
        Self {
            bounces: config.gi_bounces,
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
        let screen = buffers.screen;
        let surfaces = buffers.surfaces.curr();
        let view = ctx.view();

        ctx.dispatcher.dispatch(&mut buffers.gi_samples, |idx, out| {
            let surface = &surfaces[idx];

            *out = GiReservoir::default();

            if surface.is_none() {
                return;
            }

            let mut noise = ctx.noise(Self::SALT, screen.idx_to_screen(idx));

            let sample = ctx
                .scene
                .trace_indirect(surface, &mut noise, self.bounces)
                .filter(|sample| sample.pdf > 0.0)
                .map(|mut sample| {
                    sample.rebase(surface);
                    sample
                });

            // Paths that escaped still count as a candidate
            let Some(sample) = sample else {
                out.update(&mut noise, GiSample::default(), 0.0);
                return;
            };

            let target = view.target(surface, &sample);

            out.update(&mut noise, sample, target / sample.pdf);
            out.normalize(target);
        });
    }
}
