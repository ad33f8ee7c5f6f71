use crate::{
    BiasCorrection, Config, Dispatch, FrameBuffers, FrameContext, Resampler,
    Scene,
};

/// Merges each pixel's freshly traced path with the indirect reservoir its
/// surface had during the previous frame.
#[derive(Debug)]
pub struct GiTemporalReuseStage {
    bias: BiasCorrection,
    cap: u32,
    depth_threshold: f32,
    normal_threshold: f32,
}

impl GiTemporalReuseStage {
    const SALT: u32 = 0x165667b1;

    pub fn new(config: &Config) -> Self {
        Self {
            bias: config.bias_correction,
            cap: config.gi_temporal_m_cap,
            depth_threshold: config.gi_depth_threshold,
            normal_threshold: config.gi_normal_threshold,
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
        let prev_surfaces = buffers.surfaces.prev();
        let samples = &buffers.gi_samples;
        let (reservoirs, prev_reservoirs) = buffers.gi_temporal.split_mut();
        let view = ctx.view();

        ctx.dispatcher.dispatch(reservoirs, |idx, out| {
            let screen_pos = screen.idx_to_screen(idx);
            let surface = surfaces[idx];

            *out = samples[idx];

            let Some(prev_pos) = ctx.scene.motion(screen_pos) else {
                return;
            };

            if !screen.contains(prev_pos.as_ivec2()) {
                return;
            }

            let prev_idx = screen.screen_to_idx(prev_pos);
            let prev_surface = prev_surfaces[prev_idx];

            if !surface.is_compatible_with(
                &prev_surface,
                self.depth_threshold,
                self.normal_threshold,
            ) {
                return;
            }

            let mut noise = ctx.noise(Self::SALT, screen_pos);

            *out = Resampler::combine(
                &mut noise,
                (surface, samples[idx]),
                (prev_surface, prev_reservoirs[prev_idx]),
                &view,
                &view,
                self.bias,
                self.cap,
            );
        });
    }
}
