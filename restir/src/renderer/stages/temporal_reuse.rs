use crate::{
    BiasCorrection, Config, Dispatch, FrameBuffers, FrameContext, Resampler,
    Scene,
};

/// Merges each pixel's reservoir with the reservoir its surface had during
/// the previous frame.
#[derive(Debug)]
pub struct TemporalReuseStage {
    bias: BiasCorrection,
    cap: u32,
    depth_threshold: f32,
    normal_threshold: f32,
}

impl TemporalReuseStage {
    const SALT: u32 = 0xe6546b64;

    pub fn new(config: &Config) -> Self {
        Self {
            bias: config.bias_correction,
            cap: config.temporal_history_length,
            depth_threshold: config.depth_threshold,
            normal_threshold: config.normal_threshold,
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
        let (reservoirs, prev_reservoirs) = buffers.di_reservoirs.split_mut();
        let view = ctx.view();

        ctx.dispatcher.dispatch(reservoirs, |idx, reservoir| {
            let screen_pos = screen.idx_to_screen(idx);
            let surface = surfaces[idx];

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

            *reservoir = Resampler::combine(
                &mut noise,
                (surface, *reservoir),
                (prev_surface, prev_reservoirs[prev_idx]),
                &view,
                &view,
                self.bias,
                self.cap,
            );
        });
    }
}
