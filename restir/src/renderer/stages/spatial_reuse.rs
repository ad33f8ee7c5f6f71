use glam::uvec2;

use super::neighbours;
use crate::{
    BiasCorrection, Config, Dispatch, FrameBuffers, FrameContext, Resampler,
    Scene, WhiteNoise,
};

/// Merges each pixel's reservoir with reservoirs of its neighbours.
///
/// Every iteration reads the output of the previous one, so the reservoirs
/// get ping-ponged; after the last iteration the result lands in the current
/// buffer, as if no iterations happened at all.
#[derive(Debug)]
pub struct SpatialReuseStage {
    bias: BiasCorrection,
    cap: u32,
    iterations: u32,
    sample_count: u32,
    sample_radius: f32,
    depth_threshold: f32,
    normal_threshold: f32,
}

impl SpatialReuseStage {
    const SALT: u32 = 0x85ebca6b;

    pub fn new(config: &Config) -> Self {
        Self {
            bias: config.bias_correction,
            cap: config.temporal_history_length,
            iterations: config.spatial_iteration_count,
            sample_count: config.spatial_reuse_sample_count,
            sample_radius: config.spatial_reuse_sample_radius,
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
        let view = ctx.view();

        for iteration in 0..self.iterations {
            buffers.di_reservoirs.swap();

            let surfaces = buffers.surfaces.curr();
            let (output, input) = buffers.di_reservoirs.split_mut();

            ctx.dispatcher.dispatch(output, |idx, out| {
                let screen_pos = screen.idx_to_screen(idx);
                let surface = surfaces[idx];

                *out = input[idx];

                if surface.is_none() {
                    return;
                }

                let mut noise = WhiteNoise::new(
                    ctx.seed ^ Self::SALT,
                    uvec2(screen_pos.x, screen_pos.y ^ (iteration << 16)),
                );

                let mut resampler =
                    Resampler::new(surface, input[idx], self.cap);

                for neighbour_pos in neighbours(
                    &mut noise,
                    screen,
                    screen_pos,
                    self.sample_count,
                    self.sample_radius,
                ) {
                    let neighbour_idx = screen.screen_to_idx(neighbour_pos);
                    let neighbour = surfaces[neighbour_idx];

                    if surface.is_compatible_with(
                        &neighbour,
                        self.depth_threshold,
                        self.normal_threshold,
                    ) {
                        resampler.add(neighbour, input[neighbour_idx]);
                    }
                }

                *out = resampler.resample(&mut noise, &view, &view, self.bias);
            });
        }
    }
}
