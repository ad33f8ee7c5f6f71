use std::mem;

use glam::uvec2;

use super::neighbours;
use crate::{
    BiasCorrection, Config, Dispatch, FrameBuffers, FrameContext, GiReservoir,
    Resampler, Scene, WhiteNoise,
};

/// Merges each pixel's indirect reservoir with reservoirs of its neighbours.
///
/// The first iteration reads the output of temporal reuse, the following ones
/// read the output of the iteration before; the final result always lands in
/// [`FrameBuffers::gi_reservoirs`].
#[derive(Debug)]
pub struct GiSpatialReuseStage {
    bias: BiasCorrection,
    cap: u32,
    iterations: u32,
    sample_count: u32,
    sample_radius: f32,
    depth_threshold: f32,
    normal_threshold: f32,
}

impl GiSpatialReuseStage {
    const SALT: u32 = 0xd3a2646c;

    pub fn new(config: &Config) -> Self {
        Self {
            bias: config.bias_correction,
            cap: config.gi_spatial_m_cap,
            iterations: config.gi_spatial_iteration_count,
            sample_count: config.gi_spatial_reuse_sample_count,
            sample_radius: config.spatial_reuse_sample_radius,
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
        let view = ctx.view();

        for iteration in 0..self.iterations {
            if iteration > 0 {
                mem::swap(&mut buffers.gi_spatial, &mut buffers.gi_reservoirs);
            }

            let surfaces = buffers.surfaces.curr();

            let input: &[GiReservoir] = if iteration > 0 {
                &buffers.gi_spatial
            } else {
                buffers.gi_temporal.curr()
            };

            ctx.dispatcher.dispatch(&mut buffers.gi_reservoirs, |idx, out| {
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
