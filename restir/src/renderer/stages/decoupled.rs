use glam::{UVec2, Vec3};

use super::neighbours;
use crate::{
    BiasCorrection, Config, DiReservoir, DirectSample, Dispatch, FrameBuffers,
    FrameContext, InitialCandidatesStage, Resampler, Scene, Screen, Shaded,
    Surface, VisibilityTest,
};

/// Generates candidates, reuses them temporally and spatially and shades the
/// result, all within a single per-pixel pass.
///
/// Since pixels don't wait for each other, reuse reads only the previous
/// frame's reservoirs. Merging is always done with [`BiasCorrection::Off`];
/// instead of testing every merged sample, visibility is tested only for
/// samples reused from far enough.
#[derive(Debug)]
pub struct DecoupledStage {
    candidates: InitialCandidatesStage,
    cap: u32,
    sample_count: u32,
    sample_radius: f32,
    visibility_threshold: f32,
    test_initial_visibility: bool,
    depth_threshold: f32,
    normal_threshold: f32,
}

#[derive(Clone, Copy, Debug, Default)]
struct Pixel {
    surface: Surface,
    reservoir: DiReservoir,
    direct: DirectSample,
    shaded: Shaded,
}

impl DecoupledStage {
    const SALT: u32 = 0x9e3779b9;

    pub fn new(config: &Config) -> Self {
        Self {
            candidates: InitialCandidatesStage::new(config),
            cap: config.temporal_history_length,
            sample_count: config.spatial_reuse_sample_count,
            sample_radius: config.spatial_reuse_sample_radius,
            visibility_threshold: config.spatial_visibility_threshold,
            test_initial_visibility: config.test_initial_sample_visibility,
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
        let prev_surfaces = buffers.surfaces.prev();
        let prev_reservoirs = buffers.di_reservoirs.prev();
        let mut pixels = vec![Pixel::default(); screen.len()];

        ctx.dispatcher.dispatch(&mut pixels, |idx, pixel| {
            *pixel = self.render(
                ctx,
                screen,
                screen.idx_to_screen(idx),
                prev_surfaces,
                prev_reservoirs,
            );
        });

        for (idx, pixel) in pixels.into_iter().enumerate() {
            buffers.surfaces.curr_mut()[idx] = pixel.surface;
            buffers.di_reservoirs.curr_mut()[idx] = pixel.reservoir;
            buffers.direct_samples[idx] = pixel.direct;
            buffers.output[idx] = pixel.shaded;
        }
    }

    fn render<S, D>(
        &self,
        ctx: &FrameContext<'_, S, D>,
        screen: Screen,
        screen_pos: UVec2,
        prev_surfaces: &[Surface],
        prev_reservoirs: &[DiReservoir],
    ) -> Pixel
    where
        S: Scene,
        D: Dispatch,
    {
        let surface = ctx.scene.surface(screen_pos);

        if surface.is_none() {
            return Pixel {
                surface,
                ..Default::default()
            };
        }

        let view = ctx.view();
        let canonical = self.candidates.generate(ctx, screen_pos, &surface);
        let mut noise = ctx.noise(Self::SALT, screen_pos);
        let mut resampler = Resampler::new(surface, canonical, self.cap);

        // Screen positions the contributors come from, in the order they
        // have been added to the resampler
        let mut origins = Vec::with_capacity(self.sample_count as usize + 2);

        origins.push(screen_pos);

        let prev_pos = ctx
            .scene
            .motion(screen_pos)
            .filter(|prev_pos| screen.contains(prev_pos.as_ivec2()));

        if let Some(prev_pos) = prev_pos {
            let prev_idx = screen.screen_to_idx(prev_pos);
            let prev_surface = prev_surfaces[prev_idx];

            if self.is_compatible(&surface, &prev_surface)
                && resampler.add(prev_surface, prev_reservoirs[prev_idx])
            {
                origins.push(prev_pos);
            }
        }

        for neighbour_pos in neighbours(
            &mut noise,
            screen,
            screen_pos,
            self.sample_count,
            self.sample_radius,
        ) {
            let neighbour_idx = screen.screen_to_idx(neighbour_pos);

            if self.is_compatible(&surface, &prev_surfaces[neighbour_idx])
                && resampler.add(
                    prev_surfaces[neighbour_idx],
                    prev_reservoirs[neighbour_idx],
                )
            {
                origins.push(neighbour_pos);
            }
        }

        let (mut reservoir, picked) = resampler.resample_ex(
            &mut noise,
            &view,
            &view,
            BiasCorrection::Off,
        );

        if let Some(picked) = picked {
            let needs_visibility_test = if picked == 0 {
                self.test_initial_visibility
            } else {
                let distance =
                    origins[picked].as_vec2().distance(screen_pos.as_vec2());

                distance > self.visibility_threshold
            };

            if needs_visibility_test
                && !view.is_visible(&surface, &reservoir.sample)
            {
                reservoir.w = 0.0;
            }
        }

        let radiance = if reservoir.is_some() {
            view.direct_radiance(&surface, &reservoir.sample) * reservoir.w
        } else {
            Vec3::ZERO
        };

        Pixel {
            surface,
            reservoir,
            direct: DirectSample {
                light_point: reservoir.sample.light_point,
                radiance,
            },
            shaded: Shaded {
                color: radiance,
                albedo: ctx.scene.albedo(&surface),
            },
        }
    }

    fn is_compatible(&self, surface: &Surface, other: &Surface) -> bool {
        surface.is_compatible_with(
            other,
            self.depth_threshold,
            self.normal_threshold,
        )
    }
}
