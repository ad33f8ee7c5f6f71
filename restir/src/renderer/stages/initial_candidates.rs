use glam::UVec2;

use crate::{
    Config, DiReservoir, DiSample, Dispatch, FrameBuffers, FrameContext,
    LightKind, Scene, Screen, Surface, TargetFunction, VisibilityTest,
};

/// Generates the initial reservoirs by streaming candidates picked out of the
/// light tiles.
#[derive(Debug)]
pub struct InitialCandidatesStage {
    /// Number of candidates per light class, indexed by
    /// [`LightKind::to_bits()`]
    counts: [u32; 3],
    use_checkerboarding: bool,
    test_visibility: bool,
    cap: u32,
}

impl InitialCandidatesStage {
    const SALT: u32 = 0x1b873593;
    const TILE_SALT: u32 = 0xcc9e2d51;

    pub fn new(config: &Config) -> Self {
        Self {
            counts: [
                config.emissive_light_candidate_count,
                config.environment_light_candidate_count,
                config.analytic_light_candidate_count,
            ],
            use_checkerboarding: config.use_checkerboarding,
            test_visibility: config.test_initial_sample_visibility,
            cap: config.temporal_history_length,
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

        ctx.dispatcher.dispatch(
            buffers.di_reservoirs.curr_mut(),
            |idx, reservoir| {
                let screen_pos = screen.idx_to_screen(idx);
                let surface = &surfaces[idx];

                *reservoir = self.generate(ctx, screen_pos, surface);

                if self.test_visibility
                    && reservoir.is_some()
                    && !ctx.view().is_visible(surface, &reservoir.sample)
                {
                    reservoir.w = 0.0;
                }
            },
        );
    }

    /// Streams the candidates for a single pixel, without testing the
    /// visibility of the chosen one.
    ///
    /// Returns an empty reservoir for pixels that have no surface or are
    /// skipped due to checkerboarding.
    pub(crate) fn generate<S, D>(
        &self,
        ctx: &FrameContext<'_, S, D>,
        screen_pos: UVec2,
        surface: &Surface,
    ) -> DiReservoir
    where
        S: Scene,
        D: Dispatch,
    {
        if surface.is_none() {
            return Default::default();
        }

        if self.use_checkerboarding
            && !Screen::is_checkerboard_active(screen_pos, ctx.frame)
        {
            return Default::default();
        }

        let Some(tile) = ctx
            .light_tiles
            .tile_for(ctx.seed ^ Self::TILE_SALT, screen_pos)
        else {
            return Default::default();
        };

        let view = ctx.view();
        let partition = ctx.light_tiles.partition();
        let mut noise = ctx.noise(Self::SALT, screen_pos);
        let mut reservoir = DiReservoir::default();

        for kind in LightKind::ALL {
            let count = self.counts[kind.to_bits() as usize];
            let (offset, len) = partition.range(kind);

            for _ in 0..count {
                if len == 0 {
                    reservoir.update(&mut noise, DiSample::default(), 0.0);
                    continue;
                }

                let candidate = ctx
                    .light_tiles
                    .get(tile, offset + noise.sample_below(len));

                let sample = DiSample::from_tile(&candidate);

                let weight = if candidate.is_some() {
                    view.target(surface, &sample)
                        / ((count as f32) * candidate.pdf)
                } else {
                    0.0
                };

                reservoir.update(&mut noise, sample, weight);
            }
        }

        reservoir.normalize(view.target(surface, &reservoir.sample));
        reservoir.clamp_m(self.cap);
        reservoir
    }
}
