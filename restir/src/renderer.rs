mod stages;

use std::mem;

use derivative::Derivative;
use glam::UVec2;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use self::stages::*;
use crate::{
    Capabilities, Config, DiReservoir, Dispatch, Error, FrameBuffers,
    GiReservoir, LightTileCache, Lights, Result, Scene, Screen, Shaded,
    Surface,
};

/// Runs the resampling stages, frame after frame, keeping the reservoirs of
/// the previous frame around for temporal reuse.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Renderer {
    config: Config,
    capabilities: Capabilities,

    #[derivative(Debug = "ignore")]
    buffers: FrameBuffers,

    #[derivative(Debug = "ignore")]
    stages: Stages,

    schedule: Vec<StageKind>,
    lights: Lights,
    light_tiles: LightTileCache,

    #[derivative(Debug = "ignore")]
    rng: StdRng,

    frame: u32,
    dirty: bool,
    enabled: bool,
}

impl Renderer {
    pub fn new(mut config: Config, capabilities: Capabilities) -> Result<Self> {
        config.sanitize();
        config.validate(&capabilities)?;

        info!("Initializing renderer; {}", config.describe());

        Ok(Self {
            buffers: FrameBuffers::new(
                Screen::default(),
                config.mode.needs_indirect_lightning(),
            ),
            stages: Stages::new(&config),
            schedule: config.mode.stages().to_vec(),
            lights: Default::default(),
            light_tiles: LightTileCache::new(&config),
            rng: StdRng::seed_from_u64(config.seed),
            frame: 0,
            dirty: false,
            enabled: true,
            config,
            capabilities,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Switches to another configuration; the stages get rebuilt lazily,
    /// during the next [`Self::render()`].
    ///
    /// Configurations that the host can't run are rejected, keeping the
    /// current configuration intact.
    pub fn set_config(&mut self, mut config: Config) -> Result<()> {
        config.sanitize();
        config.validate(&self.capabilities)?;

        if config == self.config {
            return Ok(());
        }

        if config.seed != self.config.seed {
            self.rng = StdRng::seed_from_u64(config.seed);
        }

        if self.config.is_invalidated_by(&config) {
            self.light_tiles.configure(&config);
        }

        self.config = config;
        self.dirty = true;

        Ok(())
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    /// Returns the lights for modification; alias tables and light tiles
    /// get rebuilt during the next [`Self::render()`].
    pub fn lights_mut(&mut self) -> &mut Lights {
        &mut self.lights
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables rendering; disabled renderer outputs black frames
    /// without running any stage.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled != self.enabled {
            if enabled {
                debug!("Enabling renderer");
            } else {
                debug!("Disabling renderer");
            }

            self.enabled = enabled;
        }
    }

    /// Renders a single frame.
    pub fn render<S, D>(
        &mut self,
        scene: &S,
        dispatcher: &D,
        size: UVec2,
    ) -> Result<()>
    where
        S: Scene,
        D: Dispatch,
    {
        if size.x == 0 || size.y == 0 {
            return Err(Error::InvalidFrameSize { size });
        }

        if mem::take(&mut self.dirty) {
            self.rebuild_stages();
        }

        let screen = Screen::new(size);
        let has_gi = self.config.mode.needs_indirect_lightning();

        if screen != self.buffers.screen || has_gi != self.buffers.has_gi {
            self.rebuild_buffers(screen);
        }

        if !self.enabled {
            self.buffers.output.fill(Shaded::default());
            return Ok(());
        }

        if self.lights.refresh() {
            self.light_tiles.invalidate();
            self.buffers.reset_history();
        }

        let seed = self.rng.gen::<u32>();

        self.light_tiles
            .refresh(&self.lights, scene, dispatcher, seed);

        let ctx = FrameContext {
            scene,
            dispatcher,
            lights: &self.lights,
            light_tiles: self.light_tiles.view(),
            capabilities: self.capabilities,
            frame: self.frame,
            seed,
        };

        for &stage in &self.schedule {
            self.stages.run(stage, &ctx, &mut self.buffers);
        }

        self.buffers.end_frame();
        self.frame = self.frame.wrapping_add(1);

        Ok(())
    }

    /// Forgets about the previous frames and forces the light tiles to be
    /// rebuilt.
    pub fn reset(&mut self) {
        debug!("Resetting renderer");

        self.frame = 0;
        self.buffers.reset_history();
        self.lights.invalidate();
    }

    fn rebuild_stages(&mut self) {
        debug!("Rebuilding stages; {}", self.config.describe());

        self.stages = Stages::new(&self.config);
        self.schedule = self.config.mode.stages().to_vec();
    }

    fn rebuild_buffers(&mut self, screen: Screen) {
        debug!(
            "Rebuilding buffers; size = {}x{}",
            screen.size().x,
            screen.size().y,
        );

        self.buffers = FrameBuffers::new(
            screen,
            self.config.mode.needs_indirect_lightning(),
        );

        self.frame = 0;
    }

    /// Returns the number of frames rendered since the last reset.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn schedule(&self) -> &[StageKind] {
        &self.schedule
    }

    pub fn screen(&self) -> Screen {
        self.buffers.screen
    }

    /// Returns the output of the latest frame.
    pub fn output(&self) -> &[Shaded] {
        &self.buffers.output
    }

    /// Returns the direct lightning reservoirs of the latest frame.
    pub fn reservoirs(&self) -> &[DiReservoir] {
        self.buffers.di_reservoirs.prev()
    }

    /// Returns the primary surfaces of the latest frame.
    pub fn surfaces(&self) -> &[Surface] {
        self.buffers.surfaces.prev()
    }

    /// Returns the indirect lightning reservoirs of the latest frame; empty
    /// unless running [`crate::Mode::ReStirGi`].
    pub fn gi_reservoirs(&self) -> &[GiReservoir] {
        &self.buffers.gi_reservoirs
    }

    pub fn light_tiles(&self) -> &LightTileCache {
        &self.light_tiles
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        info!("Releasing renderer (after {} frames)", self.frame);
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use approx::assert_relative_eq;
    use glam::{uvec2, vec3, Vec3};

    use super::*;
    use crate::testing::TestScene;
    use crate::{
        AnalyticLight, BiasCorrection, Capability, LightHandle, Mode, Serial,
        Threaded,
    };

    fn config(mode: Mode) -> Config {
        Config {
            mode,
            emissive_light_candidate_count: 0,
            analytic_light_candidate_count: 4,
            light_tile_count: 8,
            light_tile_size: 128,
            spatial_reuse_sample_radius: 4.0,
            spatial_reuse_sample_count: 4,
            ..Default::default()
        }
    }

    fn renderer(config: Config) -> Renderer {
        let mut renderer =
            Renderer::new(config, Capabilities::default()).unwrap();

        for (idx, position) in [
            vec3(1.0, 3.0, 1.0),
            vec3(6.0, 2.0, 1.0),
            vec3(3.0, 4.0, 6.0),
        ]
        .into_iter()
        .enumerate()
        {
            renderer.lights_mut().add(
                LightHandle(idx as u64),
                AnalyticLight::point(
                    position,
                    Vec3::splat(10.0 * (idx + 1) as f32),
                ),
            );
        }

        renderer
    }

    #[test]
    fn single_candidate_without_resampling() {
        let mut target = Renderer::new(
            Config {
                analytic_light_candidate_count: 1,
                ..config(Mode::NoResampling)
            },
            Capabilities::default(),
        )
        .unwrap();

        target.lights_mut().add(
            LightHandle(1),
            AnalyticLight::point(vec3(0.5, 5.0, 0.5), Vec3::splat(10.0)),
        );

        target
            .render(&TestScene::default(), &Serial, uvec2(2, 2))
            .unwrap();

        assert_eq!(1, target.frame());
        assert_eq!(4, target.reservoirs().len());

        let pixels = target.reservoirs().iter().zip(target.output());

        for (reservoir, shaded) in pixels {
            assert_eq!(1, reservoir.m);
            assert_relative_eq!(1.0, reservoir.w, epsilon = 1e-5);
            assert!(shaded.color.x > 0.0);
            assert_eq!(Vec3::splat(0.5), shaded.albedo);
        }
    }

    #[test]
    fn schedules() {
        for mode in [
            Mode::NoResampling,
            Mode::SpatialOnly,
            Mode::TemporalOnly,
            Mode::Spatiotemporal,
            Mode::Decoupled,
            Mode::ReStirGi,
        ] {
            let target = renderer(config(mode));

            assert_eq!(mode.stages(), target.schedule());
        }
    }

    /// Renders a couple of frames, where the depth jumps back and forth, so
    /// that no temporal reuse is ever possible.
    fn render_with_jumping_depth(config: Config) -> Renderer {
        let mut target = renderer(config);
        let mut scene = TestScene::default();

        for frame in 0..3 {
            scene.depth = if frame % 2 == 0 { 1.0 } else { 5.0 };

            target.render(&scene, &Serial, uvec2(8, 8)).unwrap();
        }

        target
    }

    #[test]
    fn spatiotemporal_without_history_is_spatial_only() {
        let spatial = render_with_jumping_depth(config(Mode::SpatialOnly));

        let spatiotemporal =
            render_with_jumping_depth(config(Mode::Spatiotemporal));

        assert_eq!(spatial.reservoirs(), spatiotemporal.reservoirs());
        assert_eq!(spatial.output(), spatiotemporal.output());
    }

    #[test]
    fn zero_spatial_iterations_is_no_resampling() {
        let none = render_with_jumping_depth(config(Mode::NoResampling));

        let spatial = render_with_jumping_depth(Config {
            spatial_iteration_count: 0,
            ..config(Mode::SpatialOnly)
        });

        assert_eq!(none.reservoirs(), spatial.reservoirs());
        assert_eq!(none.output(), spatial.output());
    }

    #[test]
    fn temporal_reuse_accumulates_confidence() {
        let mut target = renderer(Config {
            temporal_history_length: 10,
            ..config(Mode::TemporalOnly)
        });

        for _ in 0..5 {
            target
                .render(&TestScene::default(), &Serial, uvec2(4, 4))
                .unwrap();
        }

        for reservoir in target.reservoirs() {
            assert_eq!(10, reservoir.m);
            assert!(reservoir.w > 0.0);
        }
    }

    #[test]
    fn bias_corrections() {
        for bias_correction in BiasCorrection::ALL {
            let mut target = renderer(Config {
                bias_correction,
                ..config(Mode::Spatiotemporal)
            });

            for _ in 0..3 {
                target
                    .render(&TestScene::default(), &Serial, uvec2(8, 8))
                    .unwrap();
            }

            for shaded in target.output() {
                assert!(shaded.color.is_finite());
                assert!(shaded.color.x > 0.0, "{bias_correction:?}");
            }
        }
    }

    #[test]
    fn threaded_matches_serial() {
        let mut serial = renderer(config(Mode::Spatiotemporal));
        let mut threaded = renderer(config(Mode::Spatiotemporal));
        let dispatcher = Threaded::new(NonZeroUsize::new(3).unwrap());

        for _ in 0..3 {
            serial
                .render(&TestScene::default(), &Serial, uvec2(7, 5))
                .unwrap();

            threaded
                .render(&TestScene::default(), &dispatcher, uvec2(7, 5))
                .unwrap();
        }

        assert_eq!(serial.reservoirs(), threaded.reservoirs());
        assert_eq!(serial.output(), threaded.output());
    }

    #[test]
    fn decoupled() {
        let mut target = renderer(config(Mode::Decoupled));

        for _ in 0..3 {
            target
                .render(&TestScene::default(), &Serial, uvec2(8, 8))
                .unwrap();
        }

        let pixels = target.reservoirs().iter().zip(target.output());

        for (reservoir, shaded) in pixels {
            assert!(reservoir.m > 0);
            assert!(shaded.color.x > 0.0);
        }

        // Once everything gets occluded, all the samples (including those
        // reused from the previous frame) are discarded
        let scene = TestScene {
            visible: false,
            ..Default::default()
        };

        let mut target = renderer(config(Mode::Decoupled));

        for _ in 0..3 {
            target.render(&scene, &Serial, uvec2(8, 8)).unwrap();
        }

        for shaded in target.output() {
            assert_eq!(Vec3::ZERO, shaded.color);
        }
    }

    #[test]
    fn indirect_lightning() {
        let mut full = renderer(config(Mode::ReStirGi));

        let mut indirect = renderer(Config {
            gi_indirect_only: true,
            ..config(Mode::ReStirGi)
        });

        for _ in 0..3 {
            for target in [&mut full, &mut indirect] {
                target
                    .render(&TestScene::default(), &Serial, uvec2(8, 8))
                    .unwrap();
            }
        }

        assert!(full.gi_reservoirs().iter().all(|res| res.is_some()));

        for (full, indirect) in full.output().iter().zip(indirect.output()) {
            assert!(indirect.color.x > 0.0);
            assert!(indirect.color.x < full.color.x);
        }
    }

    #[test]
    fn missing_capabilities() {
        let capabilities = Capabilities {
            ray_queries: true,
            path_tracing: false,
        };

        let actual = Renderer::new(config(Mode::ReStirGi), capabilities);

        assert!(matches!(
            actual,
            Err(Error::MissingCapability {
                capability: Capability::PathTracing
            })
        ));

        let mut target =
            Renderer::new(config(Mode::Spatiotemporal), capabilities).unwrap();

        assert!(target.set_config(config(Mode::ReStirGi)).is_err());
        assert_eq!(Mode::Spatiotemporal, target.config().mode);
    }

    #[test]
    fn switching_modes() {
        let mut target = renderer(config(Mode::Spatiotemporal));
        let scene = TestScene::default();

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert!(target.gi_reservoirs().is_empty());

        target.set_config(config(Mode::ReStirGi)).unwrap();
        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();

        assert_eq!(Mode::ReStirGi.stages(), target.schedule());
        assert_eq!(16, target.gi_reservoirs().len());
    }

    #[test]
    fn disabled() {
        let mut target = renderer(config(Mode::Spatiotemporal));
        let scene = TestScene::default();

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert!(target.output().iter().any(|shaded| shaded.color.x > 0.0));

        target.set_enabled(false);
        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();

        assert_eq!(1, target.frame());
        assert!(target
            .output()
            .iter()
            .all(|shaded| *shaded == Shaded::default()));
    }

    #[test]
    fn invalid_frame_size() {
        let mut target = renderer(config(Mode::Spatiotemporal));

        let actual =
            target.render(&TestScene::default(), &Serial, uvec2(0, 16));

        assert!(matches!(actual, Err(Error::InvalidFrameSize { .. })));
    }

    #[test]
    fn resizing_resets_history() {
        let mut target = renderer(config(Mode::TemporalOnly));
        let scene = TestScene::default();

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert_eq!(2, target.frame());

        target.render(&scene, &Serial, uvec2(8, 4)).unwrap();
        assert_eq!(1, target.frame());
        assert_eq!(32, target.output().len());

        for reservoir in target.reservoirs() {
            assert_eq!(4, reservoir.m);
        }
    }

    #[test]
    fn light_tiles_are_rebuilt_only_when_needed() {
        let mut target = renderer(config(Mode::NoResampling));
        let scene = TestScene::default();

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();

        let tiles = target.light_tiles().samples().to_vec();

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert_eq!(tiles, target.light_tiles().samples());

        target.lights_mut().add(
            LightHandle(100),
            AnalyticLight::point(vec3(0.0, 1.0, 0.0), Vec3::ONE),
        );

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert_ne!(tiles, target.light_tiles().samples());

        let tiles = target.light_tiles().samples().to_vec();

        target.reset();
        assert_eq!(0, target.frame());

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert_ne!(tiles, target.light_tiles().samples());
    }

    #[test]
    fn light_tiles_follow_their_own_config() {
        let mut target = renderer(config(Mode::NoResampling));
        let scene = TestScene::default();

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();

        let tiles = target.light_tiles().samples().to_vec();

        target.set_config(config(Mode::SpatialOnly)).unwrap();
        assert!(!target.light_tiles().is_dirty());

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert_eq!(tiles, target.light_tiles().samples());

        target
            .set_config(Config {
                light_tile_count: 16,
                ..config(Mode::SpatialOnly)
            })
            .unwrap();

        assert!(target.light_tiles().is_dirty());

        target.render(&scene, &Serial, uvec2(4, 4)).unwrap();
        assert!(!target.light_tiles().is_dirty());
        assert_eq!(16 * 128, target.light_tiles().samples().len());
    }
}
