use derivative::Derivative;
use glam::uvec2;
use log::debug;

use crate::{
    Config, Dispatch, LightId, LightKind, LightTilePartition, LightTileSample,
    LightTilesView, Lights, Scene, WhiteNoise,
};

/// Light candidates precomputed once for the whole screen, so that the
/// per-pixel stages don't have to touch the alias tables.
///
/// Tiles are rebuilt only when the light set or the tile configuration
/// changes.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct LightTileCache {
    #[derivative(Debug = "ignore")]
    samples: Vec<LightTileSample>,
    partition: LightTilePartition,
    tile_count: u32,
    screen_size: u32,
    dirty: bool,
}

impl LightTileCache {
    const SALT: u32 = 0x68e31da4;

    pub fn new(config: &Config) -> Self {
        let mut this = Self {
            samples: Default::default(),
            partition: Default::default(),
            tile_count: 0,
            screen_size: 1,
            dirty: true,
        };

        this.configure(config);
        this
    }

    /// Adjusts tile layout to given configuration, marking the tiles as
    /// outdated if anything has changed.
    pub fn configure(&mut self, config: &Config) {
        let partition = LightTilePartition::new(
            config.light_tile_size,
            config.emissive_light_candidate_count,
            config.environment_light_candidate_count,
            config.analytic_light_candidate_count,
        );

        if partition != self.partition
            || config.light_tile_count != self.tile_count
            || config.light_tile_screen_size != self.screen_size
        {
            self.partition = partition;
            self.tile_count = config.light_tile_count;
            self.screen_size = config.light_tile_screen_size;
            self.dirty = true;
        }
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuilds the tiles if they are outdated; returns whether anything has
    /// been rebuilt.
    pub fn refresh<S, D>(
        &mut self,
        lights: &Lights,
        scene: &S,
        dispatcher: &D,
        seed: u32,
    ) -> bool
    where
        S: Scene,
        D: Dispatch,
    {
        if !self.dirty {
            return false;
        }

        let tile_size = self.partition.len();
        let len = (self.tile_count as usize) * (tile_size as usize);

        debug!(
            "Rebuilding light tiles; tiles = {}, tile-size = {}, \
             partition = {:?}",
            self.tile_count, tile_size, self.partition,
        );

        self.samples.clear();
        self.samples.resize(len, Default::default());

        let partition = self.partition;
        let seed = seed ^ Self::SALT;

        dispatcher.dispatch(&mut self.samples, |idx, out| {
            let idx = idx as u32;
            let tile = idx / tile_size;
            let slot = idx % tile_size;
            let kind = partition.kind_of(slot);

            let mut noise = WhiteNoise::new(seed, uvec2(slot, tile));

            *out = Self::sample(lights, scene, kind, &mut noise)
                .unwrap_or_default();
        });

        self.dirty = false;

        true
    }

    fn sample<S>(
        lights: &Lights,
        scene: &S,
        kind: LightKind,
        noise: &mut WhiteNoise,
    ) -> Option<LightTileSample>
    where
        S: Scene,
    {
        let table = lights.table(kind)?;
        let idx = table.sample(noise.sample(), noise.sample());
        let light_id = LightId::new(idx as u32);
        let light = lights.get(kind, light_id)?;
        let mut point = scene.sample_light(light, noise.sample_vec2())?;

        point.pdf *= table.pdf(idx);

        if point.pdf > 0.0 && point.pdf.is_finite() {
            Some(LightTileSample::new(kind, light_id, point))
        } else {
            None
        }
    }

    pub fn view(&self) -> LightTilesView<'_> {
        LightTilesView::new(&self.samples, self.partition, self.screen_size)
    }

    pub fn samples(&self) -> &[LightTileSample] {
        &self.samples
    }

    pub fn partition(&self) -> LightTilePartition {
        self.partition
    }
}
