use bytemuck::{Pod, Zeroable};
use glam::{UVec2, Vec3};

use crate::{LightId, LightKind, LightPoint, WhiteNoise};

/// Single precomputed light candidate stored inside a light tile.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightTileSample {
    pub point: Vec3,

    /// Probability of this candidate: probability of picking the light from
    /// its class times the probability of picking `point` on the light; zero
    /// marks an empty slot.
    pub pdf: f32,

    pub light_id: LightId,
    pub kind: u32,
}

impl LightTileSample {
    pub fn new(kind: LightKind, light_id: LightId, point: LightPoint) -> Self {
        Self {
            point: point.point,
            pdf: point.pdf,
            light_id,
            kind: kind.to_bits(),
        }
    }

    pub fn is_some(&self) -> bool {
        self.pdf > 0.0
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    pub fn kind(&self) -> LightKind {
        LightKind::from_bits(self.kind).unwrap_or_default()
    }
}

/// Number of slots each light class occupies inside a single tile.
///
/// Slots are laid out class-by-class: emissive first, then environment, then
/// analytic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LightTilePartition {
    pub emissive: u32,
    pub environment: u32,
    pub analytic: u32,
}

impl LightTilePartition {
    /// Splits `tile_size` slots proportionally to the candidate counts, giving
    /// the remainder to analytic lights.
    pub fn new(
        tile_size: u32,
        emissive_candidates: u32,
        environment_candidates: u32,
        analytic_candidates: u32,
    ) -> Self {
        let total =
            emissive_candidates + environment_candidates + analytic_candidates;

        if total == 0 {
            return Default::default();
        }

        let portion = |candidates: u32| {
            ((tile_size as f32) * (candidates as f32) / (total as f32)) as u32
        };

        let emissive = portion(emissive_candidates);
        let environment = portion(environment_candidates);

        Self {
            emissive,
            environment,
            analytic: tile_size - emissive - environment,
        }
    }

    pub fn len(&self) -> u32 {
        self.emissive + self.environment + self.analytic
    }

    /// Returns `(offset, length)` of the slots assigned to given class.
    pub fn range(&self, kind: LightKind) -> (u32, u32) {
        match kind {
            LightKind::Emissive => (0, self.emissive),
            LightKind::Environment => (self.emissive, self.environment),
            LightKind::Analytic => {
                (self.emissive + self.environment, self.analytic)
            }
        }
    }

    /// Returns the class that owns given slot.
    pub fn kind_of(&self, slot: u32) -> LightKind {
        if slot < self.emissive {
            LightKind::Emissive
        } else if slot < self.emissive + self.environment {
            LightKind::Environment
        } else {
            LightKind::Analytic
        }
    }
}

/// Read-only view of the light tiles, as seen by the per-pixel stages.
#[derive(Clone, Copy, Debug)]
pub struct LightTilesView<'a> {
    samples: &'a [LightTileSample],
    tile_size: u32,
    screen_size: u32,
    partition: LightTilePartition,
}

impl<'a> LightTilesView<'a> {
    pub fn new(
        samples: &'a [LightTileSample],
        partition: LightTilePartition,
        screen_size: u32,
    ) -> Self {
        Self {
            samples,
            tile_size: partition.len(),
            screen_size: screen_size.max(1),
            partition,
        }
    }

    pub fn partition(&self) -> LightTilePartition {
        self.partition
    }

    pub fn tile_count(&self) -> u32 {
        if self.tile_size == 0 {
            0
        } else {
            (self.samples.len() as u32) / self.tile_size
        }
    }

    /// Returns the tile assigned to the screen region given pixel belongs to.
    ///
    /// All pixels of a `screen_size x screen_size` region agree on the tile
    /// within a frame, so they read the same (cache-coherent) candidates.
    pub fn tile_for(&self, seed: u32, screen_pos: UVec2) -> Option<u32> {
        let tile_count = self.tile_count();

        if tile_count == 0 {
            return None;
        }

        let region = screen_pos / self.screen_size;

        Some(WhiteNoise::new(seed, region).sample_below(tile_count))
    }

    /// Returns sample at given slot of given tile.
    pub fn get(&self, tile: u32, slot: u32) -> LightTileSample {
        let idx = (tile * self.tile_size + slot) as usize;

        self.samples.get(idx).copied().unwrap_or_default()
    }
}
