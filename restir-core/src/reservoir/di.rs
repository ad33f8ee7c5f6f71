use glam::Vec3;

use crate::{LightId, LightKind, LightTileSample, Reservoir, Sample};

/// Reservoir for sampling direct lightning.
pub type DiReservoir = Reservoir<DiSample>;

/// Point on a light source, as picked for a direct lighting estimate.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DiSample {
    pub kind: LightKind,
    pub light_id: LightId,
    pub light_point: Vec3,
}

impl DiSample {
    pub fn from_tile(sample: &LightTileSample) -> Self {
        Self {
            kind: sample.kind(),
            light_id: sample.light_id,
            light_point: sample.point,
        }
    }
}

impl Sample for DiSample {
    //
}
