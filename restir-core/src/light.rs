use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Class of a light source; every class gets its own alias table and its own
/// share of candidates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LightKind {
    /// Emissive triangle of the scene geometry.
    #[default]
    Emissive,

    /// Texel of the environment map.
    Environment,

    /// Point, spot, directional etc. light.
    Analytic,
}

impl LightKind {
    pub const ALL: [Self; 3] =
        [Self::Emissive, Self::Environment, Self::Analytic];

    pub fn to_bits(self) -> u32 {
        match self {
            LightKind::Emissive => 0,
            LightKind::Environment => 1,
            LightKind::Analytic => 2,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(LightKind::Emissive),
            1 => Some(LightKind::Environment),
            2 => Some(LightKind::Analytic),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct LightId(u32);

impl LightId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

/// Point picked on a light by the scene's light sampler, together with the
/// (area or solid angle) probability of picking it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LightPoint {
    pub point: Vec3,
    pub pdf: f32,
}
