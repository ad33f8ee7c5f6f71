use std::f32::consts::PI;

use glam::{uvec2, vec3, UVec2, Vec3};

use crate::{Error, Result, Vec3Ext};

/// Triangle of scene geometry that emits light.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EmissiveTriangle {
    pub vertices: [Vec3; 3],

    /// Radiance averaged over the triangle's surface
    pub avg_radiance: Vec3,
}

impl EmissiveTriangle {
    pub fn area(&self) -> f32 {
        let [a, b, c] = self.vertices;

        0.5 * (b - a).cross(c - a).length()
    }

    /// Returns the weight with which this triangle gets picked among all the
    /// emissive triangles.
    pub fn weight(&self) -> f32 {
        self.avg_radiance.luma() * self.area()
    }
}

/// Equirectangular environment map, row-major, with 1, 3 or 4 float
/// channels per texel.
#[derive(Clone, Debug, PartialEq)]
pub struct EnvironmentMap {
    size: UVec2,
    channels: u32,
    texels: Vec<f32>,
}

impl EnvironmentMap {
    pub fn new(size: UVec2, channels: u32, texels: Vec<f32>) -> Result<Self> {
        if !matches!(channels, 1 | 3 | 4) {
            return Err(Error::InvalidEnvironmentMap {
                reason: format!(
                    "unsupported number of channels: {channels} (expected 1, \
                     3 or 4)"
                ),
            });
        }

        let expected_len =
            (size.x as usize) * (size.y as usize) * (channels as usize);

        if texels.len() != expected_len {
            return Err(Error::InvalidEnvironmentMap {
                reason: format!(
                    "got {} values for a {}x{} map with {} channels \
                     (expected {})",
                    texels.len(),
                    size.x,
                    size.y,
                    channels,
                    expected_len,
                ),
            });
        }

        Ok(Self {
            size,
            channels,
            texels,
        })
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn len(&self) -> usize {
        (self.size.x as usize) * (self.size.y as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn idx_to_texel(&self, idx: usize) -> UVec2 {
        let width = self.size.x.max(1) as usize;

        uvec2((idx % width) as u32, (idx / width) as u32)
    }

    /// Returns radiance of given texel; single-channel maps are gray.
    pub fn radiance(&self, texel: UVec2) -> Vec3 {
        let idx = (texel.y as usize) * (self.size.x as usize)
            + (texel.x as usize);

        let channels = self.channels as usize;

        match self.texels.get(idx * channels..(idx + 1) * channels) {
            Some(&[value]) => Vec3::splat(value),
            Some(&[r, g, b]) | Some(&[r, g, b, _]) => vec3(r, g, b),
            _ => Vec3::ZERO,
        }
    }

    /// Returns luminance of all the texels, row-major.
    pub fn luminances(&self) -> Vec<f32> {
        (0..self.len())
            .map(|idx| {
                if self.channels == 1 {
                    self.texels[idx]
                } else {
                    self.radiance(self.idx_to_texel(idx)).luma()
                }
            })
            .collect()
    }

    /// Returns the solid angle covered by texels of given row.
    pub fn solid_angle(&self, row: u32) -> f32 {
        let width = self.size.x as f32;
        let height = self.size.y as f32;

        let theta = ((row as f32 + 0.5) / height) * PI;
        let d_phi = 2.0 * PI / width;
        let d_theta = PI / height;

        d_phi * d_theta * theta.sin()
    }

    /// Returns the direction towards the center of given texel.
    pub fn direction(&self, texel: UVec2) -> Vec3 {
        let u = (texel.x as f32 + 0.5) / (self.size.x as f32);
        let v = (texel.y as f32 + 0.5) / (self.size.y as f32);

        let phi = u * 2.0 * PI;
        let theta = v * PI;

        vec3(theta.sin() * phi.cos(), theta.cos(), theta.sin() * phi.sin())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AnalyticLightKind {
    Point { position: Vec3 },
    Directional { direction: Vec3 },
}

/// Point, directional etc. light that's not a part of the geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyticLight {
    pub kind: AnalyticLightKind,
    pub intensity: Vec3,
}

impl AnalyticLight {
    pub fn point(position: Vec3, intensity: Vec3) -> Self {
        Self {
            kind: AnalyticLightKind::Point { position },
            intensity,
        }
    }

    pub fn directional(direction: Vec3, intensity: Vec3) -> Self {
        Self {
            kind: AnalyticLightKind::Directional { direction },
            intensity,
        }
    }

    pub fn weight(&self) -> f32 {
        self.intensity.luma()
    }
}

/// Light as passed to [`crate::Scene`] for sampling and shading.
#[derive(Clone, Copy, Debug)]
pub enum Light<'a> {
    Emissive(&'a EmissiveTriangle),

    Environment {
        map: &'a EnvironmentMap,
        texel: UVec2,
    },

    Analytic(&'a AnalyticLight),
}
