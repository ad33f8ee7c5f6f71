use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// Primary-ray hit as seen by a single pixel.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Surface {
    pub position: Vec3,

    /// Distance from the camera; zero (or less) means the pixel sees the sky.
    pub depth: f32,

    pub normal: Vec3,
    pub material_id: u32,
}

impl Surface {
    pub fn is_some(&self) -> bool {
        self.depth > 0.0
    }

    pub fn is_none(&self) -> bool {
        !self.is_some()
    }

    /// Returns whether a reservoir computed for `other` may be reused for this
    /// surface.
    pub fn is_compatible_with(
        &self,
        other: &Self,
        depth_threshold: f32,
        normal_threshold: f32,
    ) -> bool {
        self.is_some()
            && other.is_some()
            && (self.depth - other.depth).abs() <= depth_threshold
            && self.normal.dot(other.normal) >= normal_threshold
    }
}
