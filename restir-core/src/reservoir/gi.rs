use glam::Vec3;

use crate::{F32Ext, Reservoir, Sample, Surface};

/// Reservoir for sampling indirect lightning.
pub type GiReservoir = Reservoir<GiSample>;

/// Path sample for indirect lightning: the point seen from the camera
/// (`v1`), the point the path has bounced off of (`v2`) and the radiance
/// reflected from `v2` towards `v1`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GiSample {
    /// Probability with which the path tracer has generated this path
    pub pdf: f32,
    pub radiance: Vec3,
    pub v1_point: Vec3,
    pub v2_point: Vec3,
    pub v2_normal: Vec3,
}

impl GiSample {
    pub fn direction(&self, point: Vec3) -> Vec3 {
        (self.v2_point - point).normalize_or_zero()
    }

    /// Returns the cosine between given surface's normal and the direction
    /// towards `v2`.
    pub fn cosine(&self, surface: &Surface) -> f32 {
        self.direction(surface.position)
            .dot(surface.normal)
            .max(0.0)
    }

    fn partial_jacobian(&self, point: Vec3) -> (f32, f32) {
        let vec = point - self.v2_point;
        let distance = vec.length();

        let cosine = if distance > 0.0 {
            self.v2_normal.dot(vec / distance).saturate()
        } else {
            0.0
        };

        (distance, cosine)
    }
}

impl Sample for GiSample {
    fn jacobian(&self, surface: &Surface) -> f32 {
        let (new_distance, new_cosine) =
            self.partial_jacobian(surface.position);

        let (orig_distance, orig_cosine) =
            self.partial_jacobian(self.v1_point);

        let x = new_cosine * orig_distance * orig_distance;
        let y = orig_cosine * new_distance * new_distance;

        if y == 0.0 {
            0.0
        } else {
            (x / y).or_zero()
        }
    }

    fn rebase(&mut self, surface: &Surface) {
        self.v1_point = surface.position;
    }
}
