use glam::{vec2, UVec2, Vec2};

/// Per-pixel stream of uniform random numbers (PCG hash).
///
/// Each stage seeds its own stream from the frame seed, a stage salt and the
/// pixel position, so the numbers a pixel sees in one stage do not depend on
/// which other stages ran before it.
#[derive(Clone, Copy, Debug)]
pub struct WhiteNoise {
    state: u32,
}

impl WhiteNoise {
    pub fn new(seed: u32, id: UVec2) -> Self {
        Self {
            state: seed
                ^ 48619u32.wrapping_mul(id.x)
                ^ 95461u32.wrapping_mul(id.y),
        }
    }

    /// Generates a uniform sample in range `<0.0, 1.0)`.
    pub fn sample(&mut self) -> f32 {
        ((self.sample_int() >> 8) as f32) / ((1u32 << 24) as f32)
    }

    /// Generates a uniform sample in range `<0, u32::MAX>`.
    pub fn sample_int(&mut self) -> u32 {
        self.state = self
            .state
            .wrapping_mul(747796405)
            .wrapping_add(2891336453);

        let word = ((self.state >> ((self.state >> 28) + 4)) ^ self.state)
            .wrapping_mul(277803737);

        (word >> 22) ^ word
    }

    /// Generates a uniform sample in range `<0, len)`; `len` must not be zero.
    pub fn sample_below(&mut self, len: u32) -> u32 {
        self.sample_int() % len
    }

    /// Generates a pair of uniform samples.
    pub fn sample_vec2(&mut self) -> Vec2 {
        vec2(self.sample(), self.sample())
    }
}
