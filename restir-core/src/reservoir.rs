mod di;
mod gi;
mod mis;

pub use self::di::*;
pub use self::gi::*;
pub use self::mis::*;
use crate::WhiteNoise;

/// Weighted reservoir: keeps a single sample out of a stream of candidates,
/// with each candidate surviving with probability proportional to its
/// resampling weight.
///
/// Once the stream is over, [`Self::normalize()`] (or one of its variants)
/// turns `w_sum` into `w`, the unbiased contribution weight of `sample`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Reservoir<T> {
    pub sample: T,

    /// Sum of resampling weights of all the candidates seen so far
    pub w_sum: f32,

    /// Number of candidates seen so far (confidence weight)
    pub m: u32,

    /// Contribution weight of `sample`
    pub w: f32,
}

impl<T> Reservoir<T>
where
    T: Copy,
{
    /// Streams a single candidate; returns whether it has replaced the
    /// current sample.
    pub fn update(
        &mut self,
        noise: &mut WhiteNoise,
        sample: T,
        weight: f32,
    ) -> bool {
        self.m += 1;
        self.stream(noise, sample, weight)
    }

    /// Streams a candidate that stands for a whole reservoir; the caller is
    /// responsible for accounting its confidence weight.
    pub(crate) fn stream(
        &mut self,
        noise: &mut WhiteNoise,
        sample: T,
        weight: f32,
    ) -> bool {
        if !(weight > 0.0) || !weight.is_finite() {
            return false;
        }

        self.w_sum += weight;

        if noise.sample() * self.w_sum < weight {
            self.sample = sample;
            true
        } else {
            false
        }
    }

    /// Finalizes resampled importance sampling whose candidates were already
    /// weighted with `1 / M`; `target` is the target function evaluated for
    /// the chosen sample.
    pub fn normalize(&mut self, target: f32) {
        self.w = if target > 0.0 {
            self.w_sum / target
        } else {
            0.0
        };
    }

    /// Finalizes resampled importance sampling, additionally scaling the
    /// contribution weight by `norm_num / norm_denom`.
    pub fn normalize_ex(
        &mut self,
        target: f32,
        norm_num: f32,
        norm_denom: f32,
    ) {
        let denom = target * norm_denom;

        self.w = if denom > 0.0 {
            (self.w_sum * norm_num) / denom
        } else {
            0.0
        };

        if !self.w.is_finite() {
            self.w = 0.0;
        }
    }

    pub fn clamp_m(&mut self, max: u32) {
        self.m = self.m.min(max);
    }

    pub fn is_empty(&self) -> bool {
        self.m == 0
    }

    /// Returns whether this reservoir holds a sample that contributes
    /// anything.
    pub fn is_some(&self) -> bool {
        self.m > 0 && self.w > 0.0
    }
}
