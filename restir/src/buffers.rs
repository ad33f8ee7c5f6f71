mod double_buffered;

use bytemuck::Pod;
use derivative::Derivative;
use glam::Vec3;

pub use self::double_buffered::*;
use crate::{DiReservoir, GiReservoir, Screen, Surface};

/// Direct lighting estimate of a single pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DirectSample {
    pub light_point: Vec3,

    /// Contribution of the light, already weighted by the reservoir's
    /// contribution weight; zero if the light is occluded.
    pub radiance: Vec3,
}

/// Final output of a single pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Shaded {
    pub color: Vec3,
    pub albedo: Vec3,
}

/// Per-pixel buffers the stages read from and write into.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct FrameBuffers {
    pub screen: Screen,

    #[derivative(Debug = "ignore")]
    pub surfaces: DoubleBuffered<Vec<Surface>>,

    #[derivative(Debug = "ignore")]
    pub di_reservoirs: DoubleBuffered<Vec<DiReservoir>>,

    #[derivative(Debug = "ignore")]
    pub direct_samples: Vec<DirectSample>,

    /// Indirect lightning candidates, one per pixel, as returned by the path
    /// tracer
    #[derivative(Debug = "ignore")]
    pub gi_samples: Vec<GiReservoir>,

    /// Output of the indirect temporal reuse, kept for the next frame
    #[derivative(Debug = "ignore")]
    pub gi_temporal: DoubleBuffered<Vec<GiReservoir>>,

    /// Scratch buffer for the indirect spatial reuse iterations
    #[derivative(Debug = "ignore")]
    pub gi_spatial: Vec<GiReservoir>,

    /// Output of the indirect spatial reuse
    #[derivative(Debug = "ignore")]
    pub gi_reservoirs: Vec<GiReservoir>,

    #[derivative(Debug = "ignore")]
    pub output: Vec<Shaded>,

    pub has_gi: bool,
}

impl FrameBuffers {
    pub fn new(screen: Screen, has_gi: bool) -> Self {
        let len = screen.len();
        let gi_len = if has_gi { len } else { 0 };

        Self {
            screen,
            surfaces: DoubleBuffered::with_len(len),
            di_reservoirs: DoubleBuffered::with_len(len),
            direct_samples: vec![Default::default(); len],
            gi_samples: vec![Default::default(); gi_len],
            gi_temporal: DoubleBuffered::with_len(gi_len),
            gi_spatial: vec![Default::default(); gi_len],
            gi_reservoirs: vec![Default::default(); gi_len],
            output: vec![Default::default(); len],
            has_gi,
        }
    }

    /// Forgets about the previous frames.
    pub fn reset_history(&mut self) {
        self.surfaces.clear();
        self.di_reservoirs.clear();
        self.gi_temporal.clear();
    }

    /// Swaps current and previous buffers, making the current frame the
    /// previous one.
    pub fn end_frame(&mut self) {
        self.surfaces.swap();
        self.di_reservoirs.swap();
        self.gi_temporal.swap();
    }
}

/// Views given buffer as raw bytes, e.g. for uploading it somewhere.
pub fn as_bytes<T>(buffer: &[T]) -> &[u8]
where
    T: Pod,
{
    bytemuck::cast_slice(buffer)
}
