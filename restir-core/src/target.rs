use crate::Surface;

/// Payload that can be carried by a [`crate::Reservoir`].
pub trait Sample: Copy + Default {
    /// Returns the Jacobian determinant of moving this sample from the
    /// surface it was generated for onto given surface.
    fn jacobian(&self, _surface: &Surface) -> f32 {
        1.0
    }

    /// Re-anchors the sample onto given surface, once it's been picked by a
    /// reservoir that belongs to that surface.
    fn rebase(&mut self, _surface: &Surface) {
        //
    }
}

/// Unnormalized target function `p_hat`, i.e. the (luminance of the)
/// contribution given sample would have at given surface.
pub trait TargetFunction<T> {
    fn target(&self, surface: &Surface, sample: &T) -> f32;
}

impl<T, F> TargetFunction<T> for F
where
    F: Fn(&Surface, &T) -> f32,
{
    fn target(&self, surface: &Surface, sample: &T) -> f32 {
        self(surface, sample)
    }
}

/// Shadow-ray test between a surface and the point a sample refers to.
pub trait VisibilityTest<T> {
    fn is_visible(&self, surface: &Surface, sample: &T) -> bool;
}

impl<T, F> VisibilityTest<T> for F
where
    F: Fn(&Surface, &T) -> bool,
{
    fn is_visible(&self, surface: &Surface, sample: &T) -> bool {
        self(surface, sample)
    }
}

/// Visibility test that never sees occluders.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unoccluded;

impl<T> VisibilityTest<T> for Unoccluded {
    fn is_visible(&self, _: &Surface, _: &T) -> bool {
        true
    }
}
