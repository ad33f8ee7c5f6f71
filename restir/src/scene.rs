use glam::{UVec2, Vec2, Vec3};

use crate::{
    DiSample, F32Ext, GiSample, Light, LightPoint, Lights, Surface,
    TargetFunction, Vec3Ext, VisibilityTest, WhiteNoise,
};

/// Everything the renderer needs to know about the scene.
///
/// Implemented by the host; all the methods are called concurrently from
/// many pixels at once.
pub trait Scene: Sync {
    /// Returns the primary surface visible through given pixel.
    fn surface(&self, screen_pos: UVec2) -> Surface;

    /// Returns where given pixel was located during the previous frame, if
    /// it was visible at all.
    fn motion(&self, screen_pos: UVec2) -> Option<UVec2>;

    /// Picks a point on given light; `rnd` is a pair of uniform samples.
    fn sample_light(&self, light: Light<'_>, rnd: Vec2) -> Option<LightPoint>;

    /// Returns the unshadowed contribution of light arriving from `point` on
    /// given light and reflected by given surface towards the camera.
    fn light_radiance(
        &self,
        surface: &Surface,
        light: Light<'_>,
        point: Vec3,
    ) -> Vec3;

    /// Returns whether the segment between two points is unoccluded.
    fn is_visible(&self, from: Vec3, to: Vec3) -> bool;

    fn albedo(&self, surface: &Surface) -> Vec3;

    /// Traces a path starting at given surface, returning its second vertex.
    fn trace_indirect(
        &self,
        surface: &Surface,
        noise: &mut WhiteNoise,
        bounces: u32,
    ) -> Option<GiSample>;

    /// Returns the contribution of given path's radiance reflected by given
    /// surface towards the camera.
    fn indirect_radiance(&self, surface: &Surface, sample: &GiSample) -> Vec3;
}

/// Adapts [`Scene`] to the target functions and visibility tests used by
/// reservoirs.
pub struct SceneView<'a, S> {
    pub scene: &'a S,
    pub lights: &'a Lights,
}

impl<S> Clone for SceneView<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for SceneView<'_, S> {
    //
}

impl<'a, S> SceneView<'a, S>
where
    S: Scene,
{
    pub fn new(scene: &'a S, lights: &'a Lights) -> Self {
        Self { scene, lights }
    }

    /// Returns the unshadowed contribution of given direct lighting sample;
    /// samples pointing at lights that no longer exist contribute nothing.
    pub fn direct_radiance(
        &self,
        surface: &Surface,
        sample: &DiSample,
    ) -> Vec3 {
        if surface.is_none() {
            return Vec3::ZERO;
        }

        self.lights
            .get(sample.kind, sample.light_id)
            .map_or(Vec3::ZERO, |light| {
                self.scene
                    .light_radiance(surface, light, sample.light_point)
            })
    }

    pub fn indirect_radiance(
        &self,
        surface: &Surface,
        sample: &GiSample,
    ) -> Vec3 {
        if surface.is_none() {
            return Vec3::ZERO;
        }

        self.scene.indirect_radiance(surface, sample)
    }
}

impl<'a, S> TargetFunction<DiSample> for SceneView<'a, S>
where
    S: Scene,
{
    fn target(&self, surface: &Surface, sample: &DiSample) -> f32 {
        self.direct_radiance(surface, sample).luma().or_zero()
    }
}

impl<'a, S> VisibilityTest<DiSample> for SceneView<'a, S>
where
    S: Scene,
{
    fn is_visible(&self, surface: &Surface, sample: &DiSample) -> bool {
        self.scene.is_visible(surface.position, sample.light_point)
    }
}

impl<'a, S> TargetFunction<GiSample> for SceneView<'a, S>
where
    S: Scene,
{
    fn target(&self, surface: &Surface, sample: &GiSample) -> f32 {
        self.indirect_radiance(surface, sample).luma().or_zero()
    }
}

impl<'a, S> VisibilityTest<GiSample> for SceneView<'a, S>
where
    S: Scene,
{
    fn is_visible(&self, surface: &Surface, sample: &GiSample) -> bool {
        self.scene.is_visible(surface.position, sample.v2_point)
    }
}
