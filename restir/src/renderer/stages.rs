use std::f32::consts::PI;

use glam::{vec2, IVec2, UVec2};
use log::{debug, trace};

use crate::utils::measure;
use crate::{
    Capabilities, Config, Dispatch, FrameBuffers, LightTilesView, Lights,
    Scene, SceneView, Screen, WhiteNoise, GOLDEN_ANGLE,
};

/// Identifies a single stage of the frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    LoadSurfaceData,
    InitialCandidates,
    TemporalReuse,
    SpatialReuse,
    DirectSamples,
    Shading,
    GiTracing,
    GiTemporalReuse,
    GiSpatialReuse,
    IndirectShading,
    Decoupled,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::LoadSurfaceData => "load_surface_data",
            StageKind::InitialCandidates => "initial_candidates",
            StageKind::TemporalReuse => "temporal_reuse",
            StageKind::SpatialReuse => "spatial_reuse",
            StageKind::DirectSamples => "direct_samples",
            StageKind::Shading => "shading",
            StageKind::GiTracing => "gi_tracing",
            StageKind::GiTemporalReuse => "gi_temporal_reuse",
            StageKind::GiSpatialReuse => "gi_spatial_reuse",
            StageKind::IndirectShading => "indirect_shading",
            StageKind::Decoupled => "decoupled",
        }
    }
}

/// Everything a stage can read, apart from the frame buffers.
pub struct FrameContext<'a, S, D> {
    pub scene: &'a S,
    pub dispatcher: &'a D,
    pub lights: &'a Lights,
    pub light_tiles: LightTilesView<'a>,
    pub capabilities: Capabilities,
    pub frame: u32,
    pub seed: u32,
}

impl<'a, S, D> FrameContext<'a, S, D>
where
    S: Scene,
    D: Dispatch,
{
    pub fn view(&self) -> SceneView<'a, S> {
        SceneView::new(self.scene, self.lights)
    }

    /// Returns a random number generator unique for given pixel, frame and
    /// stage.
    pub fn noise(&self, salt: u32, screen_pos: UVec2) -> WhiteNoise {
        WhiteNoise::new(self.seed ^ salt, screen_pos)
    }
}

macro_rules! stages {
    ([ $( $name:ident => $class:ident, )* ]) => {
        $( mod $name; )*
        $( pub use self::$name::*; )*

        #[derive(Debug)]
        pub struct Stages {
            $( pub $name: $class, )*
        }

        impl Stages {
            pub fn new(config: &Config) -> Self {
                debug!("Initializing stages");

                Self {
                    $( $name: $class::new(config), )*
                }
            }
        }
    };
}

stages!([
    decoupled => DecoupledStage,
    direct_samples => DirectSamplesStage,
    gi_spatial_reuse => GiSpatialReuseStage,
    gi_temporal_reuse => GiTemporalReuseStage,
    gi_tracing => GiTracingStage,
    indirect_shading => IndirectShadingStage,
    initial_candidates => InitialCandidatesStage,
    load_surface_data => LoadSurfaceDataStage,
    shading => ShadingStage,
    spatial_reuse => SpatialReuseStage,
    temporal_reuse => TemporalReuseStage,
]);

impl Stages {
    pub fn run<S, D>(
        &self,
        kind: StageKind,
        ctx: &FrameContext<'_, S, D>,
        buffers: &mut FrameBuffers,
    ) where
        S: Scene,
        D: Dispatch,
    {
        trace!("Running stage `{}`", kind.name());

        measure(kind.name(), || match kind {
            StageKind::LoadSurfaceData => {
                self.load_surface_data.run(ctx, buffers)
            }
            StageKind::InitialCandidates => {
                self.initial_candidates.run(ctx, buffers)
            }
            StageKind::TemporalReuse => self.temporal_reuse.run(ctx, buffers),
            StageKind::SpatialReuse => self.spatial_reuse.run(ctx, buffers),
            StageKind::DirectSamples => self.direct_samples.run(ctx, buffers),
            StageKind::Shading => self.shading.run(ctx, buffers),
            StageKind::GiTracing => self.gi_tracing.run(ctx, buffers),
            StageKind::GiTemporalReuse => {
                self.gi_temporal_reuse.run(ctx, buffers)
            }
            StageKind::GiSpatialReuse => {
                self.gi_spatial_reuse.run(ctx, buffers)
            }
            StageKind::IndirectShading => {
                self.indirect_shading.run(ctx, buffers)
            }
            StageKind::Decoupled => self.decoupled.run(ctx, buffers),
        });
    }
}

/// Picks up to `count` neighbours of given pixel, spread over a disk along a
/// golden-angle spiral with a random rotation.
///
/// Offsets that land back on the pixel itself are skipped; offsets that land
/// outside of the screen are reflected back inside.
pub(crate) fn neighbours<'a>(
    noise: &'a mut WhiteNoise,
    screen: Screen,
    screen_pos: UVec2,
    count: u32,
    radius: f32,
) -> impl Iterator<Item = UVec2> + 'a {
    let rotation = noise.sample() * 2.0 * PI;

    (0..count).filter_map(move |idx| {
        let angle = rotation + (idx as f32) * GOLDEN_ANGLE;
        let dist = noise.sample().sqrt() * radius;
        let offset = (vec2(angle.cos(), angle.sin()) * dist).round();
        let offset = offset.as_ivec2();

        if offset == IVec2::ZERO {
            return None;
        }

        let neighbour = screen.contain(screen_pos.as_ivec2() + offset);

        (neighbour != screen_pos).then_some(neighbour)
    })
}
