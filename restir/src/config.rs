use log::warn;

use crate::{BiasCorrection, Error, Result, StageKind};

/// Which resampling stages run each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Initial candidates only.
    NoResampling,

    /// Initial candidates followed by spatial reuse.
    SpatialOnly,

    /// Initial candidates followed by temporal reuse.
    TemporalOnly,

    /// Initial candidates followed by temporal and spatial reuse.
    #[default]
    Spatiotemporal,

    /// Initial candidates, temporal and spatial reuse fused into a single
    /// per-pixel pass that reads only the previous frame's reservoirs.
    Decoupled,

    /// Spatiotemporal direct lighting plus resampled indirect lighting.
    ReStirGi,
}

impl Mode {
    /// Returns the stages this mode runs, in order.
    pub fn stages(self) -> &'static [StageKind] {
        use StageKind::*;

        match self {
            Mode::NoResampling => {
                &[LoadSurfaceData, InitialCandidates, DirectSamples, Shading]
            }

            Mode::SpatialOnly => &[
                LoadSurfaceData,
                InitialCandidates,
                SpatialReuse,
                DirectSamples,
                Shading,
            ],

            Mode::TemporalOnly => &[
                LoadSurfaceData,
                InitialCandidates,
                TemporalReuse,
                DirectSamples,
                Shading,
            ],

            Mode::Spatiotemporal => &[
                LoadSurfaceData,
                InitialCandidates,
                TemporalReuse,
                SpatialReuse,
                DirectSamples,
                Shading,
            ],

            Mode::Decoupled => &[Decoupled],

            Mode::ReStirGi => &[
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
            ],
        }
    }

    pub fn needs_indirect_lightning(self) -> bool {
        matches!(self, Mode::ReStirGi)
    }
}

/// Features of the host that some configurations depend on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Whether the host can trace shadow rays
    pub ray_queries: bool,

    /// Whether the host can trace indirect paths
    pub path_tracing: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            ray_queries: true,
            path_tracing: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    RayQueries,
    PathTracing,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    pub mode: Mode,
    pub bias_correction: BiasCorrection,

    /// Number of initial candidates drawn from emissive geometry
    pub emissive_light_candidate_count: u32,

    /// Number of initial candidates drawn from the environment map
    pub environment_light_candidate_count: u32,

    /// Number of initial candidates drawn from analytic lights
    pub analytic_light_candidate_count: u32,

    /// Whether the sample picked out of the initial candidates gets its
    /// visibility tested (occluded samples get discarded)
    pub test_initial_sample_visibility: bool,

    /// Confidence cap for direct lighting reservoirs
    pub temporal_history_length: u32,

    pub spatial_iteration_count: u32,
    pub spatial_reuse_sample_count: u32,

    /// Radius, in pixels, of the disk neighbours are picked from
    pub spatial_reuse_sample_radius: f32,

    /// Distance, in pixels, above which samples reused from neighbours get
    /// their visibility tested; used by [`Mode::Decoupled`]
    pub spatial_visibility_threshold: f32,

    pub depth_threshold: f32,
    pub normal_threshold: f32,

    /// Whether only half of the pixels (in a checkerboard pattern) generate
    /// initial candidates each frame
    pub use_checkerboarding: bool,

    pub light_tile_count: u32,
    pub light_tile_size: u32,

    /// Size, in pixels, of the square screen region sharing a light tile
    pub light_tile_screen_size: u32,

    pub gi_bounces: u32,
    pub gi_temporal_m_cap: u32,
    pub gi_spatial_m_cap: u32,
    pub gi_spatial_iteration_count: u32,
    pub gi_spatial_reuse_sample_count: u32,
    pub gi_depth_threshold: f32,
    pub gi_normal_threshold: f32,

    /// Whether the output contains indirect lightning only
    pub gi_indirect_only: bool,

    /// Seed for the per-frame random numbers
    pub seed: u64,
}

impl Config {
    pub const CANDIDATE_COUNT: (u32, u32) = (0, 256);
    pub const TEMPORAL_HISTORY_LENGTH: (u32, u32) = (1, 40);
    pub const SPATIAL_ITERATION_COUNT: (u32, u32) = (0, 5);
    pub const SPATIAL_REUSE_SAMPLE_COUNT: (u32, u32) = (1, 20);
    pub const SPATIAL_REUSE_SAMPLE_RADIUS: (f32, f32) = (0.0, 60.0);
    pub const LIGHT_TILE_COUNT: (u32, u32) = (1, 1024);
    pub const LIGHT_TILE_SIZE: (u32, u32) = (128, 8096);
    pub const LIGHT_TILE_SCREEN_SIZE: (u32, u32) = (1, 128);
    pub const GI_BOUNCES: (u32, u32) = (1, 10);
    pub const GI_TEMPORAL_M_CAP: (u32, u32) = (1, 100);
    pub const GI_SPATIAL_M_CAP: (u32, u32) = (1, 1000);
    pub const GI_SPATIAL_ITERATION_COUNT: (u32, u32) = (1, 5);
    pub const GI_SPATIAL_REUSE_SAMPLE_COUNT: (u32, u32) = (1, 50);

    /// Clamps all the values into their supported ranges, logging what's been
    /// changed.
    pub fn sanitize(&mut self) {
        fn clamp<T>(name: &str, value: &mut T, (min, max): (T, T))
        where
            T: Copy + PartialOrd + std::fmt::Display,
        {
            let clamped = if *value < min {
                min
            } else if *value > max {
                max
            } else {
                *value
            };

            if clamped != *value {
                warn!(
                    "{name} = {value} is out of range <{min}, {max}>; \
                     clamping to {clamped}",
                );

                *value = clamped;
            }
        }

        clamp(
            "emissive_light_candidate_count",
            &mut self.emissive_light_candidate_count,
            Self::CANDIDATE_COUNT,
        );

        clamp(
            "environment_light_candidate_count",
            &mut self.environment_light_candidate_count,
            Self::CANDIDATE_COUNT,
        );

        clamp(
            "analytic_light_candidate_count",
            &mut self.analytic_light_candidate_count,
            Self::CANDIDATE_COUNT,
        );

        clamp(
            "temporal_history_length",
            &mut self.temporal_history_length,
            Self::TEMPORAL_HISTORY_LENGTH,
        );

        clamp(
            "spatial_iteration_count",
            &mut self.spatial_iteration_count,
            Self::SPATIAL_ITERATION_COUNT,
        );

        clamp(
            "spatial_reuse_sample_count",
            &mut self.spatial_reuse_sample_count,
            Self::SPATIAL_REUSE_SAMPLE_COUNT,
        );

        clamp(
            "spatial_reuse_sample_radius",
            &mut self.spatial_reuse_sample_radius,
            Self::SPATIAL_REUSE_SAMPLE_RADIUS,
        );

        clamp(
            "spatial_visibility_threshold",
            &mut self.spatial_visibility_threshold,
            (0.0, self.spatial_reuse_sample_radius),
        );

        clamp(
            "depth_threshold",
            &mut self.depth_threshold,
            (0.0, 1.0),
        );

        clamp(
            "normal_threshold",
            &mut self.normal_threshold,
            (0.0, 1.0),
        );

        clamp(
            "light_tile_count",
            &mut self.light_tile_count,
            Self::LIGHT_TILE_COUNT,
        );

        clamp(
            "light_tile_size",
            &mut self.light_tile_size,
            Self::LIGHT_TILE_SIZE,
        );

        clamp(
            "light_tile_screen_size",
            &mut self.light_tile_screen_size,
            Self::LIGHT_TILE_SCREEN_SIZE,
        );

        if !self.light_tile_screen_size.is_power_of_two() {
            let size = self.light_tile_screen_size.next_power_of_two();

            warn!(
                "light_tile_screen_size = {} is not a power of two; \
                 rounding up to {size}",
                self.light_tile_screen_size,
            );

            self.light_tile_screen_size = size;
        }

        clamp("gi_bounces", &mut self.gi_bounces, Self::GI_BOUNCES);

        clamp(
            "gi_temporal_m_cap",
            &mut self.gi_temporal_m_cap,
            Self::GI_TEMPORAL_M_CAP,
        );

        clamp(
            "gi_spatial_m_cap",
            &mut self.gi_spatial_m_cap,
            Self::GI_SPATIAL_M_CAP,
        );

        clamp(
            "gi_spatial_iteration_count",
            &mut self.gi_spatial_iteration_count,
            Self::GI_SPATIAL_ITERATION_COUNT,
        );

        clamp(
            "gi_spatial_reuse_sample_count",
            &mut self.gi_spatial_reuse_sample_count,
            Self::GI_SPATIAL_REUSE_SAMPLE_COUNT,
        );

        clamp(
            "gi_depth_threshold",
            &mut self.gi_depth_threshold,
            (0.0, 1.0),
        );

        clamp(
            "gi_normal_threshold",
            &mut self.gi_normal_threshold,
            (0.0, 1.0),
        );
    }

    /// Checks whether the host is able to run this configuration.
    pub fn validate(&self, capabilities: &Capabilities) -> Result<()> {
        let needs_ray_queries = self.test_initial_sample_visibility
            || self.bias_correction == BiasCorrection::RayTraced
            || self.mode == Mode::Decoupled;

        if needs_ray_queries && !capabilities.ray_queries {
            return Err(Error::MissingCapability {
                capability: Capability::RayQueries,
            });
        }

        if self.mode.needs_indirect_lightning() && !capabilities.path_tracing {
            return Err(Error::MissingCapability {
                capability: Capability::PathTracing,
            });
        }

        Ok(())
    }

    /// Returns whether switching from `self` to `other` requires rebuilding
    /// the light tiles.
    pub fn is_invalidated_by(&self, other: &Self) -> bool {
        self.light_tile_count != other.light_tile_count
            || self.light_tile_size != other.light_tile_size
            || self.light_tile_screen_size != other.light_tile_screen_size
            || self.emissive_light_candidate_count
                != other.emissive_light_candidate_count
            || self.environment_light_candidate_count
                != other.environment_light_candidate_count
            || self.analytic_light_candidate_count
                != other.analytic_light_candidate_count
    }

    pub fn describe(&self) -> String {
        format!(
            "mode={:?}, bias_correction={:?}, candidates={}/{}/{}, \
             light_tiles={}x{}",
            self.mode,
            self.bias_correction,
            self.emissive_light_candidate_count,
            self.environment_light_candidate_count,
            self.analytic_light_candidate_count,
            self.light_tile_count,
            self.light_tile_size,
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: Default::default(),
            bias_correction: Default::default(),
            emissive_light_candidate_count: 32,
            environment_light_candidate_count: 0,
            analytic_light_candidate_count: 0,
            test_initial_sample_visibility: true,
            temporal_history_length: 20,
            spatial_iteration_count: 1,
            spatial_reuse_sample_count: 1,
            spatial_reuse_sample_radius: 30.0,
            spatial_visibility_threshold: 0.0,
            depth_threshold: 0.1,
            normal_threshold: 0.5,
            use_checkerboarding: false,
            light_tile_count: 128,
            light_tile_size: 1024,
            light_tile_screen_size: 8,
            gi_bounces: 1,
            gi_temporal_m_cap: 20,
            gi_spatial_m_cap: 500,
            gi_spatial_iteration_count: 1,
            gi_spatial_reuse_sample_count: 5,
            gi_depth_threshold: 0.1,
            gi_normal_threshold: 0.5,
            gi_indirect_only: false,
            seed: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize() {
        let mut target = Config {
            emissive_light_candidate_count: 1000,
            temporal_history_length: 0,
            spatial_reuse_sample_radius: 100.0,
            spatial_visibility_threshold: 80.0,
            light_tile_screen_size: 12,
            gi_bounces: 0,
            depth_threshold: -1.0,
            ..Default::default()
        };

        target.sanitize();

        assert_eq!(256, target.emissive_light_candidate_count);
        assert_eq!(1, target.temporal_history_length);
        assert_eq!(60.0, target.spatial_reuse_sample_radius);
        assert_eq!(60.0, target.spatial_visibility_threshold);
        assert_eq!(16, target.light_tile_screen_size);
        assert_eq!(1, target.gi_bounces);
        assert_eq!(0.0, target.depth_threshold);

        let mut config = Config::default();

        config.sanitize();

        assert_eq!(Config::default(), config);
    }

    #[test]
    fn validate() {
        let no_rays = Capabilities {
            ray_queries: false,
            path_tracing: true,
        };

        let no_paths = Capabilities {
            ray_queries: true,
            path_tracing: false,
        };

        assert!(Config::default().validate(&Default::default()).is_ok());

        assert!(matches!(
            Config::default().validate(&no_rays),
            Err(Error::MissingCapability {
                capability: Capability::RayQueries
            })
        ));

        let config = Config {
            test_initial_sample_visibility: false,
            ..Default::default()
        };

        assert!(config.validate(&no_rays).is_ok());

        let config = Config {
            mode: Mode::ReStirGi,
            ..Default::default()
        };

        assert!(matches!(
            config.validate(&no_paths),
            Err(Error::MissingCapability {
                capability: Capability::PathTracing
            })
        ));
    }

    #[test]
    fn stages() {
        use StageKind::*;

        assert_eq!(
            &[LoadSurfaceData, InitialCandidates, DirectSamples, Shading],
            Mode::NoResampling.stages(),
        );

        assert_eq!(
            &[
                LoadSurfaceData,
                InitialCandidates,
                TemporalReuse,
                SpatialReuse,
                DirectSamples,
                Shading
            ],
            Mode::Spatiotemporal.stages(),
        );

        assert_eq!(&[Decoupled], Mode::Decoupled.stages());
        assert_eq!(10, Mode::ReStirGi.stages().len());
    }

    #[test]
    fn is_invalidated_by() {
        let a = Config::default();

        let b = Config {
            mode: Mode::TemporalOnly,
            bias_correction: BiasCorrection::Mis,
            ..a
        };

        let c = Config {
            light_tile_size: 512,
            ..a
        };

        assert!(!a.is_invalidated_by(&b));
        assert!(a.is_invalidated_by(&c));
    }
}
