use glam::{vec3, UVec2, Vec2, Vec3};

use crate::{
    AnalyticLightKind, GiSample, Light, LightPoint, Scene, Surface, WhiteNoise,
};

/// Flat, infinite floor lying at `y = 0`, where pixel `(x, y)` sees the point
/// `(x, 0, y)`.
#[derive(Clone, Debug)]
pub struct TestScene {
    pub depth: f32,
    pub normal: Vec3,
    pub albedo: Vec3,

    /// Whether shadow rays always pass (or always fail)
    pub visible: bool,

    /// Whether every pixel reprojects onto itself (or onto nothing)
    pub static_camera: bool,

    /// Radiance gathered by each bounce of the indirect paths; `None` makes
    /// all of them escape
    pub indirect: Option<Vec3>,
}

impl Default for TestScene {
    fn default() -> Self {
        Self {
            depth: 1.0,
            normal: Vec3::Y,
            albedo: Vec3::splat(0.5),
            visible: true,
            static_camera: true,
            indirect: Some(Vec3::splat(0.5)),
        }
    }
}

impl Scene for TestScene {
    fn surface(&self, screen_pos: UVec2) -> Surface {
        Surface {
            position: vec3(screen_pos.x as f32, 0.0, screen_pos.y as f32),
            depth: self.depth,
            normal: self.normal,
            material_id: 0,
        }
    }

    fn motion(&self, screen_pos: UVec2) -> Option<UVec2> {
        self.static_camera.then_some(screen_pos)
    }

    fn sample_light(&self, light: Light<'_>, rnd: Vec2) -> Option<LightPoint> {
        match light {
            Light::Emissive(triangle) => {
                let [a, b, c] = triangle.vertices;
                let area = triangle.area();

                if area <= 0.0 {
                    return None;
                }

                let su = rnd.x.sqrt();
                let u = 1.0 - su;
                let v = rnd.y * su;

                Some(LightPoint {
                    point: a * u + b * v + c * (1.0 - u - v),
                    pdf: 1.0 / area,
                })
            }

            Light::Environment { map, texel } => Some(LightPoint {
                point: map.direction(texel) * 1000.0,
                pdf: 1.0 / map.solid_angle(texel.y),
            }),

            Light::Analytic(light) => match light.kind {
                AnalyticLightKind::Point { position } => Some(LightPoint {
                    point: position,
                    pdf: 1.0,
                }),

                AnalyticLightKind::Directional { direction } => {
                    Some(LightPoint {
                        point: -direction.normalize_or_zero() * 1000.0,
                        pdf: 1.0,
                    })
                }
            },
        }
    }

    fn light_radiance(
        &self,
        surface: &Surface,
        light: Light<'_>,
        point: Vec3,
    ) -> Vec3 {
        let dir = point - surface.position;
        let cosine = surface.normal.dot(dir.normalize_or_zero()).max(0.0);

        let radiance = match light {
            Light::Emissive(triangle) => triangle.avg_radiance,
            Light::Environment { map, texel } => map.radiance(texel),

            Light::Analytic(light) => match light.kind {
                AnalyticLightKind::Point { .. } => {
                    light.intensity / dir.length_squared().max(1e-4)
                }
                AnalyticLightKind::Directional { .. } => light.intensity,
            },
        };

        radiance * cosine * self.albedo
    }

    fn is_visible(&self, _: Vec3, _: Vec3) -> bool {
        self.visible
    }

    fn albedo(&self, _: &Surface) -> Vec3 {
        self.albedo
    }

    fn trace_indirect(
        &self,
        surface: &Surface,
        noise: &mut WhiteNoise,
        bounces: u32,
    ) -> Option<GiSample> {
        let radiance = self.indirect? * (bounces as f32);
        let offset = noise.sample_vec2() - 0.5;

        Some(GiSample {
            pdf: 1.0,
            radiance,
            v1_point: surface.position,
            v2_point: surface.position + vec3(offset.x, 2.0, offset.y),
            v2_normal: -Vec3::Y,
        })
    }

    fn indirect_radiance(&self, surface: &Surface, sample: &GiSample) -> Vec3 {
        sample.radiance * sample.cosine(surface) * self.albedo
    }
}
