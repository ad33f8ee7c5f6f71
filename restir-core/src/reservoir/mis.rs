use crate::{
    F32Ext, Reservoir, Sample, Surface, TargetFunction, VisibilityTest,
    WhiteNoise,
};

/// Determines how the contribution weight of a merged reservoir gets
/// normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BiasCorrection {
    /// `1 / M` normalization; cheapest, but biased (darkens) near geometry
    /// and shadow discontinuities.
    #[default]
    Off,

    /// `1 / Z` normalization, where `Z` counts only those candidates whose
    /// surfaces could have produced the chosen sample.
    Naive,

    /// Balance-heuristic MIS weights.
    Mis,

    /// Balance-heuristic MIS weights where target functions of the
    /// neighbours are additionally multiplied by visibility.
    RayTraced,
}

impl BiasCorrection {
    pub const ALL: [Self; 4] =
        [Self::Off, Self::Naive, Self::Mis, Self::RayTraced];
}

/// Single reservoir taking part in a merge, together with the surface it was
/// computed for.
#[derive(Clone, Copy, Debug)]
struct Contributor<T> {
    surface: Surface,
    reservoir: Reservoir<T>,
}

/// Merges a canonical reservoir (the one that belongs to the pixel being
/// shaded) with any number of reservoirs reused from other pixels or from
/// the previous frame.
///
/// All the incoming reservoirs have their confidence weights clamped to `cap`
/// before they are weighted and the merged confidence weight is clamped again
/// before it's returned.
#[derive(Clone, Debug)]
pub struct Resampler<T> {
    canonical: Surface,
    contributors: Vec<Contributor<T>>,
    cap: u32,
}

impl<T> Resampler<T>
where
    T: Sample,
{
    pub fn new(surface: Surface, reservoir: Reservoir<T>, cap: u32) -> Self {
        let mut this = Self {
            canonical: surface,
            contributors: Vec::with_capacity(8),
            cap,
        };

        // The canonical reservoir always takes part, even when empty, so
        // that it's always the first contributor
        this.contributors.push(Contributor {
            surface,
            reservoir: this.clamped(reservoir),
        });

        this
    }

    /// Adds a reservoir computed for given surface; empty reservoirs are
    /// ignored, in which case `false` is returned.
    pub fn add(&mut self, surface: Surface, reservoir: Reservoir<T>) -> bool {
        if reservoir.is_empty() {
            return false;
        }

        let reservoir = self.clamped(reservoir);

        self.contributors.push(Contributor { surface, reservoir });

        true
    }

    pub fn with(mut self, surface: Surface, reservoir: Reservoir<T>) -> Self {
        self.add(surface, reservoir);
        self
    }

    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    fn clamped(&self, mut reservoir: Reservoir<T>) -> Reservoir<T> {
        reservoir.clamp_m(self.cap);
        reservoir
    }

    /// Returns the (visibility-adjusted, for `RayTraced`) target function of
    /// given contributor.
    fn target_at(
        &self,
        target: &impl TargetFunction<T>,
        visibility: &impl VisibilityTest<T>,
        bias: BiasCorrection,
        surface: &Surface,
        sample: &T,
    ) -> f32 {
        let p = target.target(surface, sample).or_zero();

        if bias == BiasCorrection::RayTraced
            && p > 0.0
            && !visibility.is_visible(surface, sample)
        {
            0.0
        } else {
            p
        }
    }

    /// Returns the balance-heuristic weight of `idx`-th contributor's sample.
    fn mis_weight(
        &self,
        target: &impl TargetFunction<T>,
        visibility: &impl VisibilityTest<T>,
        bias: BiasCorrection,
        idx: usize,
    ) -> f32 {
        let sample = &self.contributors[idx].reservoir.sample;
        let mut num = 0.0;
        let mut denom = 0.0;

        for (jdx, contributor) in self.contributors.iter().enumerate() {
            let p = contributor.reservoir.m as f32
                * self.target_at(
                    target,
                    visibility,
                    bias,
                    &contributor.surface,
                    sample,
                );

            if jdx == idx {
                num = p;
            }

            denom += p;
        }

        if denom > 0.0 {
            num / denom
        } else {
            0.0
        }
    }

    /// Performs the merge.
    ///
    /// `visibility` is only consulted for [`BiasCorrection::RayTraced`].
    pub fn resample(
        &self,
        noise: &mut WhiteNoise,
        target: &impl TargetFunction<T>,
        visibility: &impl VisibilityTest<T>,
        bias: BiasCorrection,
    ) -> Reservoir<T> {
        self.resample_ex(noise, target, visibility, bias).0
    }

    /// Performs the merge, returning also the index of contributor whose
    /// sample got picked (in the order of [`Self::add()`] calls, with the
    /// canonical reservoir being zeroth).
    pub fn resample_ex(
        &self,
        noise: &mut WhiteNoise,
        target: &impl TargetFunction<T>,
        visibility: &impl VisibilityTest<T>,
        bias: BiasCorrection,
    ) -> (Reservoir<T>, Option<usize>) {
        let uses_mis =
            matches!(bias, BiasCorrection::Mis | BiasCorrection::RayTraced);

        let mut out = Reservoir::default();
        let mut total_m = 0;
        let mut picked = None;

        for (idx, contributor) in self.contributors.iter().enumerate() {
            let reservoir = &contributor.reservoir;

            total_m += reservoir.m;

            if !reservoir.is_some() {
                continue;
            }

            let jacobian = reservoir.sample.jacobian(&self.canonical);

            if !(jacobian > 0.0) {
                continue;
            }

            let mis = if uses_mis {
                self.mis_weight(target, visibility, bias, idx)
            } else {
                reservoir.m as f32
            };

            let p_c = target
                .target(&self.canonical, &reservoir.sample)
                .or_zero();

            if out.stream(
                noise,
                reservoir.sample,
                mis * p_c * reservoir.w * jacobian,
            ) {
                picked = Some(idx);
            }
        }

        if out.w_sum > 0.0 {
            let p_c = target.target(&self.canonical, &out.sample).or_zero();

            match bias {
                BiasCorrection::Off => {
                    out.normalize_ex(p_c, 1.0, total_m as f32);
                }

                BiasCorrection::Naive => {
                    let z: u32 = self
                        .contributors
                        .iter()
                        .filter(|contributor| {
                            target
                                .target(&contributor.surface, &out.sample)
                                .or_zero()
                                > 0.0
                        })
                        .map(|contributor| contributor.reservoir.m)
                        .sum();

                    out.normalize_ex(p_c, 1.0, z as f32);
                }

                BiasCorrection::Mis | BiasCorrection::RayTraced => {
                    out.normalize(p_c);
                }
            }

            out.sample.rebase(&self.canonical);
        }

        out.m = total_m;
        out.clamp_m(self.cap);

        if out.w_sum > 0.0 {
            (out, picked)
        } else {
            (out, None)
        }
    }

    /// Merges two reservoirs, `lhs` being the canonical one.
    pub fn combine(
        noise: &mut WhiteNoise,
        lhs: (Surface, Reservoir<T>),
        rhs: (Surface, Reservoir<T>),
        target: &impl TargetFunction<T>,
        visibility: &impl VisibilityTest<T>,
        bias: BiasCorrection,
        cap: u32,
    ) -> Reservoir<T> {
        Self::new(lhs.0, lhs.1, cap)
            .with(rhs.0, rhs.1)
            .resample(noise, target, visibility, bias)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::uvec2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::Unoccluded;

    #[derive(Clone, Copy, Debug, Default, PartialEq)]
    struct Light(usize);

    impl Sample for Light {
        //
    }

    fn surface(id: u32) -> Surface {
        Surface {
            depth: 1.0,
            material_id: id,
            ..Default::default()
        }
    }

    /// Builds a reservoir out of a single candidate picked uniformly out of
    /// two lights, the way initial candidates are generated.
    fn initial(
        noise: &mut WhiteNoise,
        target: [f32; 2],
        visible: [bool; 2],
    ) -> Reservoir<Light> {
        let light = noise.sample_below(2) as usize;
        let mut reservoir = Reservoir::default();

        reservoir.update(noise, Light(light), target[light] / 0.5);
        reservoir.normalize(target[reservoir.sample.0]);

        if !visible[reservoir.sample.0] {
            reservoir.w = 0.0;
        }

        reservoir
    }

    /// Estimates the integral of the canonical target function (which is 2.0
    /// in all of the scenarios below) through a two-pixel merge.
    fn estimate(
        bias: BiasCorrection,
        lhs_target: [f32; 2],
        rhs_target: [f32; 2],
        rhs_visible: [bool; 2],
    ) -> f32 {
        let mut noise = WhiteNoise::new(0xdeadbeef, uvec2(1, 1));
        let trials = 200_000;

        let targets = [lhs_target, rhs_target];

        let target = |surface: &Surface, light: &Light| {
            targets[surface.material_id as usize][light.0]
        };

        let visibility = |surface: &Surface, light: &Light| {
            surface.material_id == 0 || rhs_visible[light.0]
        };

        let mut sum = 0.0;

        for _ in 0..trials {
            let lhs = initial(&mut noise, lhs_target, [true; 2]);
            let rhs = initial(&mut noise, rhs_target, rhs_visible);

            let out = Resampler::combine(
                &mut noise,
                (surface(0), lhs),
                (surface(1), rhs),
                &target,
                &visibility,
                bias,
                20,
            );

            sum += lhs_target[out.sample.0] * out.w;
        }

        sum / (trials as f32)
    }

    #[test]
    fn off_is_biased_on_discontinuities() {
        let actual = estimate(
            BiasCorrection::Off,
            [1.0, 1.0],
            [1.0, 0.0],
            [true; 2],
        );

        assert_relative_eq!(1.5, actual, epsilon = 0.03);
    }

    #[test]
    fn unbiased_on_discontinuities() {
        for bias in [
            BiasCorrection::Naive,
            BiasCorrection::Mis,
            BiasCorrection::RayTraced,
        ] {
            let actual = estimate(bias, [1.0, 1.0], [1.0, 0.0], [true; 2]);

            assert!((actual - 2.0).abs() < 0.03, "{bias:?}: {actual}");
        }
    }

    #[test]
    fn ray_traced_accounts_for_occlusion() {
        let mis = estimate(
            BiasCorrection::Mis,
            [1.0, 1.0],
            [1.0, 1.0],
            [true, false],
        );

        let ray_traced = estimate(
            BiasCorrection::RayTraced,
            [1.0, 1.0],
            [1.0, 1.0],
            [true, false],
        );

        assert_relative_eq!(1.5, mis, epsilon = 0.03);
        assert_relative_eq!(2.0, ray_traced, epsilon = 0.03);
    }

    #[test]
    fn order_of_neighbours_does_not_matter() {
        let target = |_: &Surface, _: &Light| 1.0;
        let mut noise = WhiteNoise::new(1234, uvec2(0, 0));

        let canonical = Reservoir {
            sample: Light(0),
            w_sum: 0.0,
            m: 1,
            w: 0.0,
        };

        let b = Reservoir {
            sample: Light(1),
            w_sum: 1.0,
            m: 1,
            w: 1.0,
        };

        let c = Reservoir {
            sample: Light(2),
            w_sum: 3.0,
            m: 1,
            w: 3.0,
        };

        for order in [[b, c], [c, b]] {
            let draws = 100_000;
            let mut hits = [0; 3];

            for _ in 0..draws {
                let out = Resampler::new(surface(0), canonical, 20)
                    .with(surface(1), order[0])
                    .with(surface(2), order[1])
                    .resample(
                        &mut noise,
                        &target,
                        &Unoccluded,
                        BiasCorrection::Off,
                    );

                assert_eq!(3, out.m);

                hits[out.sample.0] += 1;
            }

            let freq = (hits[2] as f32) / (draws as f32);

            assert_eq!(0, hits[0]);
            assert!((freq - 0.75).abs() < 0.01, "freq = {freq}");
        }
    }

    #[test]
    fn m_never_exceeds_cap() {
        let mut rng = StdRng::seed_from_u64(1234);
        let mut noise = WhiteNoise::new(1, uvec2(0, 0));
        let target = |_: &Surface, light: &Light| (light.0 + 1) as f32;

        let mut curr = Reservoir {
            sample: Light(0),
            w_sum: 1.0,
            m: 1,
            w: 1.0,
        };

        for _ in 0..1000 {
            let cap = rng.gen_range(1..=40);
            let bias = BiasCorrection::ALL[rng.gen_range(0..4)];

            let incoming = Reservoir {
                sample: Light(rng.gen_range(0..4)),
                w_sum: 0.0,
                m: rng.gen_range(0..100),
                w: rng.gen_range(0.0..10.0),
            };

            let expected_m = (curr.m.min(cap) + incoming.m.min(cap)).min(cap);

            curr = Resampler::combine(
                &mut noise,
                (surface(0), curr),
                (surface(1), incoming),
                &target,
                &Unoccluded,
                bias,
                cap,
            );

            assert_eq!(expected_m, curr.m);
            assert!(curr.w.is_finite() && curr.w >= 0.0);
        }
    }

    #[test]
    fn clamping_keeps_contribution_weight() {
        let mut noise = WhiteNoise::new(1, uvec2(0, 0));
        let target = |_: &Surface, _: &Light| 0.5;

        let reservoir = Reservoir {
            sample: Light(1),
            w_sum: 0.0,
            m: 30,
            w: 2.0,
        };

        for bias in BiasCorrection::ALL {
            let out = Resampler::new(surface(0), reservoir, 20).resample(
                &mut noise,
                &target,
                &Unoccluded,
                bias,
            );

            assert_eq!(Light(1), out.sample);
            assert_eq!(20, out.m);
            assert_relative_eq!(2.0, out.w, epsilon = 1e-5);
        }
    }

    #[test]
    fn empty_neighbours_are_ignored() {
        let mut target = Resampler::new(surface(0), Reservoir::default(), 20);

        assert!(!target.add(surface(1), Reservoir::<Light>::default()));
        assert_eq!(1, target.len());
    }

    #[test]
    fn reports_picked_contributor() {
        let mut noise = WhiteNoise::new(1, uvec2(0, 0));
        let target = |_: &Surface, _: &Light| 1.0;

        let neighbour = Reservoir {
            sample: Light(1),
            w_sum: 1.0,
            m: 1,
            w: 1.0,
        };

        let (out, picked) =
            Resampler::new(surface(0), Reservoir::default(), 20)
                .with(surface(1), neighbour)
                .resample_ex(
                    &mut noise,
                    &target,
                    &Unoccluded,
                    BiasCorrection::Mis,
                );

        assert_eq!(Light(1), out.sample);
        assert_eq!(Some(1), picked);

        let (_, picked) =
            Resampler::<Light>::new(surface(0), Reservoir::default(), 20)
                .resample_ex(
                    &mut noise,
                    &target,
                    &Unoccluded,
                    BiasCorrection::Off,
                );

        assert_eq!(None, picked);
    }
}
