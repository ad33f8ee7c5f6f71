use std::collections::hash_map::Entry;
use std::mem;

use derivative::Derivative;
use fxhash::FxHashMap;
use log::{debug, warn};

use crate::{
    AliasTable, AnalyticLight, EmissiveTriangle, EnvironmentMap, Light,
    LightId, LightKind,
};

/// Handle under which the host registers its analytic lights.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LightHandle(pub u64);

/// All the lights of the scene, together with alias tables used to pick them
/// proportionally to their power.
///
/// Alias tables are rebuilt lazily, only after the light set has changed.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct Lights {
    #[derivative(Debug = "ignore")]
    emissive: Vec<EmissiveTriangle>,
    #[derivative(Debug = "ignore")]
    environment: Option<EnvironmentMap>,
    #[derivative(Debug = "ignore")]
    environment_luminances: Vec<f32>,
    analytic: Vec<AnalyticLight>,
    index: FxHashMap<LightHandle, LightId>,
    tables: [Option<AliasTable>; 3],
    dirty: bool,
}

impl Default for Lights {
    fn default() -> Self {
        Self {
            emissive: Default::default(),
            environment: Default::default(),
            environment_luminances: Default::default(),
            analytic: Default::default(),
            index: Default::default(),
            tables: Default::default(),
            dirty: true,
        }
    }
}

impl Lights {
    pub fn set_emissive(&mut self, triangles: Vec<EmissiveTriangle>) {
        self.emissive = triangles;
        self.dirty = true;
    }

    pub fn set_environment(&mut self, map: Option<EnvironmentMap>) {
        self.environment = map;
        self.dirty = true;
    }

    pub fn add(&mut self, handle: LightHandle, light: AnalyticLight) {
        match self.index.entry(handle) {
            Entry::Occupied(entry) => {
                let light_id = *entry.get();

                self.analytic[light_id.get() as usize] = light;
            }

            Entry::Vacant(entry) => {
                let light_id = LightId::new(self.analytic.len() as u32);

                self.analytic.push(light);
                entry.insert(light_id);
            }
        }

        self.dirty = true;
    }

    pub fn remove(&mut self, handle: &LightHandle) {
        let Some(light_id) = self.index.remove(handle) else {
            return;
        };

        self.analytic.remove(light_id.get() as usize);

        for light_id2 in self.index.values_mut() {
            if light_id2.get() > light_id.get() {
                *light_id2 = LightId::new(light_id2.get() - 1);
            }
        }

        self.dirty = true;
    }

    pub fn id_of(&self, handle: &LightHandle) -> Option<LightId> {
        self.index.get(handle).copied()
    }

    /// Marks alias tables as outdated, forcing them to be rebuilt.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// Rebuilds the alias tables if the light set has changed since the last
    /// call; returns whether anything has been rebuilt.
    pub fn refresh(&mut self) -> bool {
        if !mem::take(&mut self.dirty) {
            return false;
        }

        debug!(
            "Rebuilding alias tables; emissive = {}, environment = {}, \
             analytic = {}",
            self.emissive.len(),
            self.environment.as_ref().map_or(0, |map| map.len()),
            self.analytic.len(),
        );

        let emissive: Vec<_> =
            self.emissive.iter().map(|tri| tri.weight()).collect();

        self.environment_luminances = self
            .environment
            .as_ref()
            .map(|map| map.luminances())
            .unwrap_or_default();

        let environment: Vec<_> = self
            .environment
            .as_ref()
            .map(|map| {
                self.environment_luminances
                    .iter()
                    .enumerate()
                    .map(|(idx, luminance)| {
                        let row = map.idx_to_texel(idx).y;

                        map.solid_angle(row) * luminance
                    })
                    .collect()
            })
            .unwrap_or_default();

        let analytic: Vec<_> =
            self.analytic.iter().map(|light| light.weight()).collect();

        for (kind, weights) in
            LightKind::ALL.into_iter().zip([emissive, environment, analytic])
        {
            let table = AliasTable::new(&weights);

            if table.is_none() && !weights.is_empty() {
                warn!(
                    "All {kind:?} lights have zero power; they won't be \
                     sampled",
                );
            }

            self.tables[kind.to_bits() as usize] = table;
        }

        true
    }

    pub fn table(&self, kind: LightKind) -> Option<&AliasTable> {
        self.tables[kind.to_bits() as usize].as_ref()
    }

    /// Returns luminance of every texel of the environment map, as of the
    /// latest [`Self::refresh()`].
    pub fn environment_luminances(&self) -> &[f32] {
        &self.environment_luminances
    }

    pub fn len(&self, kind: LightKind) -> usize {
        match kind {
            LightKind::Emissive => self.emissive.len(),
            LightKind::Environment => {
                self.environment.as_ref().map_or(0, |map| map.len())
            }
            LightKind::Analytic => self.analytic.len(),
        }
    }

    pub fn get(&self, kind: LightKind, id: LightId) -> Option<Light<'_>> {
        let idx = id.get() as usize;

        match kind {
            LightKind::Emissive => self.emissive.get(idx).map(Light::Emissive),

            LightKind::Environment => {
                let map = self.environment.as_ref()?;

                if idx >= map.len() {
                    return None;
                }

                Some(Light::Environment {
                    map,
                    texel: map.idx_to_texel(idx),
                })
            }

            LightKind::Analytic => self.analytic.get(idx).map(Light::Analytic),
        }
    }
}
