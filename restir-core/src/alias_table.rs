/// Structure for drawing indices from an arbitrary discrete distribution in
/// constant time.
///
/// Built with Vose's alias method: every slot holds a probability and an
/// alias, so sampling needs one uniform draw to pick a slot and one to pick
/// between the slot and its alias.
///
/// See: Vose, "A Linear Algorithm For Generating Random Numbers With a Given
/// Distribution", 1991.
#[derive(Clone, Debug, PartialEq)]
pub struct AliasTable {
    items: Vec<AliasTableItem>,
    weights: Vec<f32>,
    total_weight: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AliasTableItem {
    pub probability: f32,
    pub alias: u32,
}

impl AliasTable {
    /// Builds table for given weights.
    ///
    /// Returns `None` if there's nothing to sample from, i.e. when `weights`
    /// is empty or all of them are zero; negative and non-finite weights are
    /// treated as zeros.
    pub fn new(weights: &[f32]) -> Option<Self> {
        let weights: Vec<f32> = weights
            .iter()
            .map(|&weight| {
                if weight.is_finite() && weight > 0.0 {
                    weight
                } else {
                    0.0
                }
            })
            .collect();

        let total_weight: f32 = weights.iter().sum();

        if weights.is_empty() || !(total_weight > 0.0) {
            return None;
        }

        let len = weights.len();

        let mut scaled: Vec<f32> = weights
            .iter()
            .map(|weight| weight * (len as f32) / total_weight)
            .collect();

        let mut items: Vec<_> = (0..len)
            .map(|idx| AliasTableItem {
                probability: 1.0,
                alias: idx as u32,
            })
            .collect();

        let mut small = Vec::with_capacity(len);
        let mut large = Vec::with_capacity(len);

        for (idx, &value) in scaled.iter().enumerate() {
            if value < 1.0 {
                small.push(idx);
            } else {
                large.push(idx);
            }
        }

        while let (Some(&less), Some(&more)) = (small.last(), large.last()) {
            small.pop();

            items[less] = AliasTableItem {
                probability: scaled[less],
                alias: more as u32,
            };

            scaled[more] = (scaled[more] + scaled[less]) - 1.0;

            if scaled[more] < 1.0 {
                large.pop();
                small.push(more);
            }
        }

        // Whatever remains on either list is (up to the floating-point slack)
        // exactly full, so it keeps the default probability of 1.0

        Some(Self {
            items,
            weights,
            total_weight,
        })
    }

    /// Draws an index; both `u1` and `u2` are expected to be uniform samples
    /// from range `<0.0, 1.0)`.
    pub fn sample(&self, u1: f32, u2: f32) -> usize {
        let len = self.items.len();
        let idx = ((u1 * (len as f32)) as usize).min(len - 1);
        let item = self.items[idx];

        if u2 < item.probability {
            idx
        } else {
            item.alias as usize
        }
    }

    /// Returns the probability of [`Self::sample()`] returning given index.
    pub fn pdf(&self, idx: usize) -> f32 {
        self.weights
            .get(idx)
            .map_or(0.0, |weight| weight / self.total_weight)
    }

    pub fn items(&self) -> &[AliasTableItem] {
        &self.items
    }

    pub fn total_weight(&self) -> f32 {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
