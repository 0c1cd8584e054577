use crate::align::contact_patch::Alignment;
use crate::config::audit::{ThresholdConfig, WeightConfig};
use crate::foundation::error::{SpriteGateError, SpriteGateResult};
use crate::foundation::math::clamp_unit;
use crate::metrics::suite::SoftMetrics;

/// Decay rate of the stability score per pixel of residual contact error.
pub const STABILITY_DECAY: f64 = 1.5;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Stability,
    Identity,
    Palette,
    Style,
}

impl Category {
    pub const ALL: [Self; 4] = [Self::Stability, Self::Identity, Self::Palette, Self::Style];

    pub fn name(self) -> &'static str {
        match self {
            Self::Stability => "stability",
            Self::Identity => "identity",
            Self::Palette => "palette",
            Self::Style => "style",
        }
    }

    fn weight(self, w: &WeightConfig) -> f64 {
        match self {
            Self::Stability => w.stability,
            Self::Identity => w.identity,
            Self::Palette => w.palette,
            Self::Style => w.style,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankBand {
    Bronze,
    Silver,
    Gold,
    Diamond,
}

impl RankBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.92 {
            Self::Diamond
        } else if score >= 0.80 {
            Self::Gold
        } else if score >= 0.65 {
            Self::Silver
        } else {
            Self::Bronze
        }
    }
}

/// Raw category values in [0, 1] before weighting.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CategoryInputs {
    pub stability: f64,
    pub identity: f64,
    pub palette: f64,
    pub style: f64,
}

impl CategoryInputs {
    fn get(&self, c: Category) -> f64 {
        match c {
            Category::Stability => self.stability,
            Category::Identity => self.identity,
            Category::Palette => self.palette,
            Category::Style => self.style,
        }
    }

    /// Derives category values from the soft metrics and the alignment result.
    pub fn from_metrics(
        metrics: &SoftMetrics,
        alignment: &Alignment,
        thresholds: &ThresholdConfig,
    ) -> Self {
        let contact = (-STABILITY_DECAY * alignment.residual_px.max(0.0)).exp();
        let stability = match metrics.temporal.stability_score() {
            Some(t) => (contact + t) / 2.0,
            None => contact,
        };
        let ceiling = f64::from(thresholds.style_orphan_ceiling.max(1));
        let style = 1.0 - (f64::from(metrics.orphans.count) / ceiling).min(1.0);
        Self {
            stability,
            identity: metrics.identity.score,
            palette: metrics.palette.score,
            style,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub raw: f64,
    /// Normalized weight.
    pub weight: f64,
    pub weighted: f64,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositeScore {
    pub categories: Vec<CategoryScore>,
    pub value: f64,
    pub passed: bool,
    /// Categories below their share of the minimum, largest shortfall first.
    pub failed_categories: Vec<Category>,
    pub rank: RankBand,
}

/// Weighted aggregate of the four categories.
///
/// Weights are normalized by their sum. A category fails when its weighted score is below
/// `weight * minimum`.
pub fn composite(
    inputs: &CategoryInputs,
    weights: &WeightConfig,
    minimum: f64,
) -> SpriteGateResult<CompositeScore> {
    let total = weights.sum();
    if !total.is_finite() || total <= 0.0 {
        return Err(SpriteGateError::validation(
            "composite weights must have a positive sum",
        ));
    }

    let categories: Vec<CategoryScore> = Category::ALL
        .iter()
        .map(|&category| {
            let weight = category.weight(weights) / total;
            let raw = clamp_unit(inputs.get(category));
            CategoryScore {
                category,
                raw,
                weight,
                weighted: weight * raw,
            }
        })
        .collect();

    let value = clamp_unit(categories.iter().map(|c| c.weighted).sum());

    let mut shortfalls: Vec<(Category, f64)> = categories
        .iter()
        .filter_map(|c| {
            let floor = c.weight * minimum;
            (c.weighted < floor).then_some((c.category, floor - c.weighted))
        })
        .collect();
    shortfalls.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(CompositeScore {
        categories,
        value,
        passed: value >= minimum,
        failed_categories: shortfalls.into_iter().map(|(c, _)| c).collect(),
        rank: RankBand::from_score(value),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/scoring/composite.rs"]
mod tests;
