//! Indicator definitions and results.

use serde::{Deserialize, Serialize};

use crate::domain::error::CatalogError;

/// Upper bound of the indicator point scale.
pub const MAX_POINTS: u32 = 100;

/// One of the four FAIR principles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Principle {
    Findable,
    Accessible,
    Interoperable,
    Reusable,
}

impl Principle {
    /// All principles in report order.
    pub const ALL: [Principle; 4] = [
        Principle::Findable,
        Principle::Accessible,
        Principle::Interoperable,
        Principle::Reusable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Findable => "findable",
            Self::Accessible => "accessible",
            Self::Interoperable => "interoperable",
            Self::Reusable => "reusable",
        }
    }
}

impl std::fmt::Display for Principle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Indicator weight. Only 1 (useful), 2 (important) and 3 (essential) exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Weight(u8);

impl Weight {
    pub const USEFUL: Weight = Weight(1);
    pub const IMPORTANT: Weight = Weight(2);
    pub const ESSENTIAL: Weight = Weight(3);

    pub fn new(value: u8) -> Result<Self, CatalogError> {
        match value {
            1..=3 => Ok(Self(value)),
            other => Err(CatalogError::InvalidWeight { weight: other }),
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Weight {
    type Error = CatalogError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Weight> for u8 {
    fn from(weight: Weight) -> Self {
        weight.0
    }
}

/// Catalog entry for one indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    pub code: String,
    pub principle: Principle,
    pub weight: Weight,
    /// Default display name; localized labels come from a `LabelLookup`.
    pub name: String,
}

impl IndicatorDefinition {
    pub fn new(
        code: impl Into<String>,
        principle: Principle,
        weight: Weight,
        name: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            principle,
            weight,
            name: name.into(),
        }
    }
}

/// Display band derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBand {
    Red,
    Amber,
    Green,
}

impl ColorBand {
    /// `< 50` red, `50..=80` amber, `> 80` green.
    pub fn for_points(points: u32) -> Self {
        match points {
            0..=49 => Self::Red,
            50..=80 => Self::Amber,
            _ => Self::Green,
        }
    }

    /// Same boundaries for fractional scores.
    pub fn for_score(score: f64) -> Self {
        if score < 50.0 {
            Self::Red
        } else if score <= 80.0 {
            Self::Amber
        } else {
            Self::Green
        }
    }

    /// Hex color used by report front ends.
    pub fn hex(self) -> &'static str {
        match self {
            Self::Red => "#E74C3C",
            Self::Amber => "#F39C12",
            Self::Green => "#2ECC71",
        }
    }
}

/// What an indicator body returns: points plus an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorOutcome {
    pub points: u32,
    pub message: String,
}

impl IndicatorOutcome {
    pub fn new(points: u32, message: impl Into<String>) -> Self {
        Self {
            points,
            message: message.into(),
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(MAX_POINTS, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    /// Neutral score for an indicator with no implementation.
    pub fn not_implemented() -> Self {
        Self::new(50, "not implemented")
    }

    /// Points proportional to `present` out of `total`, rounded down.
    pub fn proportional(present: usize, total: usize, message: impl Into<String>) -> Self {
        let points = if total == 0 {
            0
        } else {
            (present.min(total) as u32 * MAX_POINTS) / total as u32
        };
        Self::new(points, message)
    }
}

/// Scored outcome of one indicator in one evaluation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorResult {
    code: String,
    principle: Principle,
    name: String,
    points: u32,
    message: String,
    color: ColorBand,
    weight: Weight,
}

impl IndicatorResult {
    /// Build a result; points above [`MAX_POINTS`] are clamped.
    pub fn new(definition: &IndicatorDefinition, outcome: IndicatorOutcome) -> Self {
        let points = outcome.points.min(MAX_POINTS);
        Self {
            code: definition.code.clone(),
            principle: definition.principle,
            name: definition.name.clone(),
            points,
            message: outcome.message,
            color: ColorBand::for_points(points),
            weight: definition.weight,
        }
    }

    /// A zero-point result carrying the failure cause.
    pub fn degraded(definition: &IndicatorDefinition, message: impl Into<String>) -> Self {
        Self::new(definition, IndicatorOutcome::fail(message))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn principle(&self) -> Principle {
        self.principle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> u32 {
        self.points
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn color(&self) -> ColorBand {
        self.color
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }
}
