//! Evaluation reports and their external view.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::indicator::{ColorBand, IndicatorResult, Principle, MAX_POINTS};

/// Round a score to two decimals for reporting.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Weighted score of one principle, kept at full precision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipleScore {
    principle: Principle,
    results: BTreeMap<String, IndicatorResult>,
    weighted_average: f64,
    incomplete: bool,
}

impl PrincipleScore {
    pub(crate) fn new(
        principle: Principle,
        results: BTreeMap<String, IndicatorResult>,
        weighted_average: f64,
        incomplete: bool,
    ) -> Self {
        Self {
            principle,
            results,
            weighted_average,
            incomplete,
        }
    }

    pub fn principle(&self) -> Principle {
        self.principle
    }

    pub fn results(&self) -> &BTreeMap<String, IndicatorResult> {
        &self.results
    }

    /// Full-precision weighted average.
    pub fn weighted_average(&self) -> f64 {
        self.weighted_average
    }

    /// Weighted average rounded to two decimals.
    pub fn reported(&self) -> f64 {
        round2(self.weighted_average)
    }

    /// `true` when the principle had no indicators to score.
    pub fn incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn color(&self) -> ColorBand {
        ColorBand::for_score(self.weighted_average)
    }
}

/// Immutable outcome of one evaluation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    item_id: String,
    principle_scores: Vec<PrincipleScore>,
    overall: f64,
    overall_incomplete: bool,
}

impl EvaluationReport {
    pub(crate) fn new(
        item_id: String,
        principle_scores: Vec<PrincipleScore>,
        overall: f64,
        overall_incomplete: bool,
    ) -> Self {
        Self {
            item_id,
            principle_scores,
            overall,
            overall_incomplete,
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// One score per principle, in F, A, I, R order.
    pub fn principle_scores(&self) -> &[PrincipleScore] {
        &self.principle_scores
    }

    pub fn principle(&self, principle: Principle) -> Option<&PrincipleScore> {
        self.principle_scores
            .iter()
            .find(|s| s.principle == principle)
    }

    /// Full-precision global weighted mean.
    pub fn overall(&self) -> f64 {
        self.overall
    }

    /// Global weighted mean rounded to two decimals.
    pub fn overall_reported(&self) -> f64 {
        round2(self.overall)
    }

    pub fn overall_incomplete(&self) -> bool {
        self.overall_incomplete
    }

    /// All indicator results across principles.
    pub fn results(&self) -> impl Iterator<Item = &IndicatorResult> {
        self.principle_scores.iter().flat_map(|s| s.results.values())
    }

    pub fn result(&self, code: &str) -> Option<&IndicatorResult> {
        self.principle_scores
            .iter()
            .find_map(|s| s.results.get(code))
    }

    /// Render the external response shape.
    pub fn to_view(&self, labels: &dyn LabelLookup, lang: Option<&str>) -> ReportView {
        let mut principles = BTreeMap::new();
        let mut summary = BTreeMap::new();

        for score in &self.principle_scores {
            let indicators = score
                .results
                .iter()
                .map(|(code, result)| {
                    let name = labels
                        .label(code, lang)
                        .unwrap_or_else(|| result.name().to_string());
                    let view = IndicatorView {
                        name,
                        msg: result.message().to_string(),
                        points: result.points(),
                        color: result.color().hex().to_string(),
                        score: ScoreView {
                            earned: result.points(),
                            total: MAX_POINTS,
                        },
                    };
                    (code.clone(), view)
                })
                .collect();
            principles.insert(score.principle.to_string(), indicators);
            summary.insert(
                score.principle.to_string(),
                PrincipleSummary {
                    score: score.reported(),
                    color: score.color().hex().to_string(),
                    incomplete: score.incomplete,
                },
            );
        }

        ReportView {
            item_id: self.item_id.clone(),
            principles,
            summary,
            overall: self.overall_reported(),
        }
    }
}

/// Display-label lookup keyed by indicator code.
pub trait LabelLookup: Send + Sync {
    fn label(&self, code: &str, lang: Option<&str>) -> Option<String>;
}

/// Lookup that defers to catalog names.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogLabels;

impl LabelLookup for CatalogLabels {
    fn label(&self, _code: &str, _lang: Option<&str>) -> Option<String> {
        None
    }
}

/// `{earned, total}` pair of an indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreView {
    pub earned: u32,
    pub total: u32,
}

/// One indicator in the external response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorView {
    pub name: String,
    pub msg: String,
    pub points: u32,
    pub color: String,
    pub score: ScoreView,
}

/// Rounded per-principle score in the external response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipleSummary {
    pub score: f64,
    pub color: String,
    pub incomplete: bool,
}

/// External response: `principle -> {code -> indicator}` plus totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportView {
    pub item_id: String,
    #[serde(flatten)]
    pub principles: BTreeMap<String, BTreeMap<String, IndicatorView>>,
    pub summary: BTreeMap<String, PrincipleSummary>,
    pub overall: f64,
}
