//! Weighted aggregation of indicator results.
//!
//! Per principle: `Σ(points · weight) / Σ weight`. The overall score is the
//! same formula over every indicator, not the mean of principle means.
//! Sums are integers, so the result does not depend on the order results
//! arrive in.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::domain::{EvaluationReport, IndicatorResult, Principle, PrincipleScore, Weight};

#[derive(Debug, Default, Clone, Copy)]
struct WeightedSum {
    points: u64,
    weight: u64,
}

impl WeightedSum {
    fn add(&mut self, result: &IndicatorResult) {
        let weight = u64::from(result.weight().get());
        self.points += u64::from(result.points()) * weight;
        self.weight += weight;
    }

    fn merge(&mut self, other: WeightedSum) {
        self.points += other.points;
        self.weight += other.weight;
    }

    /// Weighted mean, or `None` when nothing was added.
    fn mean(self) -> Option<f64> {
        (self.weight > 0).then(|| self.points as f64 / self.weight as f64)
    }
}

/// Total order used to pick one result among duplicates of a code.
fn rank(result: &IndicatorResult) -> (u32, Weight, Principle, &str, &str) {
    (
        result.points(),
        result.weight(),
        result.principle(),
        result.message(),
        result.name(),
    )
}

/// One result per code; duplicates keep the lowest-ranked one.
fn dedup_by_code(
    results: impl IntoIterator<Item = IndicatorResult>,
) -> BTreeMap<String, IndicatorResult> {
    let mut by_code = BTreeMap::new();
    for result in results {
        match by_code.entry(result.code().to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(result);
            }
            Entry::Occupied(mut slot) => {
                if rank(&result) < rank(slot.get()) {
                    slot.insert(result);
                }
            }
        }
    }
    by_code
}

/// Aggregate `results` into a report for `item_id`.
///
/// All four principles are always present. A principle without indicators
/// scores 0 and is flagged incomplete, as is the overall score in that case.
/// A code reported more than once counts once, with its lowest score.
pub fn compute(item_id: &str, results: impl IntoIterator<Item = IndicatorResult>) -> EvaluationReport {
    let mut grouped: BTreeMap<Principle, BTreeMap<String, IndicatorResult>> = Principle::ALL
        .iter()
        .map(|p| (*p, BTreeMap::new()))
        .collect();
    for (code, result) in dedup_by_code(results) {
        grouped
            .entry(result.principle())
            .or_default()
            .insert(code, result);
    }

    let mut overall = WeightedSum::default();
    let principle_scores: Vec<PrincipleScore> = Principle::ALL
        .iter()
        .map(|principle| {
            let results = grouped.remove(principle).unwrap_or_default();
            let mut sum = WeightedSum::default();
            results.values().for_each(|r| sum.add(r));
            overall.merge(sum);
            match sum.mean() {
                Some(mean) => PrincipleScore::new(*principle, results, mean, false),
                None => PrincipleScore::new(*principle, results, 0.0, true),
            }
        })
        .collect();

    let overall_incomplete = principle_scores.iter().any(PrincipleScore::incomplete);
    EvaluationReport::new(
        item_id.to_string(),
        principle_scores,
        overall.mean().unwrap_or(0.0),
        overall_incomplete,
    )
}
