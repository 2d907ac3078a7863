use serde::Serialize;

use crate::candidate::Position;
use crate::level::SpatialFilter;
use crate::sequence::PlacementOutcome;

/// Distance used to rank placements: `sqrt(dx^2 + dy^2 + |dz|)`. The z
/// term is not squared.
pub fn distance(a: Position, b: Position) -> f64 {
    let dx = (i64::from(b.x) - i64::from(a.x)).abs() as f64;
    let dy = (i64::from(b.y) - i64::from(a.y)).abs() as f64;
    let dz = (i64::from(b.z) - i64::from(a.z)).abs() as f64;
    (dx * dx + dy * dy + dz).sqrt()
}

/// Sum of distances from every placed object to `reference`. Lower is better.
pub fn score(outcome: &PlacementOutcome, reference: Position) -> f64 {
    outcome
        .locations
        .iter()
        .map(|&location| distance(location, reference))
        .sum()
}

pub fn accepts(filter: &SpatialFilter, outcome: &PlacementOutcome) -> bool {
    outcome
        .locations
        .iter()
        .all(|&location| filter.accepts(location))
}

pub fn filter_outcomes(
    outcomes: Vec<PlacementOutcome>,
    filter: &SpatialFilter,
) -> Vec<PlacementOutcome> {
    outcomes
        .into_iter()
        .filter(|outcome| accepts(filter, outcome))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ranking {
    All,
    Top(usize),
}

impl Ranking {
    /// Command-line style limit: zero or negative keeps everything.
    pub fn from_limit(limit: i64) -> Self {
        if limit > 0 {
            Ranking::Top(limit as usize)
        } else {
            Ranking::All
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredOutcome {
    pub score: f64,
    #[serde(flatten)]
    pub outcome: PlacementOutcome,
}

/// Sorts ascending by score, then by iteration, and applies `ranking`.
pub fn rank(
    outcomes: Vec<PlacementOutcome>,
    reference: Position,
    ranking: Ranking,
) -> Vec<ScoredOutcome> {
    let mut scored: Vec<ScoredOutcome> = outcomes
        .into_iter()
        .map(|outcome| ScoredOutcome {
            score: score(&outcome, reference),
            outcome,
        })
        .collect();

    scored.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then(a.outcome.iteration.cmp(&b.outcome.iteration))
    });

    if let Ranking::Top(limit) = ranking {
        scored.truncate(limit);
    }
    scored
}
