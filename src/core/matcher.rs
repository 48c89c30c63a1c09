use rand::Rng;
use uuid::Uuid;
use crate::core::scoring::{compute_match_scores, DetailedMatchScores};
use crate::models::{Fruit, FruitKind, MatchingAlgorithm, NewMatchRecord};

/// One counterpart scored against the incoming fruit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub counterpart_id: Uuid,
    pub detailed: DetailedMatchScores,
}

impl ScoredCandidate {
    pub fn overall_score(&self) -> f64 {
        self.detailed.scores.overall_score
    }

    /// Exact ranking key, see `MatchBreakdown::satisfied_count`
    pub fn tie_key(&self) -> u32 {
        self.detailed.breakdown.satisfied_count()
    }
}

/// Scores an incoming fruit against a snapshot of counterparts and picks the best pair
///
/// # Pipeline Stages
/// 1. Score every counterpart in both directions
/// 2. Turn the scores into match records tagged with the algorithm in use
/// 3. Select the single best pair, ties broken uniformly at random
#[derive(Debug, Clone)]
pub struct Matcher {
    algorithm: MatchingAlgorithm,
}

impl Matcher {
    /// Bind the matcher to the algorithm resolved for this request
    pub fn new(algorithm: MatchingAlgorithm) -> Self {
        Self { algorithm }
    }

    pub fn algorithm(&self) -> &MatchingAlgorithm {
        &self.algorithm
    }

    /// Score the incoming fruit against every counterpart, in snapshot order.
    ///
    /// Counterparts of the same kind as the incoming fruit are skipped.
    pub fn score_candidates(&self, incoming: &Fruit, counterparts: &[Fruit]) -> Vec<ScoredCandidate> {
        counterparts
            .iter()
            .filter(|c| c.kind == incoming.kind.opposite())
            .map(|counterpart| {
                let detailed = match incoming.kind {
                    FruitKind::Apple => compute_match_scores(&incoming.profile, &counterpart.profile),
                    FruitKind::Orange => compute_match_scores(&counterpart.profile, &incoming.profile),
                };
                ScoredCandidate {
                    counterpart_id: counterpart.id,
                    detailed,
                }
            })
            .collect()
    }

    /// Build the record to persist for one scored pair
    pub fn match_record(&self, incoming: &Fruit, candidate: &ScoredCandidate) -> NewMatchRecord {
        let (apple_id, orange_id) = match incoming.kind {
            FruitKind::Apple => (incoming.id, candidate.counterpart_id),
            FruitKind::Orange => (candidate.counterpart_id, incoming.id),
        };

        NewMatchRecord {
            incoming_fruit_id: incoming.id,
            incoming_kind: incoming.kind,
            apple_id,
            orange_id,
            algorithm_key: self.algorithm.key.clone(),
            algorithm_name: self.algorithm.name.clone(),
            algorithm_version: self.algorithm.version.clone(),
            scores: candidate.detailed.scores,
            breakdown: candidate.detailed.breakdown,
        }
    }
}

/// Pick the index of the highest key, choosing uniformly among ties.
///
/// Returns `None` for an empty slice. Callers pass exact keys such as
/// `MatchBreakdown::satisfied_count`; overall scores are floats and two pairs with the
/// same total can differ in the last bit.
pub fn select_best<K, R>(keys: &[K], rng: &mut R) -> Option<usize>
where
    K: Ord,
    R: Rng + ?Sized,
{
    let best = keys.iter().max()?;

    let tied: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| *key == best)
        .map(|(i, _)| i)
        .collect();

    Some(tied[rng.gen_range(0..tied.len())])
}
