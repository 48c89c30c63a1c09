use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;
use crate::core::generator::generate_fruit;
use crate::core::matcher::{select_best, Matcher};
use crate::core::narrative::{describe_fruit, narrate_match, MatchContext, NarrativePolicy};
use crate::models::{
    BestMatchSummary, Fruit, FruitKind, IncomingFruitResponse, MatchRecord, MatchRecordUpdate,
    MatchSummary, MatchingAlgorithm,
};
use crate::services::{FruitStore, GenerationError, StoreError, TextGenerator};

/// Errors that fail an incoming-fruit request
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to store incoming {kind}: {source}")]
    StoreFruit { kind: FruitKind, source: StoreError },

    #[error("failed to resolve matching algorithm: {0}")]
    ResolveAlgorithm(StoreError),

    #[error("failed to load {kind} snapshot: {source}")]
    LoadCounterparts { kind: FruitKind, source: StoreError },

    #[error("failed to store match of {fruit_id} with {counterpart_id}: {source}")]
    StoreMatch {
        fruit_id: Uuid,
        counterpart_id: Uuid,
        source: StoreError,
    },

    #[error("failed to update match record {match_id}: {source}")]
    UpdateMatch { match_id: Uuid, source: StoreError },

    #[error("match messages unavailable for {match_id}: {source}")]
    Narrative {
        match_id: Uuid,
        source: GenerationError,
    },
}

/// Per-request knobs, resolved from settings once at startup
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub algorithm_key: String,
    pub narrative_policy: NarrativePolicy,
    /// Hold a gate from storing the fruit until the counterpart snapshot is read
    pub serialize_arrivals: bool,
    pub generation_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            algorithm_key: crate::models::SOFT_CRITERIA_V1.to_string(),
            narrative_policy: NarrativePolicy::default(),
            serialize_arrivals: false,
            generation_timeout: Duration::from_secs(30),
        }
    }
}

/// Generate → store → snapshot → score → store records → pick best → narrate
///
/// Scoring works on a snapshot of the counterparts taken once per request. Without
/// `serialize_arrivals`, two arrivals of opposite kinds may each miss the other.
#[derive(Clone)]
pub struct IncomingPipeline {
    store: Arc<dyn FruitStore>,
    generator: Arc<dyn TextGenerator>,
    rng: Arc<Mutex<StdRng>>,
    arrival_gate: Arc<tokio::sync::Mutex<()>>,
    options: PipelineOptions,
}

impl IncomingPipeline {
    pub fn new(
        store: Arc<dyn FruitStore>,
        generator: Arc<dyn TextGenerator>,
        options: PipelineOptions,
    ) -> Self {
        Self::with_rng(store, generator, options, StdRng::from_entropy())
    }

    /// Use a caller-provided random source (seeded in tests)
    pub fn with_rng(
        store: Arc<dyn FruitStore>,
        generator: Arc<dyn TextGenerator>,
        options: PipelineOptions,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            generator,
            rng: Arc::new(Mutex::new(rng)),
            arrival_gate: Arc::new(tokio::sync::Mutex::new(())),
            options,
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run `f` with the shared random source. The lock is never held across an await.
    fn with_random<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = match self.rng.lock() {
            Ok(guard) => guard,
            // The RNG holds no invariant a panicking holder could break
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    pub fn random_kind(&self) -> FruitKind {
        self.with_random(|rng| if rng.gen_bool(0.5) { FruitKind::Apple } else { FruitKind::Orange })
    }

    /// Algorithm for this request; falls back to the built-in descriptor
    async fn resolve_algorithm(&self) -> Result<MatchingAlgorithm, PipelineError> {
        let key = &self.options.algorithm_key;
        match self
            .store
            .active_algorithm(key)
            .await
            .map_err(PipelineError::ResolveAlgorithm)?
        {
            Some(algorithm) => Ok(algorithm),
            None => {
                tracing::warn!("No active algorithm registered under {}, using built-in scorer", key);
                Ok(MatchingAlgorithm::builtin())
            }
        }
    }

    /// Handle one arriving fruit of the given kind
    pub async fn process_incoming(&self, kind: FruitKind) -> Result<IncomingFruitResponse, PipelineError> {
        let new_fruit = self.with_random(|rng| generate_fruit(kind, rng));

        let communication =
            describe_fruit(self.generator.as_ref(), &new_fruit, self.options.generation_timeout).await;

        let algorithm = self.resolve_algorithm().await?;
        let matcher = Matcher::new(algorithm);

        let (fruit, counterparts) = {
            let _gate = if self.options.serialize_arrivals {
                Some(self.arrival_gate.lock().await)
            } else {
                None
            };

            let fruit = self.store.create_fruit(new_fruit).await.map_err(|source| {
                tracing::error!("Failed to store incoming {}: {}", kind, source);
                PipelineError::StoreFruit { kind, source }
            })?;

            let counterparts = self
                .store
                .list_fruits(kind.opposite())
                .await
                .map_err(|source| {
                    tracing::error!("Failed to load {} snapshot for {}: {}", kind.opposite(), fruit.id, source);
                    PipelineError::LoadCounterparts {
                        kind: kind.opposite(),
                        source,
                    }
                })?;

            (fruit, counterparts)
        };

        tracing::info!(
            "Scoring {} {} against {} {}s with {}",
            kind,
            fruit.id,
            counterparts.len(),
            kind.opposite(),
            matcher.algorithm().key
        );

        let records = self.score_and_store(&matcher, &fruit, &counterparts).await?;

        let best_match = self.choose_best(&fruit, &counterparts, &records).await?;

        Ok(IncomingFruitResponse {
            message: format!("{} received and stored", capitalize_kind(kind)),
            fruit_id: fruit.id,
            kind,
            communication,
            match_count: records.len(),
            matches: records
                .iter()
                .map(|r| MatchSummary {
                    match_id: r.id,
                    counterpart_id: r.counterpart_id(),
                    scores: r.scores,
                })
                .collect(),
            best_match,
        })
    }

    /// Score every counterpart and persist one record each; the first failed write aborts
    async fn score_and_store(
        &self,
        matcher: &Matcher,
        fruit: &Fruit,
        counterparts: &[Fruit],
    ) -> Result<Vec<MatchRecord>, PipelineError> {
        let candidates = matcher.score_candidates(fruit, counterparts);
        let mut records = Vec::with_capacity(candidates.len());

        for candidate in &candidates {
            let new_record = matcher.match_record(fruit, candidate);
            match self.store.create_match_record(new_record).await {
                Ok(record) => records.push(record),
                Err(source) => {
                    let scored: Vec<Uuid> = records.iter().map(MatchRecord::counterpart_id).collect();
                    tracing::error!(
                        "Failed to store match of {} with {}: {} (already stored: {:?})",
                        fruit.id,
                        candidate.counterpart_id,
                        source,
                        scored
                    );
                    return Err(PipelineError::StoreMatch {
                        fruit_id: fruit.id,
                        counterpart_id: candidate.counterpart_id,
                        source,
                    });
                }
            }
        }

        Ok(records)
    }

    /// Flag the best record and attach its messages. `None` when there were no counterparts.
    async fn choose_best(
        &self,
        fruit: &Fruit,
        counterparts: &[Fruit],
        records: &[MatchRecord],
    ) -> Result<Option<BestMatchSummary>, PipelineError> {
        let keys: Vec<u32> = records.iter().map(|r| r.breakdown.satisfied_count()).collect();
        let Some(best_index) = self.with_random(|rng| select_best(&keys, rng)) else {
            tracing::info!("No counterparts for {} {}, no best match", fruit.kind, fruit.id);
            return Ok(None);
        };

        let chosen = &records[best_index];
        let match_id = chosen.id;

        self.store
            .update_match_record(
                match_id,
                MatchRecordUpdate {
                    best_match: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|source| {
                tracing::error!("Failed to flag best match {} for {}: {}", match_id, fruit.id, source);
                PipelineError::UpdateMatch { match_id, source }
            })?;

        let counterpart_id = chosen.counterpart_id();
        // The chosen record was scored from this snapshot, so the counterpart is in it
        let Some(counterpart) = counterparts.iter().find(|c| c.id == counterpart_id) else {
            return Err(PipelineError::UpdateMatch {
                match_id,
                source: StoreError::NotFound(format!("fruit {}", counterpart_id)),
            });
        };

        let context = MatchContext {
            incoming_kind: fruit.kind,
            scores: chosen.scores,
            breakdown: chosen.breakdown,
            incoming_attributes: &fruit.profile.attributes,
            incoming_preferences: &fruit.profile.preferences,
            existing_attributes: &counterpart.profile.attributes,
            existing_preferences: &counterpart.profile.preferences,
        };

        let messages = narrate_match(
            self.generator.as_ref(),
            &context,
            self.options.narrative_policy,
            self.options.generation_timeout,
        )
        .await
        .map_err(|source| {
            tracing::error!(
                "Match messages unavailable for {} ({} with {}): {}",
                match_id,
                fruit.id,
                counterpart_id,
                source
            );
            PipelineError::Narrative { match_id, source }
        })?;

        if messages.message_to_incoming.is_some() || messages.message_to_existing.is_some() {
            self.store
                .update_match_record(
                    match_id,
                    MatchRecordUpdate {
                        best_match: None,
                        message_to_incoming: messages.message_to_incoming.clone(),
                        message_to_existing: messages.message_to_existing.clone(),
                    },
                )
                .await
                .map_err(|source| {
                    tracing::error!("Failed to store messages on {}: {}", match_id, source);
                    PipelineError::UpdateMatch { match_id, source }
                })?;
        }

        tracing::info!(
            "Best match for {} {} is {} (score {:.3})",
            fruit.kind,
            fruit.id,
            counterpart_id,
            chosen.scores.overall_score
        );

        Ok(Some(BestMatchSummary {
            match_id,
            counterpart_id,
            scores: chosen.scores,
            message_to_incoming: messages.message_to_incoming,
            message_to_existing: messages.message_to_existing,
        }))
    }
}

fn capitalize_kind(kind: FruitKind) -> &'static str {
    match kind {
        FruitKind::Apple => "Apple",
        FruitKind::Orange => "Orange",
    }
}
