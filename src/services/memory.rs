use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;
use crate::models::{
    AlgorithmStatus, Fruit, FruitKind, MatchRecord, MatchRecordUpdate, MatchScores,
    MatchingAlgorithm, NewFruit, NewMatchRecord,
};
use crate::services::store::{FruitStore, StoreError};

#[derive(Default)]
struct Tables {
    fruits: Vec<Fruit>,
    matches: Vec<MatchRecord>,
    algorithms: Vec<MatchingAlgorithm>,
}

/// Process-local store
///
/// Used when no database is configured and throughout the tests. Insertion order
/// stands in for `created_at` ordering.
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Store pre-registered with the built-in algorithm
    pub fn with_builtin_algorithm() -> Self {
        let tables = Tables {
            algorithms: vec![MatchingAlgorithm::builtin()],
            ..Default::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FruitStore for MemoryStore {
    async fn create_fruit(&self, fruit: NewFruit) -> Result<Fruit, StoreError> {
        let created = Fruit {
            id: Uuid::new_v4(),
            kind: fruit.kind,
            profile: fruit.profile,
            created_at: chrono::Utc::now(),
        };
        self.tables.write().await.fruits.push(created.clone());
        Ok(created)
    }

    async fn get_fruit(&self, id: Uuid) -> Result<Fruit, StoreError> {
        self.tables
            .read()
            .await
            .fruits
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("fruit {}", id)))
    }

    async fn list_fruits(&self, kind: FruitKind) -> Result<Vec<Fruit>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .fruits
            .iter()
            .filter(|f| f.kind == kind)
            .cloned()
            .collect())
    }

    async fn count_fruits(&self, kind: FruitKind) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.fruits.iter().filter(|f| f.kind == kind).count() as u64)
    }

    async fn create_match_record(&self, record: NewMatchRecord) -> Result<MatchRecord, StoreError> {
        let created = MatchRecord {
            id: Uuid::new_v4(),
            incoming_fruit_id: record.incoming_fruit_id,
            incoming_kind: record.incoming_kind,
            apple_id: record.apple_id,
            orange_id: record.orange_id,
            algorithm_key: record.algorithm_key,
            algorithm_name: record.algorithm_name,
            algorithm_version: record.algorithm_version,
            scores: record.scores,
            breakdown: record.breakdown,
            best_match: false,
            message_to_incoming: None,
            message_to_existing: None,
            created_at: chrono::Utc::now(),
        };

        self.tables.write().await.matches.push(created.clone());
        Ok(created)
    }

    async fn update_match_record(
        &self,
        id: Uuid,
        update: MatchRecordUpdate,
    ) -> Result<MatchRecord, StoreError> {
        let mut tables = self.tables.write().await;
        let position = tables
            .matches
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("match record {}", id)))?;

        if update.best_match == Some(true) {
            let incoming = tables.matches[position].incoming_fruit_id;
            let taken = tables
                .matches
                .iter()
                .any(|m| m.incoming_fruit_id == incoming && m.best_match && m.id != id);
            if taken {
                return Err(StoreError::Conflict(format!(
                    "fruit {} already has a best match",
                    incoming
                )));
            }
        }

        let record = &mut tables.matches[position];
        if let Some(best) = update.best_match {
            record.best_match = best;
        }
        if let Some(message) = update.message_to_incoming {
            record.message_to_incoming = Some(message);
        }
        if let Some(message) = update.message_to_existing {
            record.message_to_existing = Some(message);
        }
        Ok(record.clone())
    }

    async fn get_match_record(&self, id: Uuid) -> Result<MatchRecord, StoreError> {
        self.tables
            .read()
            .await
            .matches
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("match record {}", id)))
    }

    async fn list_best_matches(&self, limit: usize) -> Result<Vec<MatchRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .matches
            .iter()
            .rev()
            .filter(|m| m.best_match)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn best_match_scores(&self) -> Result<Vec<MatchScores>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .matches
            .iter()
            .filter(|m| m.best_match)
            .map(|m| m.scores)
            .collect())
    }

    async fn create_algorithm(&self, algorithm: MatchingAlgorithm) -> Result<MatchingAlgorithm, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.algorithms.iter().any(|a| a.key == algorithm.key) {
            return Err(StoreError::Conflict(format!("algorithm {}", algorithm.key)));
        }
        tables.algorithms.push(algorithm.clone());
        Ok(algorithm)
    }

    async fn find_algorithm(&self, key: &str) -> Result<Option<MatchingAlgorithm>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .algorithms
            .iter()
            .find(|a| a.key == key)
            .cloned())
    }

    async fn active_algorithm(&self, key: &str) -> Result<Option<MatchingAlgorithm>, StoreError> {
        Ok(self
            .find_algorithm(key)
            .await?
            .filter(|a| a.status == AlgorithmStatus::Active))
    }

    async fn list_algorithms(&self) -> Result<Vec<MatchingAlgorithm>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .algorithms
            .iter()
            .filter(|a| a.status == AlgorithmStatus::Active)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
