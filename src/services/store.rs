use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use crate::models::{
    Fruit, FruitKind, MatchRecord, MatchRecordUpdate, MatchScores, MatchingAlgorithm, NewFruit,
    NewMatchRecord,
};

/// Errors that can occur in the persistence gateway
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage for fruits, match records and algorithm descriptors.
///
/// Each call either fully applies or fails; there is no multi-call transaction.
#[async_trait]
pub trait FruitStore: Send + Sync {
    async fn create_fruit(&self, fruit: NewFruit) -> Result<Fruit, StoreError>;

    async fn get_fruit(&self, id: Uuid) -> Result<Fruit, StoreError>;

    /// All fruits of one kind, oldest first
    async fn list_fruits(&self, kind: FruitKind) -> Result<Vec<Fruit>, StoreError>;

    async fn count_fruits(&self, kind: FruitKind) -> Result<u64, StoreError>;

    async fn create_match_record(&self, record: NewMatchRecord) -> Result<MatchRecord, StoreError>;

    async fn update_match_record(
        &self,
        id: Uuid,
        update: MatchRecordUpdate,
    ) -> Result<MatchRecord, StoreError>;

    async fn get_match_record(&self, id: Uuid) -> Result<MatchRecord, StoreError>;

    /// Most recent best matches first
    async fn list_best_matches(&self, limit: usize) -> Result<Vec<MatchRecord>, StoreError>;

    /// Scores of every best match, oldest first
    async fn best_match_scores(&self) -> Result<Vec<MatchScores>, StoreError>;

    /// Fails with `StoreError::Conflict` if the key is taken
    async fn create_algorithm(&self, algorithm: MatchingAlgorithm) -> Result<MatchingAlgorithm, StoreError>;

    async fn find_algorithm(&self, key: &str) -> Result<Option<MatchingAlgorithm>, StoreError>;

    /// The algorithm under `key`, only if its status is active
    async fn active_algorithm(&self, key: &str) -> Result<Option<MatchingAlgorithm>, StoreError>;

    async fn list_algorithms(&self) -> Result<Vec<MatchingAlgorithm>, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
