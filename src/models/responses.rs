use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::models::domain::{FruitKind, MatchRecord, MatchScores, MatchingAlgorithm};

/// Self-description texts of an arriving fruit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Communication {
    pub attributes: String,
    pub preferences: String,
}

/// One computed pair in the incoming-fruit response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub counterpart_id: Uuid,
    pub scores: MatchScores,
}

/// The chosen pair and its narrative messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMatchSummary {
    pub match_id: Uuid,
    pub counterpart_id: Uuid,
    pub scores: MatchScores,
    pub message_to_incoming: Option<String>,
    pub message_to_existing: Option<String>,
}

/// Response for the incoming-fruit endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingFruitResponse {
    pub message: String,
    pub fruit_id: Uuid,
    pub kind: FruitKind,
    pub communication: Communication,
    pub match_count: usize,
    pub matches: Vec<MatchSummary>,
    pub best_match: Option<BestMatchSummary>,
}

/// Aggregated numbers for the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_apples: u64,
    pub total_oranges: u64,
    pub total_matches: u64,
    /// Mean overall score of best matches, as a percentage with one decimal
    pub success_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub metrics: DashboardMetrics,
    pub best_matches: Vec<MatchRecord>,
}

/// Response for algorithm registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmResponse {
    pub message: String,
    pub algorithm: MatchingAlgorithm,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
