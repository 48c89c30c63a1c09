// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Attribute, AlgorithmStatus, Fruit, FruitAttributes, FruitKind, FruitPreferences, FruitProfile,
    MatchBreakdown, MatchRecord, MatchRecordUpdate, MatchScores, MatchingAlgorithm, NewFruit,
    NewMatchRecord, NumberRange, ScoreBreakdown, ShineFactor, ShinePreference, SOFT_CRITERIA_V1,
};
pub use requests::RegisterAlgorithmRequest;
pub use responses::{
    AlgorithmResponse, BestMatchSummary, Communication, DashboardMetrics, DashboardResponse,
    ErrorResponse, HealthResponse, IncomingFruitResponse, MatchSummary,
};
