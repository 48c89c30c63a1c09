//! Fruitmatch - apple/orange matchmaking service
//!
//! Every arriving fruit is scored against each stored fruit of the other kind on seven
//! soft criteria in both directions. The best pair is flagged and introduced with a
//! short generated message to each side.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{compute_match_scores, select_best, IncomingPipeline, Matcher};
pub use crate::models::{Fruit, FruitKind, FruitProfile, MatchRecord, MatchScores};
