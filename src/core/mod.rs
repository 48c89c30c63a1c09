// Core algorithm exports
pub mod generator;
pub mod matcher;
pub mod narrative;
pub mod pipeline;
pub mod scoring;

pub use generator::generate_fruit;
pub use matcher::{select_best, Matcher, ScoredCandidate};
pub use narrative::{describe_fruit, narrate_match, MatchContext, MatchMessages, NarrativePolicy};
pub use pipeline::{IncomingPipeline, PipelineError, PipelineOptions};
pub use scoring::{compute_match_scores, score_preferences, DetailedMatchScores, DirectionalScore};
