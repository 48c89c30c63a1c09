use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to register a matching algorithm
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAlgorithmRequest {
    #[validate(length(min = 1))]
    pub key: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub version: String,
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub default_config: Option<serde_json::Value>,
}
