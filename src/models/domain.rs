use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The two kinds of fruit that get matched against each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "fruit_kind", rename_all = "lowercase")]
pub enum FruitKind {
    Apple,
    Orange,
}

impl FruitKind {
    /// The kind this fruit is looking for
    pub fn opposite(self) -> Self {
        match self {
            FruitKind::Apple => FruitKind::Orange,
            FruitKind::Orange => FruitKind::Apple,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FruitKind::Apple => "apple",
            FruitKind::Orange => "orange",
        }
    }

    /// Indefinite article for prompt and fallback text ("an apple", "an orange")
    pub fn with_article(self) -> &'static str {
        match self {
            FruitKind::Apple => "an apple",
            FruitKind::Orange => "an orange",
        }
    }
}

impl fmt::Display for FruitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FruitKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apple" => Ok(FruitKind::Apple),
            "orange" => Ok(FruitKind::Orange),
            other => Err(format!("unknown fruit kind: {}", other)),
        }
    }
}

/// Ordered shine levels, dullest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ShineFactor {
    Dull,
    Neutral,
    Shiny,
    ExtraShiny,
}

impl ShineFactor {
    pub const ALL: [ShineFactor; 4] = [
        ShineFactor::Dull,
        ShineFactor::Neutral,
        ShineFactor::Shiny,
        ShineFactor::ExtraShiny,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShineFactor::Dull => "dull",
            ShineFactor::Neutral => "neutral",
            ShineFactor::Shiny => "shiny",
            ShineFactor::ExtraShiny => "extraShiny",
        }
    }
}

impl fmt::Display for ShineFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measured attributes of a fruit. `None` means the value is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FruitAttributes {
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub has_stem: Option<bool>,
    #[serde(default)]
    pub has_leaf: Option<bool>,
    #[serde(default)]
    pub has_worm: Option<bool>,
    #[serde(default)]
    pub shine_factor: Option<ShineFactor>,
    #[serde(default)]
    pub has_chemicals: Option<bool>,
}

/// Inclusive numeric range; either bound may be open
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl NumberRange {
    pub fn between(min: f64, max: f64) -> Self {
        Self { min: Some(min), max: Some(max) }
    }

    pub fn at_least(min: f64) -> Self {
        Self { min: Some(min), max: None }
    }

    pub fn at_most(max: f64) -> Self {
        Self { min: None, max: Some(max) }
    }

    /// Whether `value` satisfies every bound that is present
    pub fn contains(&self, value: f64) -> bool {
        if let Some(min) = self.min {
            if value < min {
                return false;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return false;
            }
        }
        true
    }
}

/// Accepted shine level(s). Serialized as a bare level or as a list of levels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShinePreference {
    One(ShineFactor),
    AnyOf(Vec<ShineFactor>),
}

impl ShinePreference {
    /// Normalized view of the accepted levels
    pub fn accepted(&self) -> &[ShineFactor] {
        match self {
            ShinePreference::One(level) => std::slice::from_ref(level),
            ShinePreference::AnyOf(levels) => levels,
        }
    }

    pub fn accepts(&self, level: ShineFactor) -> bool {
        self.accepted().contains(&level)
    }
}

/// What a fruit wants from its counterpart. `None` means "no preference".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FruitPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<NumberRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<NumberRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_stem: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_leaf: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_worm: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shine_factor: Option<ShinePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_chemicals: Option<bool>,
}

impl FruitPreferences {
    pub fn is_empty(&self) -> bool {
        self == &FruitPreferences::default()
    }
}

/// Attributes and preferences of a fruit; all that scoring ever looks at
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FruitProfile {
    pub attributes: FruitAttributes,
    #[serde(default)]
    pub preferences: FruitPreferences,
}

/// A freshly generated fruit that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFruit {
    #[serde(rename = "type")]
    pub kind: FruitKind,
    #[serde(flatten)]
    pub profile: FruitProfile,
}

/// A stored fruit. Attributes and preferences never change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fruit {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: FruitKind,
    #[serde(flatten)]
    pub profile: FruitProfile,
    #[serde(rename = "createdAt")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// The seven scored slots, in breakdown order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Attribute {
    Size,
    Weight,
    HasStem,
    HasLeaf,
    HasWorm,
    ShineFactor,
    HasChemicals,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::Size,
        Attribute::Weight,
        Attribute::HasStem,
        Attribute::HasLeaf,
        Attribute::HasWorm,
        Attribute::ShineFactor,
        Attribute::HasChemicals,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::Size => "size",
            Attribute::Weight => "weight",
            Attribute::HasStem => "hasStem",
            Attribute::HasLeaf => "hasLeaf",
            Attribute::HasWorm => "hasWorm",
            Attribute::ShineFactor => "shineFactor",
            Attribute::HasChemicals => "hasChemicals",
        }
    }
}

/// Per-attribute scores for one direction (one side's preferences vs the other's attributes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub size: f64,
    pub weight: f64,
    pub has_stem: f64,
    pub has_leaf: f64,
    pub has_worm: f64,
    pub shine_factor: f64,
    pub has_chemicals: f64,
}

impl ScoreBreakdown {
    pub fn get(&self, attribute: Attribute) -> f64 {
        match attribute {
            Attribute::Size => self.size,
            Attribute::Weight => self.weight,
            Attribute::HasStem => self.has_stem,
            Attribute::HasLeaf => self.has_leaf,
            Attribute::HasWorm => self.has_worm,
            Attribute::ShineFactor => self.shine_factor,
            Attribute::HasChemicals => self.has_chemicals,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, f64)> + '_ {
        Attribute::ALL.into_iter().map(move |a| (a, self.get(a)))
    }

    /// Number of slots that scored 1.0
    pub fn satisfied_count(&self) -> u32 {
        self.iter().filter(|(_, score)| *score >= 1.0).count() as u32
    }
}

/// Both directional breakdowns of a pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchBreakdown {
    pub apple_on_orange: ScoreBreakdown,
    pub orange_on_apple: ScoreBreakdown,
}

impl MatchBreakdown {
    /// Satisfied slots across both directions, out of 14.
    ///
    /// Orders pairs exactly like `overall_score` but without float rounding: (5/7 + 5/7) / 2
    /// and (6/7 + 4/7) / 2 differ in the last bit, their counts do not.
    pub fn satisfied_count(&self) -> u32 {
        self.apple_on_orange.satisfied_count() + self.orange_on_apple.satisfied_count()
    }
}

/// Directional and combined scores of an apple/orange pair, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScores {
    pub score_apple_on_orange: f64,
    pub score_orange_on_apple: f64,
    pub overall_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlgorithmStatus {
    Active,
    Deprecated,
}

impl AlgorithmStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmStatus::Active => "active",
            AlgorithmStatus::Deprecated => "deprecated",
        }
    }
}

impl FromStr for AlgorithmStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AlgorithmStatus::Active),
            "deprecated" => Ok(AlgorithmStatus::Deprecated),
            other => Err(format!("unknown algorithm status: {}", other)),
        }
    }
}

/// Key of the built-in soft-criteria scorer
pub const SOFT_CRITERIA_V1: &str = "soft-criteria-v1";

/// Registered matching algorithm descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingAlgorithm {
    pub key: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub status: AlgorithmStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_config: Option<serde_json::Value>,
}

impl MatchingAlgorithm {
    /// Descriptor used when nothing is registered under the configured key
    pub fn builtin() -> Self {
        Self {
            key: SOFT_CRITERIA_V1.to_string(),
            name: "Soft criteria".to_string(),
            version: "1.0.0".to_string(),
            description: "Equal-weight soft matching: missing preferences score 1, unknown attributes score 0".to_string(),
            status: AlgorithmStatus::Active,
            default_config: None,
        }
    }
}

/// Fields of a match record at creation time
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatchRecord {
    pub incoming_fruit_id: Uuid,
    pub incoming_kind: FruitKind,
    pub apple_id: Uuid,
    pub orange_id: Uuid,
    pub algorithm_key: String,
    pub algorithm_name: String,
    pub algorithm_version: String,
    pub scores: MatchScores,
    pub breakdown: MatchBreakdown,
}

/// Stored result of scoring one incoming fruit against one counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: Uuid,
    pub incoming_fruit_id: Uuid,
    pub incoming_kind: FruitKind,
    pub apple_id: Uuid,
    pub orange_id: Uuid,
    pub algorithm_key: String,
    pub algorithm_name: String,
    pub algorithm_version: String,
    #[serde(flatten)]
    pub scores: MatchScores,
    pub breakdown: MatchBreakdown,
    pub best_match: bool,
    pub message_to_incoming: Option<String>,
    pub message_to_existing: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MatchRecord {
    /// Id of the fruit that was already waiting when the incoming one arrived
    pub fn counterpart_id(&self) -> Uuid {
        match self.incoming_kind {
            FruitKind::Apple => self.orange_id,
            FruitKind::Orange => self.apple_id,
        }
    }
}

/// Partial update of a match record; `None` leaves the field as it is
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchRecordUpdate {
    pub best_match: Option<bool>,
    pub message_to_incoming: Option<String>,
    pub message_to_existing: Option<String>,
}
