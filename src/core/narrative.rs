//! Human-readable text around a fruit and its best match.
//!
//! Every text here comes from the external generator when it is available and from a
//! deterministic template otherwise. What happens when the generator is unavailable for
//! match messages is decided by [`NarrativePolicy`].

use serde::Deserialize;
use std::time::Duration;
use crate::models::{
    Attribute, Communication, FruitAttributes, FruitKind, FruitPreferences, MatchBreakdown,
    MatchScores, NewFruit, NumberRange, ScoreBreakdown, ShinePreference,
};
use crate::services::{CompletionRequest, GenerationError, TextGenerator};

const MATCHMAKER_SYSTEM_PROMPT: &str = "You are a charming and playful fruit matchmaker with a talent for fruit puns. \
Your job is to write personalized messages announcing matches between apples and oranges.\n\n\
Guidelines:\n\
- Keep messages warm, celebratory, and fun (2-3 sentences max)\n\
- Include at least one fruit-related pun or wordplay\n\
- Reference specific compatibility details from the match data\n\
- Be encouraging about the match quality\n\
- Each message should feel personalized, not generic";

const ATTRIBUTES_SYSTEM_PROMPT: &str = "You are a fruit in a matchmaking system. Write a short, casual, first-person \
introduction describing your physical attributes. Be playful and personable, like a dating profile. Mention all known \
attributes naturally. For unknown attributes, either skip them or mention you're unsure. Keep it to 3-5 sentences. \
Do not use bullet points or lists.";

const PREFERENCES_SYSTEM_PROMPT: &str = "You are a fruit in a matchmaking system. Write a short, casual, first-person \
description of what you're looking for in a match. Be playful and personable, like a dating profile. Mention all stated \
preferences naturally. If you have no preferences, say you're open-minded. Keep it to 2-4 sentences. \
Do not use bullet points or lists.";

const MAX_HIGHLIGHTS: usize = 3;

/// What to do when match messages cannot be generated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NarrativePolicy {
    /// Store templated messages instead
    #[default]
    Fallback,
    /// Store no message text
    Omit,
    /// Fail the best-match step
    Fail,
}

/// Everything the generator needs to know about the chosen pair
#[derive(Debug, Clone)]
pub struct MatchContext<'a> {
    pub incoming_kind: FruitKind,
    pub scores: MatchScores,
    pub breakdown: MatchBreakdown,
    pub incoming_attributes: &'a FruitAttributes,
    pub incoming_preferences: &'a FruitPreferences,
    pub existing_attributes: &'a FruitAttributes,
    pub existing_preferences: &'a FruitPreferences,
}

impl MatchContext<'_> {
    fn existing_kind(&self) -> FruitKind {
        self.incoming_kind.opposite()
    }

    /// How the incoming fruit's preferences scored against the existing fruit
    fn incoming_breakdown(&self) -> &ScoreBreakdown {
        match self.incoming_kind {
            FruitKind::Apple => &self.breakdown.apple_on_orange,
            FruitKind::Orange => &self.breakdown.orange_on_apple,
        }
    }

    fn existing_breakdown(&self) -> &ScoreBreakdown {
        match self.incoming_kind {
            FruitKind::Apple => &self.breakdown.orange_on_apple,
            FruitKind::Orange => &self.breakdown.apple_on_orange,
        }
    }

    pub fn incoming_highlights(&self) -> Vec<String> {
        compatibility_highlights(
            self.incoming_breakdown(),
            self.incoming_preferences,
            self.existing_attributes,
        )
    }

    pub fn existing_highlights(&self) -> Vec<String> {
        compatibility_highlights(
            self.existing_breakdown(),
            self.existing_preferences,
            self.incoming_attributes,
        )
    }
}

/// Messages stored on the best match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchMessages {
    pub message_to_incoming: Option<String>,
    pub message_to_existing: Option<String>,
}

fn format_percentage(score: f64) -> String {
    format!("{}%", (score * 100.0).round() as i64)
}

/// Up to three phrases for satisfied, actually stated preferences
pub fn compatibility_highlights(
    breakdown: &ScoreBreakdown,
    preferences: &FruitPreferences,
    attributes: &FruitAttributes,
) -> Vec<String> {
    let mut highlights = Vec::new();

    for (attribute, score) in breakdown.iter() {
        if score != 1.0 {
            continue;
        }
        let phrase = match attribute {
            Attribute::HasWorm => (preferences.has_worm == Some(false)
                && attributes.has_worm == Some(false))
            .then(|| "both worm-free".to_string()),
            Attribute::HasChemicals => (preferences.has_chemicals == Some(false)
                && attributes.has_chemicals == Some(false))
            .then(|| "chemical-free match".to_string()),
            Attribute::ShineFactor => preferences
                .shine_factor
                .as_ref()
                .and(attributes.shine_factor)
                .map(|shine| format!("{} shine compatibility", shine)),
            Attribute::HasStem => (preferences.has_stem == Some(true)
                && attributes.has_stem == Some(true))
            .then(|| "stem lovers".to_string()),
            Attribute::HasLeaf => (preferences.has_leaf == Some(true)
                && attributes.has_leaf == Some(true))
            .then(|| "leaf enthusiasts".to_string()),
            Attribute::Size => preferences.size.map(|_| "size match".to_string()),
            Attribute::Weight => preferences.weight.map(|_| "weight compatibility".to_string()),
        };
        highlights.extend(phrase);
    }

    highlights.truncate(MAX_HIGHLIGHTS);
    highlights
}

fn highlight_line(highlights: &[String]) -> String {
    if highlights.is_empty() {
        String::new()
    } else {
        format!("Key compatibilities: {}.", highlights.join(", "))
    }
}

pub fn incoming_prompt(context: &MatchContext<'_>) -> String {
    format!(
        "Write a welcoming message for {incoming} who just arrived and was matched with {existing}.\n\n\
Match details:\n\
- Overall compatibility: {score}\n\
- The {incoming_kind} is the newcomer who just arrived\n\
{highlights}\n\n\
Tone: Excited and welcoming - they just arrived and found a great match!\n\
Keep it to 2-3 sentences.",
        incoming = context.incoming_kind.with_article(),
        existing = context.existing_kind().with_article(),
        score = format_percentage(context.scores.overall_score),
        incoming_kind = context.incoming_kind,
        highlights = highlight_line(&context.incoming_highlights()),
    )
}

pub fn existing_prompt(context: &MatchContext<'_>) -> String {
    format!(
        "Write a celebratory message for {existing} who has been waiting and now has a match with {incoming}.\n\n\
Match details:\n\
- Overall compatibility: {score}\n\
- The {existing_kind} was waiting and {incoming} just arrived\n\
{highlights}\n\n\
Tone: Reassuring and celebratory - the wait was worth it!\n\
Keep it to 2-3 sentences.",
        existing = context.existing_kind().with_article(),
        incoming = context.incoming_kind.with_article(),
        score = format_percentage(context.scores.overall_score),
        existing_kind = context.existing_kind(),
        highlights = highlight_line(&context.existing_highlights()),
    )
}

/// Templated stand-ins for the two match messages
pub fn fallback_match_messages(context: &MatchContext<'_>) -> MatchMessages {
    let score = format_percentage(context.scores.overall_score);

    let mut to_incoming = format!(
        "Welcome! You've been matched with {} at {} compatibility.",
        context.existing_kind().with_article(),
        score
    );
    let incoming_line = highlight_line(&context.incoming_highlights());
    if !incoming_line.is_empty() {
        to_incoming.push(' ');
        to_incoming.push_str(&incoming_line);
    }

    let mut to_existing = format!(
        "The wait is over! {} just arrived and you match at {} compatibility.",
        capitalize(context.incoming_kind.with_article()),
        score
    );
    let existing_line = highlight_line(&context.existing_highlights());
    if !existing_line.is_empty() {
        to_existing.push(' ');
        to_existing.push_str(&existing_line);
    }

    MatchMessages {
        message_to_incoming: Some(to_incoming),
        message_to_existing: Some(to_existing),
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Run a generator call with a deadline; a timeout counts as unavailability
async fn generate_with_timeout(
    generator: &dyn TextGenerator,
    request: &CompletionRequest,
    timeout: Duration,
) -> Result<String, GenerationError> {
    match tokio::time::timeout(timeout, generator.generate(request)).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::Timeout(timeout.as_secs())),
    }
}

/// Generate both match messages concurrently. Each side keeps its own result.
pub async fn generate_match_messages(
    generator: &dyn TextGenerator,
    context: &MatchContext<'_>,
    timeout: Duration,
) -> (Result<String, GenerationError>, Result<String, GenerationError>) {
    let incoming_request = CompletionRequest::new(MATCHMAKER_SYSTEM_PROMPT, incoming_prompt(context));
    let existing_request = CompletionRequest::new(MATCHMAKER_SYSTEM_PROMPT, existing_prompt(context));

    tokio::join!(
        generate_with_timeout(generator, &incoming_request, timeout),
        generate_with_timeout(generator, &existing_request, timeout),
    )
}

/// Produce the messages to store for the best match under the given policy.
///
/// The policy applies to each message on its own, so a generated message is kept even
/// when the other one is unavailable. Only `NarrativePolicy::Fail` returns an error.
pub async fn narrate_match(
    generator: &dyn TextGenerator,
    context: &MatchContext<'_>,
    policy: NarrativePolicy,
    timeout: Duration,
) -> Result<MatchMessages, GenerationError> {
    let (to_incoming, to_existing) = generate_match_messages(generator, context, timeout).await;

    if policy == NarrativePolicy::Fail {
        return Ok(MatchMessages {
            message_to_incoming: Some(to_incoming?),
            message_to_existing: Some(to_existing?),
        });
    }

    let fallback = fallback_match_messages(context);
    Ok(MatchMessages {
        message_to_incoming: resolve_message(to_incoming, fallback.message_to_incoming, policy, "incoming"),
        message_to_existing: resolve_message(to_existing, fallback.message_to_existing, policy, "existing"),
    })
}

fn resolve_message(
    generated: Result<String, GenerationError>,
    fallback: Option<String>,
    policy: NarrativePolicy,
    side: &str,
) -> Option<String> {
    match generated {
        Ok(text) => Some(text),
        Err(e) if policy == NarrativePolicy::Omit => {
            tracing::warn!("Message to {} fruit unavailable ({}), storing none", side, e);
            None
        }
        Err(e) => {
            tracing::warn!("Message to {} fruit unavailable ({}), using templated text", side, e);
            fallback
        }
    }
}

pub fn format_attributes_for_prompt(kind: FruitKind, attributes: &FruitAttributes) -> String {
    fn line<T: std::fmt::Display>(label: &str, value: Option<T>, unit: &str) -> String {
        match value {
            Some(v) => format!("{}: {}{}", label, v, unit),
            None => format!("{}: unknown", label),
        }
    }

    [
        format!("Fruit type: {}", kind),
        line("Size", attributes.size, " units (range: 2-14)"),
        line("Weight", attributes.weight, " grams (range: 50-350)"),
        line("Has stem", attributes.has_stem, ""),
        line("Has leaf", attributes.has_leaf, ""),
        line("Has worm", attributes.has_worm, ""),
        line("Shine factor", attributes.shine_factor, ""),
        line("Has chemicals", attributes.has_chemicals, ""),
    ]
    .join("\n")
}

fn describe_range(range: &NumberRange, unit: &str, joiner: &str) -> String {
    let mut parts = Vec::new();
    if let Some(min) = range.min {
        parts.push(format!("min {}{}", min, unit));
    }
    if let Some(max) = range.max {
        parts.push(format!("max {}{}", max, unit));
    }
    parts.join(joiner)
}

fn shine_list(preference: &ShinePreference, joiner: &str) -> String {
    preference
        .accepted()
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(joiner)
}

pub fn format_preferences_for_prompt(kind: FruitKind, preferences: &FruitPreferences) -> String {
    let mut lines = vec![format!(
        "Fruit type: {} (looking for {})",
        kind,
        kind.opposite().with_article()
    )];

    if preferences.is_empty() {
        lines.push("Preferences: none (completely open-minded)".to_string());
        return lines.join("\n");
    }

    if let Some(size) = &preferences.size {
        lines.push(format!("Size preference: {}", describe_range(size, "", ", ")));
    }
    if let Some(weight) = &preferences.weight {
        lines.push(format!("Weight preference: {}", describe_range(weight, "g", ", ")));
    }
    if let Some(stem) = preferences.has_stem {
        lines.push(format!("Wants stem: {}", stem));
    }
    if let Some(leaf) = preferences.has_leaf {
        lines.push(format!("Wants leaf: {}", leaf));
    }
    if let Some(worm) = preferences.has_worm {
        lines.push(format!("Wants worm: {}", worm));
    }
    if let Some(shine) = &preferences.shine_factor {
        lines.push(format!("Shine preference: {}", shine_list(shine, ", ")));
    }
    if let Some(chemicals) = preferences.has_chemicals {
        lines.push(format!("Wants chemicals: {}", chemicals));
    }

    lines.join("\n")
}

pub fn fallback_attributes(kind: FruitKind, attributes: &FruitAttributes) -> String {
    let mut parts = vec![format!("Hi, I'm {}.", kind.with_article())];

    match attributes.size {
        Some(size) => parts.push(format!("I'm {} units in size.", size)),
        None => parts.push("I'm not sure about my size.".to_string()),
    }
    match attributes.weight {
        Some(weight) => parts.push(format!("I weigh {}g.", weight)),
        None => parts.push("My weight is a mystery.".to_string()),
    }
    if let Some(stem) = attributes.has_stem {
        parts.push(if stem { "I have a stem." } else { "No stem here." }.to_string());
    }
    if let Some(leaf) = attributes.has_leaf {
        parts.push(if leaf { "I've got a leaf." } else { "No leaf." }.to_string());
    }
    if let Some(worm) = attributes.has_worm {
        parts.push(if worm { "I do have a worm." } else { "Worm-free." }.to_string());
    }
    if let Some(shine) = attributes.shine_factor {
        parts.push(format!("My shine is {}.", shine));
    }
    if let Some(chemicals) = attributes.has_chemicals {
        parts.push(if chemicals { "I've been treated with chemicals." } else { "Chemical-free." }.to_string());
    }

    parts.join(" ")
}

fn describe_range_sentence(label: &str, range: &NumberRange, unit: &str) -> Option<String> {
    match (range.min, range.max) {
        (Some(min), Some(max)) => Some(format!("{} between {}{} and {}{}.", label, min, unit, max, unit)),
        (Some(min), None) => Some(format!("{} at least {}{}.", label, min, unit)),
        (None, Some(max)) => Some(format!("{} at most {}{}.", label, max, unit)),
        (None, None) => None,
    }
}

pub fn fallback_preferences(kind: FruitKind, preferences: &FruitPreferences) -> String {
    let other = kind.opposite();
    if preferences.is_empty() {
        return format!("I'm open-minded about my {} match. No strict requirements.", other);
    }

    let mut parts = vec![format!("Here's what I'm looking for in {}.", other.with_article())];

    if let Some(sentence) = preferences.size.as_ref().and_then(|r| describe_range_sentence("Size", r, "")) {
        parts.push(sentence);
    }
    if let Some(sentence) = preferences.weight.as_ref().and_then(|r| describe_range_sentence("Weight", r, "g")) {
        parts.push(sentence);
    }
    if let Some(stem) = preferences.has_stem {
        parts.push(if stem { "I'd like a stem." } else { "No stem preferred." }.to_string());
    }
    if let Some(leaf) = preferences.has_leaf {
        parts.push(if leaf { "A leaf would be nice." } else { "No leaf needed." }.to_string());
    }
    if let Some(worm) = preferences.has_worm {
        parts.push(if worm { "A worm is fine." } else { "No worms please." }.to_string());
    }
    if let Some(shine) = &preferences.shine_factor {
        parts.push(format!("Shine: {}.", shine_list(shine, " or ")));
    }
    if let Some(chemicals) = preferences.has_chemicals {
        parts.push(if chemicals { "Chemicals are fine." } else { "Chemical-free preferred." }.to_string());
    }

    parts.join(" ")
}

/// Self-introduction and preference description of a new fruit. Never fails.
pub async fn describe_fruit(
    generator: &dyn TextGenerator,
    fruit: &NewFruit,
    timeout: Duration,
) -> Communication {
    let attributes = &fruit.profile.attributes;
    let preferences = &fruit.profile.preferences;

    let attributes_request = CompletionRequest::new(
        ATTRIBUTES_SYSTEM_PROMPT,
        format!(
            "Here are your attributes:\n{}\n\nWrite your self-introduction.",
            format_attributes_for_prompt(fruit.kind, attributes)
        ),
    )
    .with_temperature(0.9)
    .with_max_output_tokens(200);

    let preferences_request = CompletionRequest::new(
        PREFERENCES_SYSTEM_PROMPT,
        format!(
            "Here are your preferences:\n{}\n\nDescribe what you're looking for.",
            format_preferences_for_prompt(fruit.kind, preferences)
        ),
    )
    .with_temperature(0.9)
    .with_max_output_tokens(200);

    let (attributes_text, preferences_text) = tokio::join!(
        generate_with_timeout(generator, &attributes_request, timeout),
        generate_with_timeout(generator, &preferences_request, timeout),
    );

    Communication {
        attributes: attributes_text.unwrap_or_else(|e| {
            tracing::debug!("Attribute description unavailable ({}), using template", e);
            fallback_attributes(fruit.kind, attributes)
        }),
        preferences: preferences_text.unwrap_or_else(|e| {
            tracing::debug!("Preference description unavailable ({}), using template", e);
            fallback_preferences(fruit.kind, preferences)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scoring::compute_match_scores;
    use crate::models::{FruitProfile, ShineFactor};
    use crate::services::DisabledGenerator;
    use async_trait::async_trait;

    /// Answers the newcomer's prompt and refuses the waiting fruit's
    struct IncomingOnlyGenerator;

    #[async_trait]
    impl TextGenerator for IncomingOnlyGenerator {
        async fn generate(&self, request: &CompletionRequest) -> Result<String, GenerationError> {
            if request.user_prompt.starts_with("Write a welcoming message") {
                Ok("Welcome to the orchard!".to_string())
            } else {
                Err(GenerationError::ApiError("status 503".to_string()))
            }
        }
    }

    fn apple() -> FruitProfile {
        FruitProfile {
            attributes: FruitAttributes {
                size: Some(6.0),
                weight: Some(170.0),
                has_stem: Some(true),
                has_leaf: Some(false),
                has_worm: Some(false),
                shine_factor: Some(ShineFactor::Shiny),
                has_chemicals: Some(false),
            },
            preferences: FruitPreferences {
                has_worm: Some(false),
                has_chemicals: Some(false),
                shine_factor: Some(ShinePreference::AnyOf(vec![ShineFactor::Neutral, ShineFactor::Shiny])),
                size: Some(NumberRange::at_least(5.0)),
                ..Default::default()
            },
        }
    }

    fn orange() -> FruitProfile {
        FruitProfile {
            attributes: FruitAttributes {
                size: Some(8.0),
                weight: Some(200.0),
                has_stem: Some(false),
                has_leaf: Some(true),
                has_worm: Some(false),
                shine_factor: Some(ShineFactor::Shiny),
                has_chemicals: Some(false),
            },
            preferences: FruitPreferences::default(),
        }
    }

    fn context<'a>(apple: &'a FruitProfile, orange: &'a FruitProfile) -> MatchContext<'a> {
        let detailed = compute_match_scores(apple, orange);
        MatchContext {
            incoming_kind: FruitKind::Apple,
            scores: detailed.scores,
            breakdown: detailed.breakdown,
            incoming_attributes: &apple.attributes,
            incoming_preferences: &apple.preferences,
            existing_attributes: &orange.attributes,
            existing_preferences: &orange.preferences,
        }
    }

    #[test]
    fn test_highlights_capped_at_three() {
        let (a, o) = (apple(), orange());
        let ctx = context(&a, &o);
        let highlights = ctx.incoming_highlights();
        assert_eq!(
            highlights,
            vec!["size match", "both worm-free", "shiny shine compatibility"]
        );
    }

    #[test]
    fn test_no_highlights_without_preferences() {
        let (a, o) = (apple(), orange());
        let ctx = context(&a, &o);
        assert!(ctx.existing_highlights().is_empty());
    }

    #[test]
    fn test_incoming_prompt_mentions_score() {
        let (a, o) = (apple(), orange());
        let prompt = incoming_prompt(&context(&a, &o));
        assert!(prompt.contains("an apple who just arrived"));
        assert!(prompt.contains("Overall compatibility: 100%"));
        assert!(prompt.contains("Key compatibilities: size match"));
    }

    #[test]
    fn test_fallback_preferences_text() {
        assert_eq!(
            fallback_preferences(FruitKind::Apple, &FruitPreferences::default()),
            "I'm open-minded about my orange match. No strict requirements."
        );
        let text = fallback_preferences(FruitKind::Orange, &FruitPreferences {
            size: Some(NumberRange::between(5.0, 10.0)),
            has_worm: Some(false),
            ..Default::default()
        });
        assert_eq!(
            text,
            "Here's what I'm looking for in an apple. Size between 5 and 10. No worms please."
        );
    }

    #[test]
    fn test_prompt_formats_unknowns() {
        let text = format_attributes_for_prompt(FruitKind::Orange, &FruitAttributes::default());
        assert!(text.starts_with("Fruit type: orange"));
        assert!(text.contains("Size: unknown"));
        assert!(text.contains("Has chemicals: unknown"));
    }

    #[tokio::test]
    async fn test_policy_when_generator_disabled() {
        let (a, o) = (apple(), orange());
        let ctx = context(&a, &o);
        let timeout = Duration::from_secs(1);

        let fallback = narrate_match(&DisabledGenerator, &ctx, NarrativePolicy::Fallback, timeout)
            .await
            .unwrap();
        assert!(fallback.message_to_incoming.unwrap().contains("100% compatibility"));
        assert!(fallback.message_to_existing.unwrap().starts_with("The wait is over! An apple"));

        let omitted = narrate_match(&DisabledGenerator, &ctx, NarrativePolicy::Omit, timeout)
            .await
            .unwrap();
        assert_eq!(omitted, MatchMessages::default());

        let failed = narrate_match(&DisabledGenerator, &ctx, NarrativePolicy::Fail, timeout).await;
        assert!(matches!(failed, Err(GenerationError::MissingCredential)));
    }

    #[tokio::test]
    async fn test_one_failed_message_keeps_the_other() {
        let (a, o) = (apple(), orange());
        let ctx = context(&a, &o);
        let timeout = Duration::from_secs(1);

        let fallback = narrate_match(&IncomingOnlyGenerator, &ctx, NarrativePolicy::Fallback, timeout)
            .await
            .unwrap();
        assert_eq!(fallback.message_to_incoming.as_deref(), Some("Welcome to the orchard!"));
        assert!(fallback.message_to_existing.unwrap().starts_with("The wait is over!"));

        let omitted = narrate_match(&IncomingOnlyGenerator, &ctx, NarrativePolicy::Omit, timeout)
            .await
            .unwrap();
        assert_eq!(omitted.message_to_incoming.as_deref(), Some("Welcome to the orchard!"));
        assert!(omitted.message_to_existing.is_none());

        let failed = narrate_match(&IncomingOnlyGenerator, &ctx, NarrativePolicy::Fail, timeout).await;
        assert!(matches!(failed, Err(GenerationError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_describe_fruit_falls_back() {
        let fruit = NewFruit {
            kind: FruitKind::Apple,
            profile: orange(),
        };
        let communication = describe_fruit(&DisabledGenerator, &fruit, Duration::from_secs(1)).await;
        assert!(communication.attributes.starts_with("Hi, I'm an apple. I'm 8 units in size."));
        assert_eq!(
            communication.preferences,
            "I'm open-minded about my orange match. No strict requirements."
        );
    }
}
