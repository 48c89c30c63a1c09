use crate::models::{
    FruitAttributes, FruitPreferences, FruitProfile, MatchBreakdown, MatchScores, NumberRange,
    ScoreBreakdown, ShineFactor, ShinePreference,
};

/// Number of scored attribute slots
pub const ATTRIBUTE_COUNT: f64 = 7.0;

/// One side's preferences scored against the other side's attributes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalScore {
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Scores for a pair plus both breakdowns
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailedMatchScores {
    pub scores: MatchScores,
    pub breakdown: MatchBreakdown,
}

/// Score a numeric attribute against a range preference.
///
/// No preference scores 1.0 whatever the value; an unknown value scores 0.0 against
/// any stated range; otherwise 1.0 inside the range (bounds inclusive), 0.0 outside.
#[inline]
pub fn score_range(preference: Option<&NumberRange>, value: Option<f64>) -> f64 {
    let Some(range) = preference else {
        return 1.0;
    };
    match value {
        Some(v) if range.contains(v) => 1.0,
        _ => 0.0,
    }
}

/// Score a boolean attribute against a boolean preference
#[inline]
pub fn score_flag(preference: Option<bool>, value: Option<bool>) -> f64 {
    let Some(wanted) = preference else {
        return 1.0;
    };
    match value {
        Some(v) if v == wanted => 1.0,
        _ => 0.0,
    }
}

/// Score the shine level against one or more accepted levels
#[inline]
pub fn score_shine(preference: Option<&ShinePreference>, value: Option<ShineFactor>) -> f64 {
    let Some(accepted) = preference else {
        return 1.0;
    };
    match value {
        Some(level) if accepted.accepts(level) => 1.0,
        _ => 0.0,
    }
}

/// Score all of A's preferences against B's attributes.
///
/// The directional score is the unweighted mean of the seven per-attribute scores.
pub fn score_preferences(prefs: &FruitPreferences, attrs: &FruitAttributes) -> DirectionalScore {
    let breakdown = ScoreBreakdown {
        size: score_range(prefs.size.as_ref(), attrs.size),
        weight: score_range(prefs.weight.as_ref(), attrs.weight),
        has_stem: score_flag(prefs.has_stem, attrs.has_stem),
        has_leaf: score_flag(prefs.has_leaf, attrs.has_leaf),
        has_worm: score_flag(prefs.has_worm, attrs.has_worm),
        shine_factor: score_shine(prefs.shine_factor.as_ref(), attrs.shine_factor),
        has_chemicals: score_flag(prefs.has_chemicals, attrs.has_chemicals),
    };

    let total: f64 = breakdown.iter().map(|(_, s)| s).sum();

    DirectionalScore {
        score: total / ATTRIBUTE_COUNT,
        breakdown,
    }
}

/// Compute both directional scores of an apple/orange pair and their mean
pub fn compute_match_scores(apple: &FruitProfile, orange: &FruitProfile) -> DetailedMatchScores {
    let apple_on_orange = score_preferences(&apple.preferences, &orange.attributes);
    let orange_on_apple = score_preferences(&orange.preferences, &apple.attributes);

    DetailedMatchScores {
        scores: MatchScores {
            score_apple_on_orange: apple_on_orange.score,
            score_orange_on_apple: orange_on_apple.score,
            overall_score: (apple_on_orange.score + orange_on_apple.score) / 2.0,
        },
        breakdown: MatchBreakdown {
            apple_on_orange: apple_on_orange.breakdown,
            orange_on_apple: orange_on_apple.breakdown,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known_attributes() -> FruitAttributes {
        FruitAttributes {
            size: Some(7.5),
            weight: Some(180.0),
            has_stem: Some(true),
            has_leaf: Some(false),
            has_worm: Some(false),
            shine_factor: Some(ShineFactor::Shiny),
            has_chemicals: Some(false),
        }
    }

    #[test]
    fn test_range_scoring() {
        let pref = NumberRange::between(5.0, 10.0);
        assert_eq!(score_range(Some(&pref), Some(7.5)), 1.0);
        assert_eq!(score_range(Some(&pref), Some(12.0)), 0.0);
        assert_eq!(score_range(Some(&pref), None), 0.0);
        assert_eq!(score_range(None, None), 1.0);
    }

    #[test]
    fn test_open_ranges() {
        assert_eq!(score_range(Some(&NumberRange::at_least(5.0)), Some(100.0)), 1.0);
        assert_eq!(score_range(Some(&NumberRange::at_least(5.0)), Some(4.9)), 0.0);
        assert_eq!(score_range(Some(&NumberRange::at_most(5.0)), Some(5.0)), 1.0);
        // A range with neither bound is still a stated preference
        assert_eq!(score_range(Some(&NumberRange::default()), Some(3.0)), 1.0);
        assert_eq!(score_range(Some(&NumberRange::default()), None), 0.0);
    }

    #[test]
    fn test_flag_scoring() {
        assert_eq!(score_flag(Some(false), Some(false)), 1.0);
        assert_eq!(score_flag(Some(false), Some(true)), 0.0);
        assert_eq!(score_flag(Some(true), None), 0.0);
        assert_eq!(score_flag(None, Some(true)), 1.0);
    }

    #[test]
    fn test_shine_scoring() {
        let single = ShinePreference::One(ShineFactor::Dull);
        let set = ShinePreference::AnyOf(vec![ShineFactor::Neutral, ShineFactor::Shiny]);
        assert_eq!(score_shine(Some(&single), Some(ShineFactor::Dull)), 1.0);
        assert_eq!(score_shine(Some(&single), Some(ShineFactor::Shiny)), 0.0);
        assert_eq!(score_shine(Some(&set), Some(ShineFactor::Shiny)), 1.0);
        assert_eq!(score_shine(Some(&set), Some(ShineFactor::ExtraShiny)), 0.0);
        assert_eq!(score_shine(Some(&set), None), 0.0);
        assert_eq!(score_shine(Some(&ShinePreference::AnyOf(vec![])), Some(ShineFactor::Dull)), 0.0);
    }

    #[test]
    fn test_directional_score_is_mean_of_seven() {
        let prefs = FruitPreferences {
            size: Some(NumberRange::between(5.0, 10.0)),
            has_stem: Some(false),
            ..Default::default()
        };
        let result = score_preferences(&prefs, &known_attributes());

        assert_eq!(result.breakdown.size, 1.0);
        assert_eq!(result.breakdown.has_stem, 0.0);
        assert_eq!(result.score, 6.0 / 7.0);
    }

    #[test]
    fn test_empty_preferences_score_one() {
        let empty = FruitProfile {
            attributes: known_attributes(),
            preferences: FruitPreferences::default(),
        };
        let detailed = compute_match_scores(&empty, &empty);
        assert_eq!(detailed.scores.overall_score, 1.0);
    }

    #[test]
    fn test_combined_score_is_mean_of_directions() {
        let apple = FruitProfile {
            attributes: known_attributes(),
            preferences: FruitPreferences {
                has_worm: Some(true),
                ..Default::default()
            },
        };
        let orange = FruitProfile {
            attributes: FruitAttributes::default(),
            preferences: FruitPreferences::default(),
        };

        let detailed = compute_match_scores(&apple, &orange);

        assert_eq!(detailed.scores.score_apple_on_orange, 6.0 / 7.0);
        assert_eq!(detailed.scores.score_orange_on_apple, 1.0);
        assert_eq!(detailed.scores.overall_score, (6.0 / 7.0 + 1.0) / 2.0);
        assert_eq!(detailed.breakdown.apple_on_orange.has_worm, 0.0);
    }
}
