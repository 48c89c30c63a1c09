use rand::seq::SliceRandom;
use rand::Rng;
use crate::models::{
    FruitAttributes, FruitKind, FruitPreferences, FruitProfile, NewFruit, NumberRange, ShineFactor,
    ShinePreference,
};

pub const SIZE_MIN: f64 = 2.0;
pub const SIZE_MAX: f64 = 14.0;
const SIZE_MEAN: f64 = 7.0;
const SIZE_STD_DEV: f64 = 2.0;

pub const WEIGHT_MIN: f64 = 50.0;
pub const WEIGHT_MAX: f64 = 350.0;
const WEIGHT_MEAN: f64 = 180.0;
const WEIGHT_STD_DEV: f64 = 50.0;

/// Probability that any single attribute is unknown
const NULL_PROBABILITY: f64 = 0.05;

/// Shine levels weighted towards neutral/shiny
const SHINE_BAG: [ShineFactor; 7] = [
    ShineFactor::Dull,
    ShineFactor::Neutral,
    ShineFactor::Neutral,
    ShineFactor::Shiny,
    ShineFactor::Shiny,
    ShineFactor::Shiny,
    ShineFactor::ExtraShiny,
];

#[derive(Debug, Clone, Copy)]
enum RangeShape {
    Both,
    MinOnly,
    MaxOnly,
}

const RANGE_SHAPES: [RangeShape; 3] = [RangeShape::Both, RangeShape::MinOnly, RangeShape::MaxOnly];

/// Normal sample via Box-Muller
fn random_normal<R: Rng + ?Sized>(rng: &mut R, mean: f64, std_dev: f64) -> f64 {
    // 1 - [0, 1) keeps u1 away from zero so ln stays finite
    let u1 = 1.0 - rng.gen::<f64>();
    let u2 = rng.gen::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    z0 * std_dev + mean
}

#[inline]
fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn random_normal_clamped<R: Rng + ?Sized>(
    rng: &mut R,
    mean: f64,
    std_dev: f64,
    min: f64,
    max: f64,
) -> f64 {
    round_tenth(random_normal(rng, mean, std_dev).clamp(min, max))
}

/// `Some(value())` unless the attribute comes out unknown
fn maybe_known<R, T, F>(rng: &mut R, value: F) -> Option<T>
where
    R: Rng + ?Sized,
    F: FnOnce(&mut R) -> T,
{
    if rng.gen_bool(NULL_PROBABILITY) {
        None
    } else {
        Some(value(rng))
    }
}

fn pick_shape<R: Rng + ?Sized>(rng: &mut R) -> RangeShape {
    RANGE_SHAPES[rng.gen_range(0..RANGE_SHAPES.len())]
}

fn build_range(shape: RangeShape, min: f64, max: f64) -> NumberRange {
    match shape {
        RangeShape::Both => NumberRange::between(min, max),
        RangeShape::MinOnly => NumberRange::at_least(min),
        RangeShape::MaxOnly => NumberRange::at_most(max),
    }
}

/// Random attributes; apples run slightly smaller and lighter, and usually keep their stem
pub fn generate_attributes<R: Rng + ?Sized>(kind: FruitKind, rng: &mut R) -> FruitAttributes {
    let (size_mean, weight_mean, stem_chance) = match kind {
        FruitKind::Apple => (SIZE_MEAN - 0.5, WEIGHT_MEAN - 10.0, 0.7),
        FruitKind::Orange => (SIZE_MEAN + 0.5, WEIGHT_MEAN + 10.0, 0.1),
    };

    FruitAttributes {
        size: maybe_known(rng, |r| {
            random_normal_clamped(r, size_mean, SIZE_STD_DEV, SIZE_MIN, SIZE_MAX)
        }),
        weight: maybe_known(rng, |r| {
            random_normal_clamped(r, weight_mean, WEIGHT_STD_DEV, WEIGHT_MIN, WEIGHT_MAX)
        }),
        has_stem: maybe_known(rng, |r| r.gen_bool(stem_chance)),
        has_leaf: maybe_known(rng, |r| r.gen_bool(0.25)),
        has_worm: maybe_known(rng, |r| r.gen_bool(0.08)),
        shine_factor: maybe_known(rng, |r| SHINE_BAG[r.gen_range(0..SHINE_BAG.len())]),
        has_chemicals: maybe_known(rng, |r| r.gen_bool(0.35)),
    }
}

/// Relaxed preferences loosely centred on the fruit's own attributes.
///
/// Most slots are left open and the ranges are generous.
pub fn generate_preferences<R: Rng + ?Sized>(attributes: &FruitAttributes, rng: &mut R) -> FruitPreferences {
    let mut preferences = FruitPreferences::default();

    if rng.gen_bool(0.4) {
        if let Some(size) = attributes.size {
            let margin = random_normal_clamped(rng, 2.5, 1.0, 1.5, 5.0);
            let preferred = size + random_normal(rng, 0.0, 1.0);
            preferences.size = Some(build_range(
                pick_shape(rng),
                round_tenth((preferred - margin).max(SIZE_MIN)),
                round_tenth((preferred + margin).min(SIZE_MAX)),
            ));
        }
    }

    if rng.gen_bool(0.35) {
        if let Some(weight) = attributes.weight {
            let margin = random_normal_clamped(rng, 40.0, 15.0, 20.0, 80.0);
            let preferred = weight + random_normal(rng, 0.0, 20.0);
            preferences.weight = Some(build_range(
                pick_shape(rng),
                (preferred - margin).max(WEIGHT_MIN).round(),
                (preferred + margin).min(WEIGHT_MAX).round(),
            ));
        }
    }

    if rng.gen_bool(0.25) {
        preferences.has_stem = Some(rng.gen_bool(0.6));
    }

    if rng.gen_bool(0.2) {
        preferences.has_leaf = Some(rng.gen_bool(0.5));
    }

    if rng.gen_bool(0.6) {
        preferences.has_worm = Some(false);
    }

    if rng.gen_bool(0.45) {
        let accepted_count = [1, 2, 2, 3][rng.gen_range(0..4)];
        preferences.shine_factor = Some(if accepted_count == 1 {
            ShinePreference::One(ShineFactor::ALL[rng.gen_range(0..ShineFactor::ALL.len())])
        } else {
            let mut levels: Vec<ShineFactor> = ShineFactor::ALL
                .choose_multiple(rng, accepted_count)
                .copied()
                .collect();
            levels.sort();
            ShinePreference::AnyOf(levels)
        });
    }

    if rng.gen_bool(0.4) {
        preferences.has_chemicals = Some(rng.gen_bool(0.2));
    }

    preferences
}

/// Generate a random fruit of the given kind
pub fn generate_fruit<R: Rng + ?Sized>(kind: FruitKind, rng: &mut R) -> NewFruit {
    let attributes = generate_attributes(kind, rng);
    let preferences = generate_preferences(&attributes, rng);

    NewFruit {
        kind,
        profile: FruitProfile {
            attributes,
            preferences,
        },
    }
}
