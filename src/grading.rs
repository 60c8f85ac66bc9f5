//! Time-based star grading

use crate::exercises::{Difficulty, Exercise};

/// Target when neither an explicit target nor a difficulty is set (minutes)
pub const DEFAULT_TARGET_MINUTES: f64 = 5.0;

/// Two stars up to this multiple of the target
const TWO_STAR_FACTOR: f64 = 1.5;

/// Target solving time in minutes
pub fn target_minutes(exercise: &Exercise) -> f64 {
    if let Some(target) = exercise.target_minutes {
        return target;
    }
    match exercise.difficulty {
        Some(Difficulty::Easy) | None => DEFAULT_TARGET_MINUTES,
        Some(Difficulty::Medium) => 10.0,
        Some(Difficulty::Hard) => 20.0,
    }
}

/// Stars for a correct submission: 3 within target, 2 within 1.5x, 1 otherwise
pub fn grade(exercise: &Exercise, elapsed_ms: u64) -> u8 {
    let minutes = elapsed_ms as f64 / 60_000.0;
    let target = target_minutes(exercise);
    if minutes <= target {
        3
    } else if minutes <= target * TWO_STAR_FACTOR {
        2
    } else {
        1
    }
}

/// `Time: 4.5m / Target: 5m`
pub fn time_summary(exercise: &Exercise, elapsed_ms: u64) -> String {
    format!(
        "Time: {:.1}m / Target: {}m",
        elapsed_ms as f64 / 60_000.0,
        target_minutes(exercise)
    )
}
