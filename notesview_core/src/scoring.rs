// Round scoring, grades, and achievement titles.
//
// A correct answer earns
//   round((base + round(base * speed_ratio)) * combo_boost)
// where `speed_ratio = max(0, (max_time - time_spent) / max_time)` and
// `combo_boost = 1 + min(combo * 0.05, 0.5)`. `combo` is the streak before
// this answer, so the first correct answer of a streak gets no boost.
// A wrong answer (or timeout) costs `round(base * penalty_ratio)` and resets
// the combo; see `session.rs` for where these are applied.
//
// Grades and achievement titles are fixed threshold tables scanned from the
// highest threshold down.

use serde::{Deserialize, Serialize};

/// Combo boost per consecutive correct answer.
pub const COMBO_STEP: f64 = 0.05;

/// Maximum combo boost (reached at a streak of 10).
pub const COMBO_CAP: f64 = 0.5;

/// Points for one round. Zero when incorrect.
///
/// Times are in milliseconds; a `max_time_ms` of zero yields no speed bonus.
pub fn calculate_score(
    time_spent_ms: u64,
    max_time_ms: u64,
    is_correct: bool,
    combo: u32,
    base_score: i64,
) -> i64 {
    if !is_correct {
        return 0;
    }
    let base = base_score as f64;
    let speed_ratio = if max_time_ms == 0 {
        0.0
    } else {
        ((max_time_ms as f64 - time_spent_ms as f64) / max_time_ms as f64).max(0.0)
    };
    let speed_bonus = (base * speed_ratio).round();
    let combo_boost = 1.0 + (combo as f64 * COMBO_STEP).min(COMBO_CAP);
    ((base + speed_bonus) * combo_boost).round() as i64
}

/// Points lost on a wrong answer.
pub fn wrong_penalty(base_score: i64, penalty_ratio: f64) -> i64 {
    (base_score as f64 * penalty_ratio).round() as i64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    F,
}

/// Minimum score for each grade, highest first.
pub const GRADE_THRESHOLDS: [(Grade, i64); 6] = [
    (Grade::S, 950),
    (Grade::A, 900),
    (Grade::B, 800),
    (Grade::C, 700),
    (Grade::D, 600),
    (Grade::F, 0),
];

/// Highest grade whose threshold `score` meets; `F` otherwise (including
/// negative scores).
pub fn score_grade(score: i64) -> Grade {
    GRADE_THRESHOLDS
        .iter()
        .find(|(_, min)| score >= *min)
        .map(|(grade, _)| *grade)
        .unwrap_or(Grade::F)
}

/// Lifetime title earned from cumulative score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Achievement {
    Novice,
    Apprentice,
    Musician,
    Virtuoso,
    Maestro,
}

pub const ACHIEVEMENT_THRESHOLDS: [(Achievement, i64); 5] = [
    (Achievement::Maestro, 50_000),
    (Achievement::Virtuoso, 10_000),
    (Achievement::Musician, 5_000),
    (Achievement::Apprentice, 1_000),
    (Achievement::Novice, 0),
];

pub fn achievement_for(total_score: i64) -> Achievement {
    ACHIEVEMENT_THRESHOLDS
        .iter()
        .find(|(_, min)| total_score >= *min)
        .map(|(title, _)| *title)
        .unwrap_or(Achievement::Novice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instant_answer_earns_full_speed_bonus() {
        assert_eq!(calculate_score(0, 12_000, true, 0, 100), 200);
    }

    #[test]
    fn answer_at_limit_earns_base_only() {
        assert_eq!(calculate_score(12_000, 12_000, true, 0, 100), 100);
        // Past the limit the ratio clamps at zero.
        assert_eq!(calculate_score(20_000, 12_000, true, 0, 100), 100);
    }

    #[test]
    fn incorrect_scores_zero() {
        assert_eq!(calculate_score(0, 12_000, false, 5, 100), 0);
    }

    #[test]
    fn speed_bonus_rounds() {
        // ratio 0.75 -> bonus 112.5 -> 113 (half rounds up for positives)
        assert_eq!(calculate_score(2_250, 9_000, true, 0, 150), 263);
    }

    #[test]
    fn combo_boost_grows_then_caps() {
        assert_eq!(calculate_score(0, 1_000, true, 1, 100), 210);
        assert_eq!(calculate_score(0, 1_000, true, 4, 100), 240);
        assert_eq!(calculate_score(0, 1_000, true, 10, 100), 300);
        assert_eq!(calculate_score(0, 1_000, true, 40, 100), 300);
    }

    #[test]
    fn zero_time_limit_has_no_bonus() {
        assert_eq!(calculate_score(0, 0, true, 0, 100), 100);
    }

    #[test]
    fn penalty_is_half_base() {
        assert_eq!(wrong_penalty(100, 0.5), 50);
        assert_eq!(wrong_penalty(150, 0.5), 75);
        assert_eq!(wrong_penalty(300, 0.5), 150);
    }

    #[test]
    fn grades_scan_from_highest() {
        assert_eq!(score_grade(1_200), Grade::S);
        assert_eq!(score_grade(950), Grade::S);
        assert_eq!(score_grade(949), Grade::A);
        assert_eq!(score_grade(800), Grade::B);
        assert_eq!(score_grade(650), Grade::D);
        assert_eq!(score_grade(10), Grade::F);
        assert_eq!(score_grade(-300), Grade::F);
    }

    #[test]
    fn achievements_by_total_score() {
        assert_eq!(achievement_for(0), Achievement::Novice);
        assert_eq!(achievement_for(999), Achievement::Novice);
        assert_eq!(achievement_for(1_000), Achievement::Apprentice);
        assert_eq!(achievement_for(12_345), Achievement::Virtuoso);
        assert_eq!(achievement_for(50_000), Achievement::Maestro);
    }
}
