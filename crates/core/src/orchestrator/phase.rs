//! Lesson phase machine. The phase is a pure function of lesson progress.

use crate::model::Phase;

/// `(practice_start, review_start)` for a plan of `plan_len` steps.
pub fn thresholds(plan_len: usize) -> (usize, usize) {
    (plan_len.div_ceil(3), (plan_len * 2).div_ceil(3))
}

/// Number of teacher turns so far, clamped to the plan length.
pub fn lesson_turn(teacher_turns: usize, plan_len: usize) -> usize {
    teacher_turns.min(plan_len)
}

pub fn phase_for(lesson_turn: usize, plan_len: usize) -> Phase {
    let (practice_start, review_start) = thresholds(plan_len);
    if lesson_turn < practice_start {
        Phase::Lecture
    } else if lesson_turn < review_start {
        Phase::Practice
    } else {
        Phase::Review
    }
}

/// Zero-based position inside the practice phase and the phase length.
pub fn practice_position(lesson_turn: usize, plan_len: usize) -> (usize, usize) {
    let (practice_start, review_start) = thresholds(plan_len);
    let span = review_start.saturating_sub(practice_start).max(1);
    (lesson_turn.saturating_sub(practice_start).min(span - 1), span)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nine_step_plan_thresholds() {
        assert_eq!(thresholds(9), (3, 6));
        assert_eq!(phase_for(0, 9), Phase::Lecture);
        assert_eq!(phase_for(2, 9), Phase::Lecture);
        assert_eq!(phase_for(3, 9), Phase::Practice);
        assert_eq!(phase_for(5, 9), Phase::Practice);
        assert_eq!(phase_for(6, 9), Phase::Review);
        assert_eq!(phase_for(9, 9), Phase::Review);
    }

    #[test]
    fn test_phase_is_monotonic() {
        for plan_len in 3..=15 {
            let mut previous = Phase::Lecture;
            for teacher_turns in 0..plan_len + 5 {
                let phase = phase_for(lesson_turn(teacher_turns, plan_len), plan_len);
                assert!(phase >= previous, "plan {plan_len}, turn {teacher_turns}");
                previous = phase;
            }
            assert_eq!(previous, Phase::Review);
        }
    }

    #[test]
    fn test_lesson_turn_is_clamped() {
        assert_eq!(lesson_turn(40, 9), 9);
        assert_eq!(lesson_turn(4, 9), 4);
    }

    #[test]
    fn test_practice_position() {
        assert_eq!(practice_position(3, 9), (0, 3));
        assert_eq!(practice_position(5, 9), (2, 3));
        assert_eq!(practice_position(8, 9), (2, 3));
    }
}
