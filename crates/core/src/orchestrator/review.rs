//! Review-phase evaluation of the students in the active assignment.

use crate::model::{AgentProfile, AgentState, AgentStatePatch, TaskAssignment};

pub const PASS_THRESHOLD: f64 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    pub student_id: String,
    pub signal: f64,
    pub passed: bool,
    pub patch: AgentStatePatch,
}

impl ReviewOutcome {
    pub fn feedback(&self) -> String {
        if self.passed {
            format!("Solid work on the task (score {:.1}). Keep it up.", self.signal)
        } else {
            format!(
                "Let's revisit the task together (score {:.1}); ask me when you get stuck.",
                self.signal
            )
        }
    }
}

pub fn performance_signal(state: &AgentState) -> f64 {
    0.4 * f64::from(state.comprehension) + 0.35 * f64::from(state.attentiveness) + 0.25 * f64::from(state.behavior)
}

/// One outcome per assigned student still on the roster, in assignment order.
pub fn evaluate(assignment: &TaskAssignment, students: &[AgentProfile]) -> Vec<ReviewOutcome> {
    assignment
        .student_ids()
        .filter_map(|id| students.iter().find(|s| s.id == id))
        .map(|student| {
            let signal = performance_signal(&student.state);
            let passed = signal >= PASS_THRESHOLD;
            let step = if passed { 1 } else { -1 };
            ReviewOutcome {
                student_id: student.id.clone(),
                signal,
                passed,
                patch: AgentStatePatch {
                    comprehension: step,
                    behavior: step,
                    ..Default::default()
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentKind, AssignedBy, AssignmentMode, Persona, TaskGroup};
    use chrono::Utc;

    fn student(id: &str, persona: Persona) -> AgentProfile {
        AgentProfile {
            id: id.into(),
            kind: AgentKind::Student(persona),
            name: id.into(),
            state: persona.initial_state(),
        }
    }

    #[test]
    fn test_review_passes_and_fails() {
        let assignment = TaskAssignment {
            mode: AssignmentMode::Pair,
            groups: vec![TaskGroup {
                id: "p1".into(),
                student_ids: vec!["s1".into(), "s2".into(), "gone".into()],
            }],
            assigned_by: AssignedBy::TeacherAgent,
            assigned_at: Utc::now(),
            lesson_turn: 3,
        };
        let students = [student("s1", Persona::Diligent), student("s2", Persona::Disruptive)];
        let outcomes = evaluate(&assignment, &students);

        assert_eq!(outcomes.len(), 2);
        // Diligent: 0.4*7 + 0.35*7 + 0.25*9 = 7.5
        assert!(outcomes[0].passed);
        assert_eq!(outcomes[0].patch.comprehension, 1);
        // Disruptive: 0.4*5 + 0.35*4 + 0.25*2 = 3.9
        assert!(!outcomes[1].passed);
        assert_eq!(outcomes[1].patch.behavior, -1);
        assert!(outcomes[1].feedback().contains("revisit"));
    }
}
