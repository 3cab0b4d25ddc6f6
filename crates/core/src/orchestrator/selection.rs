//! Responder-subset selection.
//!
//! Which students answer on a turn is a deterministic function of how much has
//! happened in the session so far, so repeated runs pick the same students.

use crate::model::{AgentProfile, SessionConfig};

const DEFAULT_MAX_RESPONDERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponderWindow {
    pub min: usize,
    pub max: usize,
}

impl ResponderWindow {
    /// Applies defaults and clamps to `1 <= min <= max <= student_count`.
    pub fn from_config(config: &SessionConfig, student_count: usize) -> Self {
        let ceiling = student_count.max(1);
        let max = config
            .max_responders
            .unwrap_or(DEFAULT_MAX_RESPONDERS)
            .clamp(1, ceiling);
        let min = config.min_responders.unwrap_or(1).clamp(1, max);
        Self { min, max }
    }

    pub fn span(&self) -> usize {
        self.max - self.min + 1
    }
}

/// Rotates the roster by `seed % n` and keeps the first `min + seed % span` students.
pub fn select_responders(students: &[AgentProfile], seed: usize, window: ResponderWindow) -> Vec<AgentProfile> {
    if students.is_empty() {
        return Vec::new();
    }
    let size = (window.min + seed % window.span()).min(students.len());
    let start = seed % students.len();
    students
        .iter()
        .cycle()
        .skip(start)
        .take(size)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentKind, Persona};

    fn roster(n: usize) -> Vec<AgentProfile> {
        (1..=n)
            .map(|i| AgentProfile {
                id: format!("s{i}"),
                kind: AgentKind::Student(Persona::Curious),
                name: format!("Student {i}"),
                state: Persona::Curious.initial_state(),
            })
            .collect()
    }

    fn ids(selected: &[AgentProfile]) -> Vec<&str> {
        selected.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_window_defaults_and_clamps() {
        let window = ResponderWindow::from_config(&SessionConfig::default(), 2);
        assert_eq!(window, ResponderWindow { min: 1, max: 2 });

        let config = SessionConfig {
            min_responders: Some(5),
            max_responders: Some(9),
            ..Default::default()
        };
        assert_eq!(ResponderWindow::from_config(&config, 4), ResponderWindow { min: 4, max: 4 });

        let config = SessionConfig {
            min_responders: Some(0),
            ..Default::default()
        };
        assert_eq!(ResponderWindow::from_config(&config, 4).min, 1);
    }

    #[test]
    fn test_selection_rotates_deterministically() {
        let students = roster(4);
        let window = ResponderWindow { min: 1, max: 3 };
        assert_eq!(ids(&select_responders(&students, 0, window)), vec!["s1"]);
        assert_eq!(ids(&select_responders(&students, 1, window)), vec!["s2", "s3"]);
        assert_eq!(ids(&select_responders(&students, 2, window)), vec!["s3", "s4", "s1"]);
        assert_eq!(
            select_responders(&students, 7, window),
            select_responders(&students, 7, window)
        );
    }

    #[test]
    fn test_selection_stays_within_window() {
        let students = roster(5);
        let window = ResponderWindow { min: 2, max: 4 };
        for seed in 0..50 {
            let selected = select_responders(&students, seed, window);
            assert!((2..=4).contains(&selected.len()));
            let mut unique = ids(&selected);
            unique.sort_unstable();
            unique.dedup();
            assert_eq!(unique.len(), selected.len());
        }
    }
}
