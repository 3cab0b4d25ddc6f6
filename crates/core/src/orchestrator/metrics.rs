//! Session-level metrics derived from current agent state.

use crate::agent::heuristics::{evidence_cues, rebuttal_cues};
use crate::model::{AgentProfile, DebateScores, MetricsPatch, STATE_MAX};

/// Engagement and clarity as normalized means over the students.
pub fn classroom_metrics(students: &[AgentProfile]) -> MetricsPatch {
    if students.is_empty() {
        return MetricsPatch {
            engagement: Some(0.0),
            clarity: Some(0.0),
            debate: None,
        };
    }
    let max = f64::from(STATE_MAX);
    let count = students.len() as f64;
    let engagement = students
        .iter()
        .map(|s| (0.6 * f64::from(s.state.attentiveness) + 0.4 * f64::from(s.state.behavior)) / max)
        .sum::<f64>()
        / count;
    let clarity = students
        .iter()
        .map(|s| f64::from(s.state.comprehension) / max)
        .sum::<f64>()
        / count;
    MetricsPatch {
        engagement: Some(engagement),
        clarity: Some(clarity),
        debate: None,
    }
}

const TARGET_SENTENCE_WORDS: f64 = 18.0;

/// Rubric for one debate argument. Every score is in `[0, 1]`.
pub fn score_argument(argument: &str) -> DebateScores {
    let words = argument.split_whitespace().count();
    let sentences = argument
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1);

    let argument_strength = (words as f64 / 120.0).min(1.0);
    let evidence = (evidence_cues(argument) as f64 * 0.25).min(1.0);
    let clarity = if words == 0 {
        0.0
    } else {
        let average = words as f64 / sentences as f64;
        (1.0 - (average - TARGET_SENTENCE_WORDS).abs() / TARGET_SENTENCE_WORDS).clamp(0.0, 1.0)
    };
    let rebuttal = (rebuttal_cues(argument) as f64 * 0.34).min(1.0);
    let overall = (argument_strength + evidence + clarity + rebuttal) / 4.0;

    DebateScores {
        argument_strength,
        evidence,
        clarity,
        rebuttal,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AgentKind, Persona};

    fn student(persona: Persona) -> AgentProfile {
        AgentProfile {
            id: persona.label().into(),
            kind: AgentKind::Student(persona),
            name: persona.label().into(),
            state: persona.initial_state(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_classroom_metrics_are_normalized_means() {
        let patch = classroom_metrics(&[student(Persona::Curious), student(Persona::Disruptive)]);
        // Curious (8, 7, 6) and Disruptive (4, 2, 5).
        assert!(close(patch.engagement.unwrap(), (0.76 + 0.32) / 2.0));
        assert!(close(patch.clarity.unwrap(), 0.55));
    }

    #[test]
    fn test_empty_roster_scores_zero() {
        let patch = classroom_metrics(&[]);
        assert_eq!(patch.engagement, Some(0.0));
    }

    #[test]
    fn test_rubric_stays_in_unit_range() {
        let long = "Because the data shows 40 percent growth, however critics disagree. ".repeat(30);
        for text in ["", "No.", long.as_str(), "According to one study, but also evidence."] {
            let scores = score_argument(text);
            for value in [
                scores.argument_strength,
                scores.evidence,
                scores.clarity,
                scores.rebuttal,
                scores.overall,
            ] {
                assert!((0.0..=1.0).contains(&value), "{text}: {value}");
            }
        }
    }

    #[test]
    fn test_rubric_rewards_evidence_and_rebuttal() {
        let weak = score_argument("Uniforms are good.");
        let strong = score_argument(
            "According to a district study, uniforms cut reported bullying by 20 percent. \
             However, critics say they limit expression, but the evidence on safety outweighs that concern.",
        );
        assert!(strong.evidence > weak.evidence);
        assert!(strong.rebuttal > weak.rebuttal);
        assert!(strong.overall > weak.overall);
    }
}
