//! Deterministic state-update heuristics.
//!
//! Every delta is a pure function of the message a student heard and its
//! persona. Deltas are small and bounded; clamping to the state range happens
//! when the patch is applied.

use crate::model::{AgentState, AgentStatePatch, EngagementDelta, Persona};

const INTERACTIVE_CUES: &[&str] = &[
    "?",
    "discuss",
    "your turn",
    "try",
    "what do you think",
    "share",
    "work with",
];
const EXAMPLE_CUES: &[&str] = &["for example", "e.g.", "imagine", "picture", "such as", "like this"];
const ASSESSMENT_CUES: &[&str] = &["quiz", "check", "test", "explain back", "in your own words"];
const EVIDENCE_CUES: &[&str] = &[
    "because", "evidence", "data", "study", "research", "source", "percent", "according to",
];
const REBUTTAL_CUES: &[&str] = &["however", "but", "although", "on the other hand", "counter"];

/// Long monologues lose the room.
const LONG_MESSAGE_WORDS: usize = 80;
/// Very short instructions without cues do not hold attention either.
const TERSE_MESSAGE_WORDS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageSignals {
    pub word_count: usize,
    pub interactive: bool,
    pub example: bool,
    pub assessment: bool,
}

pub fn analyze(text: &str) -> MessageSignals {
    let lower = text.to_lowercase();
    let has_any = |cues: &[&str]| cues.iter().any(|cue| lower.contains(cue));
    MessageSignals {
        word_count: text.split_whitespace().count(),
        interactive: has_any(INTERACTIVE_CUES),
        example: has_any(EXAMPLE_CUES),
        assessment: has_any(ASSESSMENT_CUES),
    }
}

/// Classroom state delta for a student of `persona` who heard a message with `signals`.
pub fn classroom_delta(persona: Persona, signals: &MessageSignals) -> AgentStatePatch {
    let mut attentiveness: i8 = 0;
    let mut behavior: i8 = 0;
    let mut comprehension: i8 = 0;

    if signals.interactive {
        attentiveness += 1;
    }
    if signals.example {
        comprehension += 1;
    }
    if signals.assessment {
        attentiveness += 1;
        behavior += 1;
    }
    if signals.word_count > LONG_MESSAGE_WORDS {
        attentiveness -= 1;
        comprehension -= 1;
    }
    let cueless = !signals.interactive && !signals.example && !signals.assessment;
    if cueless && signals.word_count <= TERSE_MESSAGE_WORDS {
        attentiveness -= 1;
    }

    match persona {
        Persona::Curious if signals.example => comprehension += 1,
        Persona::Distracted if !signals.interactive => attentiveness -= 1,
        Persona::Disruptive if signals.interactive => behavior += 1,
        Persona::Disruptive => behavior -= 1,
        Persona::Shy if signals.interactive => behavior -= 1,
        Persona::Diligent if signals.assessment => comprehension += 1,
        _ => {}
    }

    AgentStatePatch {
        attentiveness: attentiveness.clamp(-2, 2),
        behavior: behavior.clamp(-2, 2),
        comprehension: comprehension.clamp(-2, 2),
        ..Default::default()
    }
}

/// Delta for the `[0, 1]` engagement shape used by the debate persona.
pub fn engagement_delta(signals: &MessageSignals) -> EngagementDelta {
    let mut delta = EngagementDelta {
        fatigue: 0.02,
        ..Default::default()
    };
    if signals.interactive {
        delta.attention += 0.05;
        delta.boredom -= 0.03;
    }
    if signals.example {
        delta.knowledge_retention += 0.05;
    }
    if signals.assessment {
        delta.knowledge_retention += 0.03;
    }
    if signals.word_count > LONG_MESSAGE_WORDS {
        delta.boredom += 0.05;
        delta.attention -= 0.05;
        delta.fatigue += 0.03;
    }
    delta
}

/// How many prior lines a student can hold on to. Ranges from 1 to 6.
pub fn knowledge_window(state: &AgentState) -> usize {
    1 + (usize::from(state.attentiveness) + usize::from(state.comprehension)) / 4
}

fn cue_count(text: &str, cues: &[&str]) -> usize {
    let lower = text.to_lowercase();
    cues.iter().filter(|cue| lower.contains(*cue)).count()
}

pub fn evidence_cues(text: &str) -> usize {
    let digits = usize::from(text.chars().any(|c| c.is_ascii_digit()));
    cue_count(text, EVIDENCE_CUES) + digits
}

pub fn rebuttal_cues(text: &str) -> usize {
    cue_count(text, REBUTTAL_CUES)
}
