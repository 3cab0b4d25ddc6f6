//! Builds the per-agent context bundles from a session snapshot.

use std::collections::HashSet;

use crate::agent::{DebateContext, StudentContext, TeacherContext};
use crate::graph::Activation;
use crate::model::{AgentProfile, ClassroomRuntime, Session, TurnRole};

const STRONGEST_EDGE_LIMIT: usize = 5;
const RECENT_ACTIVATION_LIMIT: usize = 8;
const RECENT_STUDENT_TURN_LIMIT: usize = 6;
const DEBATE_TRANSCRIPT_LIMIT: usize = 6;

fn speaker(session: &Session, id: &str) -> String {
    session
        .agent(id)
        .map(|agent| agent.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn describe_activation(session: &Session, activation: &Activation) -> String {
    format!(
        "{} -> {} [{:?}]: {}",
        speaker(session, &activation.from),
        speaker(session, &activation.to),
        activation.interaction_type,
        activation.payload.text
    )
}

pub fn teacher_context(
    session: &Session,
    teacher: &AgentProfile,
    runtime: &ClassroomRuntime,
    message: &str,
    supervisor_hint: Option<String>,
) -> TeacherContext {
    let graph = &session.communication_graph;
    let strongest_edges = graph
        .strongest_edges(STRONGEST_EDGE_LIMIT)
        .into_iter()
        .map(|edge| {
            format!(
                "{} -> {} ({:?}, {:.2})",
                speaker(session, &edge.from),
                speaker(session, &edge.to),
                edge.relationship,
                edge.weight
            )
        })
        .collect();
    let recent_activations = graph
        .recent_activations_involving(&teacher.id, RECENT_ACTIVATION_LIMIT)
        .into_iter()
        .map(|activation| describe_activation(session, activation))
        .collect();

    let mut recent_student_turns: Vec<String> = session
        .turns
        .iter()
        .rev()
        .filter(|turn| turn.role == TurnRole::Agent)
        .take(RECENT_STUDENT_TURN_LIMIT)
        .map(|turn| {
            let name = turn
                .agent_id
                .as_deref()
                .map(|id| speaker(session, id))
                .unwrap_or_else(|| "Student".to_string());
            format!("{name}: {}", turn.content)
        })
        .collect();
    recent_student_turns.reverse();

    TeacherContext {
        topic: session.topic.clone(),
        message: message.to_string(),
        lesson_step: lesson_step(&session.lesson_plan, runtime.lesson_turn),
        lesson_turn: runtime.lesson_turn,
        phase: Some(runtime.phase),
        assignment_summary: runtime.active_task_assignment.as_ref().map(|a| a.summary()),
        strongest_edges,
        recent_activations,
        recent_student_turns,
        supervisor_hint,
    }
}

/// The plan step for `lesson_turn`; past the end of the plan the last step is kept.
fn lesson_step(plan: &[String], lesson_turn: usize) -> Option<String> {
    plan.get(lesson_turn.min(plan.len().saturating_sub(1))).cloned()
}

/// Messages addressed to the student merged with its own turns, oldest first.
///
/// The same text reaching the student twice in one turn (broadcast and direct)
/// counts once.
pub fn student_context(session: &Session, student: &AgentProfile) -> StudentContext {
    let mut lines = Vec::new();
    let mut latest_addressed = None;
    let mut seen = HashSet::new();

    for activation in session.communication_graph.messages_to(&student.id) {
        if !seen.insert((activation.turn_id.as_str(), activation.payload.text.as_str())) {
            continue;
        }
        lines.push((
            activation.created_at,
            format!("{}: {}", speaker(session, &activation.from), activation.payload.text),
        ));
        latest_addressed = Some(activation.payload.text.clone());
    }
    for turn in session
        .turns
        .iter()
        .filter(|turn| turn.agent_id.as_deref() == Some(student.id.as_str()))
    {
        lines.push((turn.created_at, format!("Me: {}", turn.content)));
    }
    // Stable: activations logged in the same instant keep their order.
    lines.sort_by_key(|(at, _)| *at);

    StudentContext {
        topic: session.topic.clone(),
        knowledge: lines.into_iter().map(|(_, line)| line).collect(),
        latest_addressed,
    }
}

pub fn debate_context(session: &Session, argument: &str, judge_present: bool) -> DebateContext {
    // The newest turn is the argument itself.
    let history = session.turns.len().saturating_sub(1);
    let start = history.saturating_sub(DEBATE_TRANSCRIPT_LIMIT);
    let transcript = session.turns[start..history]
        .iter()
        .map(|turn| {
            let role = match turn.role {
                TurnRole::Teacher => "Coach",
                TurnRole::User => "Debater",
                TurnRole::Agent => "Agent",
                TurnRole::System => "System",
            };
            format!("{role}: {}", turn.content)
        })
        .collect();
    DebateContext {
        topic: session.topic.clone(),
        argument: argument.to_string(),
        transcript,
        judge_present,
    }
}
