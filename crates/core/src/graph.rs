//! Communication Graph Engine
//!
//! Keeps the directed "who can talk to whom" topology of a session and records
//! every time an edge fires. Edges live in an arena keyed by `"{from}->{to}"`,
//! so an ordered pair can never own two edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::model::{AgentKind, AgentProfile, Persona, RelationshipOverride};

/// Maximum number of activations kept in the durable history.
pub const ACTIVATION_HISTORY_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    Good,
    Neutral,
    Bad,
}

impl Relationship {
    /// Edge weight is always derived from the relationship quality.
    pub fn weight(&self) -> f64 {
        match self {
            Relationship::Good => 0.85,
            Relationship::Neutral => 0.55,
            Relationship::Bad => 0.25,
        }
    }
}

/// Symmetric persona compatibility used to seed student-to-student edges.
pub fn persona_compatibility(a: Persona, b: Persona) -> Relationship {
    let pair = if a <= b { (a, b) } else { (b, a) };
    match pair {
        (Persona::Curious, Persona::Diligent) => Relationship::Good,
        (Persona::Distracted, Persona::Disruptive) => Relationship::Bad,
        _ => Relationship::Neutral,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Teacher,
    Student,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Broadcast,
    Direct,
    Reply,
    PeerReaction,
    Feedback,
    Argument,
    Rebuttal,
    Transcript,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub relationship: Relationship,
    pub weight: f64,
    pub interaction_types: Vec<InteractionType>,
    pub current_turn_active: bool,
    pub activation_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activated_at: Option<DateTime<Utc>>,
}

impl GraphEdge {
    fn new(from: &str, to: &str, relationship: Relationship) -> Self {
        Self {
            id: edge_id(from, to),
            from: from.to_string(),
            to: to.to_string(),
            relationship,
            weight: relationship.weight(),
            interaction_types: Vec::new(),
            current_turn_active: false,
            activation_count: 0,
            last_activated_at: None,
        }
    }

    fn set_relationship(&mut self, relationship: Relationship) {
        self.relationship = relationship;
        self.weight = relationship.weight();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationPayload {
    pub text: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub metadata: serde_json::Value,
}

impl ActivationPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activation {
    pub id: String,
    pub turn_id: String,
    pub edge_id: String,
    pub from: String,
    pub to: String,
    pub interaction_type: InteractionType,
    pub payload: ActivationPayload,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: BTreeMap<String, GraphEdge>,
    pub activations: VecDeque<Activation>,
    pub current_turn_activations: Vec<Activation>,
}

pub fn edge_id(from: &str, to: &str) -> String {
    format!("{from}->{to}")
}

impl CommunicationGraph {
    /// Builds the classroom topology.
    ///
    /// Teacher and every student are linked both ways at neutral weight. Every
    /// student pair gets a bidirectional edge whose quality comes from
    /// [`persona_compatibility`]; supervisor overrides are applied last.
    pub fn for_classroom(
        teacher: &AgentProfile,
        students: &[AgentProfile],
        overrides: &[RelationshipOverride],
    ) -> Self {
        let mut graph = Self::default();
        graph.nodes.push(GraphNode {
            id: teacher.id.clone(),
            label: teacher.name.clone(),
            kind: NodeKind::Teacher,
        });
        for student in students {
            graph.nodes.push(GraphNode {
                id: student.id.clone(),
                label: student.name.clone(),
                kind: NodeKind::Student,
            });
            graph.insert_pair(&teacher.id, &student.id, Relationship::Neutral);
        }

        for (i, a) in students.iter().enumerate() {
            for b in students.iter().skip(i + 1) {
                let quality = match (a.kind, b.kind) {
                    (AgentKind::Student(pa), AgentKind::Student(pb)) => {
                        persona_compatibility(pa, pb)
                    }
                    _ => Relationship::Neutral,
                };
                graph.insert_pair(&a.id, &b.id, quality);
            }
        }

        for rule in overrides {
            let known = |id: &str| students.iter().any(|s| s.id == id);
            if rule.a == rule.b || !known(&rule.a) || !known(&rule.b) {
                tracing::warn!(a = %rule.a, b = %rule.b, "Ignoring relationship override for unknown pair");
                continue;
            }
            graph.insert_pair(&rule.a, &rule.b, rule.quality);
        }
        graph
    }

    /// Builds the small fixed debate topology: user, coach and an optional judge.
    pub fn for_debate(user: &AgentProfile, coach: &AgentProfile, judge: Option<&AgentProfile>) -> Self {
        let mut graph = Self::default();
        graph.nodes.push(GraphNode {
            id: user.id.clone(),
            label: user.name.clone(),
            kind: NodeKind::User,
        });
        graph.nodes.push(GraphNode {
            id: coach.id.clone(),
            label: coach.name.clone(),
            kind: NodeKind::Teacher,
        });
        graph.insert_pair(&user.id, &coach.id, Relationship::Neutral);
        if let Some(judge) = judge {
            graph.nodes.push(GraphNode {
                id: judge.id.clone(),
                label: judge.name.clone(),
                kind: NodeKind::Teacher,
            });
            graph.insert_edge(&user.id, &judge.id, Relationship::Neutral);
            graph.insert_edge(&coach.id, &judge.id, Relationship::Neutral);
        }
        graph
    }

    fn insert_pair(&mut self, a: &str, b: &str, relationship: Relationship) {
        self.insert_edge(a, b, relationship);
        self.insert_edge(b, a, relationship);
    }

    fn insert_edge(&mut self, from: &str, to: &str, relationship: Relationship) {
        self.edges
            .entry(edge_id(from, to))
            .and_modify(|edge| edge.set_relationship(relationship))
            .or_insert_with(|| GraphEdge::new(from, to, relationship));
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&GraphEdge> {
        self.edges.get(&edge_id(from, to))
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// Clears per-turn activity. The durable activation history is kept.
    pub fn reset_current_turn_activity(&mut self) {
        for edge in self.edges.values_mut() {
            edge.current_turn_active = false;
        }
        self.current_turn_activations.clear();
    }

    /// Fires the `from -> to` edge for `turn_id`, creating it at neutral weight if missing.
    pub fn activate_edge(
        &mut self,
        turn_id: &str,
        from: &str,
        to: &str,
        interaction_type: InteractionType,
        payload: ActivationPayload,
    ) -> Activation {
        let now = Utc::now();
        let edge = self
            .edges
            .entry(edge_id(from, to))
            .or_insert_with(|| GraphEdge::new(from, to, Relationship::Neutral));
        edge.current_turn_active = true;
        edge.activation_count += 1;
        edge.last_activated_at = Some(now);
        if !edge.interaction_types.contains(&interaction_type) {
            edge.interaction_types.push(interaction_type);
        }

        let activation = Activation {
            id: uuid::Uuid::new_v4().to_string(),
            turn_id: turn_id.to_string(),
            edge_id: edge.id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            interaction_type,
            payload,
            created_at: now,
        };
        self.current_turn_activations.push(activation.clone());
        if self.activations.len() == ACTIVATION_HISTORY_CAPACITY {
            self.activations.pop_front();
        }
        self.activations.push_back(activation.clone());
        activation
    }

    /// Edges sorted by weight, then by how often they fired.
    pub fn strongest_edges(&self, limit: usize) -> Vec<&GraphEdge> {
        let mut edges: Vec<&GraphEdge> = self.edges.values().collect();
        edges.sort_by(|a, b| {
            b.weight
                .total_cmp(&a.weight)
                .then(b.activation_count.cmp(&a.activation_count))
                .then(a.id.cmp(&b.id))
        });
        edges.truncate(limit);
        edges
    }

    /// Most recent activations touching `node_id`, oldest first.
    pub fn recent_activations_involving(&self, node_id: &str, limit: usize) -> Vec<&Activation> {
        let mut recent: Vec<&Activation> = self
            .activations
            .iter()
            .rev()
            .filter(|a| a.from == node_id || a.to == node_id)
            .take(limit)
            .collect();
        recent.reverse();
        recent
    }

    /// Every activation in the history addressed to `node_id`, oldest first.
    pub fn messages_to<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Activation> + 'a {
        self.activations.iter().filter(move |a| a.to == node_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AgentState;

    fn profile(id: &str, kind: AgentKind) -> AgentProfile {
        AgentProfile {
            id: id.to_string(),
            kind,
            name: id.to_uppercase(),
            state: AgentState::neutral(kind.label()),
        }
    }

    fn classroom() -> CommunicationGraph {
        let teacher = profile("t", AgentKind::Teacher);
        let students = vec![
            profile("s1", AgentKind::Student(Persona::Curious)),
            profile("s2", AgentKind::Student(Persona::Diligent)),
            profile("s3", AgentKind::Student(Persona::Disruptive)),
            profile("s4", AgentKind::Student(Persona::Distracted)),
        ];
        CommunicationGraph::for_classroom(&teacher, &students, &[])
    }

    #[test]
    fn test_classroom_topology() {
        let graph = classroom();
        assert_eq!(graph.nodes.len(), 5);
        // 4 teacher pairs + 6 student pairs, both directions.
        assert_eq!(graph.edges.len(), (4 + 6) * 2);
        assert_eq!(graph.edge("t", "s3").unwrap().weight, 0.55);
        assert_eq!(graph.edge("s1", "s2").unwrap().relationship, Relationship::Good);
        assert_eq!(graph.edge("s2", "s1").unwrap().weight, 0.85);
        assert_eq!(graph.edge("s4", "s3").unwrap().relationship, Relationship::Bad);
        assert_eq!(graph.edge("s1", "s3").unwrap().relationship, Relationship::Neutral);
    }

    #[test]
    fn test_overrides_win_in_both_directions() {
        let teacher = profile("t", AgentKind::Teacher);
        let students = vec![
            profile("s1", AgentKind::Student(Persona::Curious)),
            profile("s2", AgentKind::Student(Persona::Diligent)),
        ];
        let overrides = vec![RelationshipOverride {
            a: "s2".into(),
            b: "s1".into(),
            quality: Relationship::Bad,
        }];
        let graph = CommunicationGraph::for_classroom(&teacher, &students, &overrides);
        assert_eq!(graph.edge("s1", "s2").unwrap().weight, 0.25);
        assert_eq!(graph.edge("s2", "s1").unwrap().weight, 0.25);
    }

    #[test]
    fn test_compatibility_is_symmetric() {
        let all = [
            Persona::Curious,
            Persona::Diligent,
            Persona::Distracted,
            Persona::Disruptive,
            Persona::Shy,
        ];
        for a in all {
            for b in all {
                assert_eq!(persona_compatibility(a, b), persona_compatibility(b, a));
            }
        }
    }

    #[test]
    fn test_debate_topology_with_judge() {
        let user = profile("user", AgentKind::Debater);
        let coach = profile("coach", AgentKind::Teacher);
        let judge = profile("judge", AgentKind::Judge);
        let graph = CommunicationGraph::for_debate(&user, &coach, Some(&judge));
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 4);
        assert!(graph.edge("coach", "judge").is_some());
        assert!(graph.edge("judge", "coach").is_none());
    }

    #[test]
    fn test_activating_missing_edge_creates_exactly_one() {
        let mut graph = classroom();
        let before = graph.edges.len();
        graph.activate_edge("turn", "s1", "x9", InteractionType::Direct, ActivationPayload::text("hi"));
        graph.activate_edge("turn", "s1", "x9", InteractionType::Reply, ActivationPayload::text("again"));
        assert_eq!(graph.edges.len(), before + 1);
        let edge = graph.edge("s1", "x9").unwrap();
        assert_eq!(edge.relationship, Relationship::Neutral);
        assert_eq!(edge.activation_count, 2);
        assert_eq!(
            edge.interaction_types,
            vec![InteractionType::Direct, InteractionType::Reply]
        );
    }

    #[test]
    fn test_activation_records_turn_and_history() {
        let mut graph = classroom();
        let activation = graph.activate_edge(
            "turn-1",
            "t",
            "s1",
            InteractionType::Broadcast,
            ActivationPayload::text("Open your books"),
        );
        assert_eq!(activation.edge_id, "t->s1");
        assert!(graph.edge("t", "s1").unwrap().current_turn_active);
        assert_eq!(graph.current_turn_activations.len(), 1);
        assert_eq!(graph.activations.len(), 1);
        assert_eq!(graph.messages_to("s1").count(), 1);
        assert_eq!(graph.messages_to("s2").count(), 0);
    }

    #[test]
    fn test_reset_is_idempotent_and_keeps_history() {
        let mut graph = classroom();
        graph.activate_edge("t1", "t", "s1", InteractionType::Direct, ActivationPayload::text("a"));
        graph.activate_edge("t1", "s1", "t", InteractionType::Reply, ActivationPayload::text("b"));

        graph.reset_current_turn_activity();
        let once = graph.clone();
        graph.reset_current_turn_activity();

        assert_eq!(graph, once);
        assert!(graph.current_turn_activations.is_empty());
        assert!(graph.edges.values().all(|edge| !edge.current_turn_active));
        assert_eq!(graph.activations.len(), 2);
    }

    #[test]
    fn test_history_is_capped_fifo() {
        let mut graph = classroom();
        for i in 0..(ACTIVATION_HISTORY_CAPACITY + 25) {
            graph.activate_edge(
                &format!("turn-{i}"),
                "t",
                "s1",
                InteractionType::Direct,
                ActivationPayload::text(i.to_string()),
            );
        }
        assert_eq!(graph.activations.len(), ACTIVATION_HISTORY_CAPACITY);
        assert_eq!(graph.activations.front().unwrap().turn_id, "turn-25");
        assert_eq!(
            graph.activations.back().unwrap().turn_id,
            format!("turn-{}", ACTIVATION_HISTORY_CAPACITY + 24)
        );
    }

    #[test]
    fn test_strongest_edges_prefers_weight() {
        let graph = classroom();
        let top = graph.strongest_edges(2);
        assert!(top.iter().all(|edge| edge.relationship == Relationship::Good));
    }
}
