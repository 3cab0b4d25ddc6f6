//! API Models
//!
//! Request and response bodies for the REST surface. Domain values come from
//! `lyceum-core`; the wrappers here only add the `utoipa` schema metadata.

use chrono::{DateTime, Utc};
use lyceum_core::graph::CommunicationGraph;
use lyceum_core::model::{
    AgentProfile, AssignmentMode, Channel, ClassroomRuntime, SessionConfig, SessionEvent,
    SessionMetrics, SessionMode, TaskGroup, Turn,
};
use lyceum_core::orchestrator::{TaskAssignmentRequest, TurnOutcome, TurnResult};
use lyceum_core::service::{CreateSessionRequest, CreatedSession, HintReceipt, SessionSummary};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionPayload {
    #[schema(value_type = String, example = "classroom")]
    pub mode: SessionMode,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "supervised")]
    pub channel: Option<Channel>,
    #[schema(example = "Fractions")]
    pub topic: String,
    #[schema(example = "demo")]
    pub classroom_id: String,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub config: Option<SessionConfig>,
}

impl From<CreateSessionPayload> for CreateSessionRequest {
    fn from(payload: CreateSessionPayload) -> Self {
        Self {
            mode: payload.mode,
            channel: payload.channel,
            topic: payload.topic,
            classroom_id: payload.classroom_id,
            config: payload.config,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionCreatedResponse {
    pub session_id: String,
    #[schema(value_type = String, example = "classroom")]
    pub mode: SessionMode,
    #[schema(value_type = String, example = "unsupervised")]
    pub channel: Channel,
}

impl From<CreatedSession> for SessionCreatedResponse {
    fn from(created: CreatedSession) -> Self {
        Self {
            session_id: created.session_id,
            mode: created.mode,
            channel: created.channel,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryResponse {
    pub session_id: String,
    #[schema(value_type = String, example = "classroom")]
    pub mode: SessionMode,
    #[schema(value_type = String, example = "supervised")]
    pub channel: Channel,
    pub topic: String,
    pub lesson_plan: Vec<String>,
    #[schema(value_type = Vec<Object>)]
    pub agents: Vec<AgentProfile>,
    #[schema(value_type = Vec<Object>)]
    pub turns: Vec<Turn>,
    #[schema(value_type = Object)]
    pub metrics: SessionMetrics,
    #[schema(value_type = Object)]
    pub communication_graph: CommunicationGraph,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub classroom_runtime: Option<ClassroomRuntime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SessionSummary> for SessionSummaryResponse {
    fn from(summary: SessionSummary) -> Self {
        Self {
            session_id: summary.session_id,
            mode: summary.mode,
            channel: summary.channel,
            topic: summary.topic,
            lesson_plan: summary.lesson_plan,
            agents: summary.agents,
            turns: summary.turns,
            metrics: summary.metrics,
            communication_graph: summary.communication_graph,
            classroom_runtime: summary.classroom_runtime,
            created_at: summary.created_at,
            updated_at: summary.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
pub struct ProcessTurnPayload {
    #[schema(example = "Today we compare halves and quarters.")]
    pub message: String,
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TurnResponse {
    /// Absent when the turn paused before anything was recorded.
    pub turn_id: Option<String>,
    #[schema(value_type = String, example = "completed")]
    pub outcome: TurnOutcome,
    #[schema(value_type = Vec<Object>)]
    pub turns: Vec<Turn>,
    #[schema(value_type = Vec<Object>)]
    pub events: Vec<SessionEvent>,
    #[schema(value_type = Object)]
    pub metrics: SessionMetrics,
    #[schema(value_type = Object)]
    pub communication_graph: CommunicationGraph,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub classroom_runtime: Option<ClassroomRuntime>,
}

impl From<TurnResult> for TurnResponse {
    fn from(result: TurnResult) -> Self {
        Self {
            turn_id: result.turn_id,
            outcome: result.outcome,
            turns: result.turns,
            events: result.events,
            metrics: result.metrics,
            communication_graph: result.communication_graph,
            classroom_runtime: result.classroom_runtime,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorHintPayload {
    #[schema(example = "Check on the quiet students.")]
    pub hint_text: String,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct HintResponse {
    pub queued: usize,
}

impl From<HintReceipt> for HintResponse {
    fn from(receipt: HintReceipt) -> Self {
        Self {
            queued: receipt.queued,
        }
    }
}

#[derive(Deserialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignmentPayload {
    #[schema(value_type = String, example = "pair")]
    pub mode: AssignmentMode,
    #[serde(default)]
    #[schema(value_type = Option<Vec<Object>>)]
    pub groups: Option<Vec<TaskGroup>>,
    #[serde(default)]
    pub autonomous_grouping: bool,
}

impl From<TaskAssignmentPayload> for TaskAssignmentRequest {
    fn from(payload: TaskAssignmentPayload) -> Self {
        Self {
            mode: payload.mode,
            groups: payload.groups,
            autonomous_grouping: payload.autonomous_grouping,
        }
    }
}

#[derive(Serialize, ToSchema, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ClassroomRuntimeResponse {
    #[schema(value_type = Object)]
    pub classroom_runtime: ClassroomRuntime,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyceum_core::graph::Relationship;
    use serde_json::json;

    #[test]
    fn test_create_session_payload_defaults() {
        let payload: CreateSessionPayload = serde_json::from_value(json!({
            "mode": "classroom",
            "topic": "Fractions",
            "classroomId": "demo"
        }))
        .unwrap();
        let request = CreateSessionRequest::from(payload);
        assert_eq!(request.mode, SessionMode::Classroom);
        assert_eq!(request.channel, None);
        assert!(request.config.is_none());
    }

    #[test]
    fn test_create_session_payload_with_config() {
        let payload: CreateSessionPayload = serde_json::from_value(json!({
            "mode": "classroom",
            "channel": "supervised",
            "topic": "Fractions",
            "classroomId": "demo",
            "config": {
                "minResponders": 1,
                "maxResponders": 2,
                "relationships": [{ "a": "s1", "b": "s2", "quality": "bad" }]
            }
        }))
        .unwrap();
        assert_eq!(payload.channel, Some(Channel::Supervised));
        let config = payload.config.unwrap();
        assert_eq!(config.max_responders, Some(2));
        assert_eq!(config.relationships[0].quality, Relationship::Bad);
        assert!(!config.include_judge);
    }

    #[test]
    fn test_unknown_mode_is_rejected() {
        let result = serde_json::from_value::<CreateSessionPayload>(json!({
            "mode": "lecture_hall",
            "topic": "Fractions",
            "classroomId": "demo"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_task_assignment_payload() {
        let payload: TaskAssignmentPayload = serde_json::from_value(json!({
            "mode": "pair",
            "groups": [{ "id": "p1", "studentIds": ["s1", "s2"] }]
        }))
        .unwrap();
        let request = TaskAssignmentRequest::from(payload);
        assert_eq!(request.mode, AssignmentMode::Pair);
        assert!(!request.autonomous_grouping);
        assert_eq!(request.groups.unwrap()[0].student_ids, vec!["s1", "s2"]);
    }

    #[test]
    fn test_hint_payload_uses_camel_case() {
        let payload: SupervisorHintPayload =
            serde_json::from_value(json!({ "hintText": "slow down" })).unwrap();
        assert_eq!(payload.hint_text, "slow down");
    }
}
