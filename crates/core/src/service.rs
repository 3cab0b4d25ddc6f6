//! Simulation Service
//!
//! The operations the HTTP/API collaborator calls. This layer resolves rosters
//! and lesson plans, builds new sessions and forwards turn processing to the
//! [`TurnOrchestrator`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::agent::AgentRegistry;
use crate::bus::RealtimeBus;
use crate::curriculum::CurriculumService;
use crate::error::{Result, SimulationError};
use crate::graph::CommunicationGraph;
use crate::llm_client::TextCompletion;
use crate::model::{
    AgentKind, AgentProfile, AgentState, Channel, ClassroomRuntime, EngagementState, Session, SessionConfig,
    SessionEvent, SessionEventType, SessionMetrics, SessionMode, Turn,
};
use crate::orchestrator::{TaskAssignmentRequest, TurnOrchestrator, TurnResult};
use crate::roster::RosterRepository;
use crate::store::SessionStore;

/// How many turns a session summary carries.
pub const SUMMARY_TURN_WINDOW: usize = 8;

const TEACHER_ID: &str = "teacher";
const COACH_ID: &str = "coach";
const DEBATER_ID: &str = "user";
const JUDGE_ID: &str = "judge";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub mode: SessionMode,
    #[serde(default)]
    pub channel: Option<Channel>,
    pub topic: String,
    pub classroom_id: String,
    #[serde(default)]
    pub config: Option<SessionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub session_id: String,
    pub mode: SessionMode,
    pub channel: Channel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub mode: SessionMode,
    pub channel: Channel,
    pub topic: String,
    pub lesson_plan: Vec<String>,
    pub agents: Vec<AgentProfile>,
    pub turns: Vec<Turn>,
    pub metrics: SessionMetrics,
    pub communication_graph: CommunicationGraph,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classroom_runtime: Option<ClassroomRuntime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            mode: session.mode,
            channel: session.channel,
            topic: session.topic.clone(),
            lesson_plan: session.lesson_plan.clone(),
            agents: session.agents.clone(),
            turns: session.last_turns(SUMMARY_TURN_WINDOW),
            metrics: session.metrics.clone(),
            communication_graph: session.communication_graph.clone(),
            classroom_runtime: session.classroom_runtime.clone(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintReceipt {
    /// Hints waiting to be applied, including this one.
    pub queued: usize,
}

pub struct SimulationService {
    store: Arc<SessionStore>,
    bus: RealtimeBus,
    roster: Arc<dyn RosterRepository>,
    curriculum: Arc<dyn CurriculumService>,
    orchestrator: TurnOrchestrator,
}

impl SimulationService {
    pub fn new(
        store: Arc<SessionStore>,
        bus: RealtimeBus,
        roster: Arc<dyn RosterRepository>,
        curriculum: Arc<dyn CurriculumService>,
        completion: Arc<dyn TextCompletion>,
    ) -> Self {
        Self::with_agents(store, bus, roster, curriculum, AgentRegistry::new(completion))
    }

    pub fn with_agents(
        store: Arc<SessionStore>,
        bus: RealtimeBus,
        roster: Arc<dyn RosterRepository>,
        curriculum: Arc<dyn CurriculumService>,
        agents: AgentRegistry,
    ) -> Self {
        let orchestrator = TurnOrchestrator::new(store.clone(), bus.clone(), agents);
        Self {
            store,
            bus,
            roster,
            curriculum,
            orchestrator,
        }
    }

    pub fn bus(&self) -> &RealtimeBus {
        &self.bus
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    #[instrument(skip(self, request), fields(mode = ?request.mode, classroom_id = %request.classroom_id))]
    pub async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        let topic = request.topic.trim();
        if topic.is_empty() {
            return Err(SimulationError::bad_request("topic must not be empty"));
        }
        let config = request.config.unwrap_or_default();
        if let (Some(min), Some(max)) = (config.min_responders, config.max_responders) {
            if min > max {
                return Err(SimulationError::bad_request(format!(
                    "minResponders ({min}) exceeds maxResponders ({max})"
                )));
            }
        }

        let records = self
            .roster
            .classroom_roster(&request.classroom_id)
            .await
            .map_err(|err| SimulationError::from_backend("roster lookup failed", &err))?
            .ok_or_else(|| SimulationError::not_found("classroom", request.classroom_id.as_str()))?;
        if records.is_empty() {
            return Err(SimulationError::bad_request(format!(
                "classroom '{}' has no students",
                request.classroom_id
            )));
        }

        let channel = request.channel.unwrap_or_default();
        let (agents, graph, lesson_plan, runtime) = match request.mode {
            SessionMode::Classroom => {
                let lesson_plan = match &config.lesson_plan {
                    Some(plan) if plan.len() < 3 => {
                        return Err(SimulationError::bad_request(
                            "a custom lesson plan needs at least three steps",
                        ));
                    }
                    Some(plan) => plan.clone(),
                    None => self
                        .curriculum
                        .lesson_plan(topic)
                        .await
                        .map_err(|err| SimulationError::from_backend("lesson plan failed", &err))?,
                };
                let teacher = AgentProfile {
                    id: TEACHER_ID.to_string(),
                    kind: AgentKind::Teacher,
                    name: "Teacher".to_string(),
                    state: AgentState::neutral("teacher"),
                };
                let students: Vec<AgentProfile> = records
                    .into_iter()
                    .map(|record| AgentProfile {
                        id: record.id,
                        kind: AgentKind::Student(record.persona),
                        name: record.name,
                        state: record.persona.initial_state(),
                    })
                    .collect();
                let graph = CommunicationGraph::for_classroom(&teacher, &students, &config.relationships);
                let mut agents = vec![teacher];
                agents.extend(students);
                (agents, graph, lesson_plan, Some(ClassroomRuntime::default()))
            }
            SessionMode::Debate => {
                let coach = AgentProfile {
                    id: COACH_ID.to_string(),
                    kind: AgentKind::Teacher,
                    name: "Coach".to_string(),
                    state: AgentState::neutral("coach"),
                };
                let debater = AgentProfile {
                    id: DEBATER_ID.to_string(),
                    kind: AgentKind::Debater,
                    name: "Debater".to_string(),
                    state: AgentState {
                        engagement: Some(EngagementState::default()),
                        ..AgentState::neutral("debater")
                    },
                };
                let judge = config.include_judge.then(|| AgentProfile {
                    id: JUDGE_ID.to_string(),
                    kind: AgentKind::Judge,
                    name: "Judge".to_string(),
                    state: AgentState::neutral("judge"),
                });
                let graph = CommunicationGraph::for_debate(&debater, &coach, judge.as_ref());
                let mut agents = vec![coach, debater];
                agents.extend(judge);
                (agents, graph, Vec::new(), None)
            }
        };

        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            mode: request.mode,
            channel,
            topic: topic.to_string(),
            classroom_id: request.classroom_id,
            config,
            lesson_plan,
            agents,
            communication_graph: graph,
            turns: Vec::new(),
            events: Vec::new(),
            metrics: SessionMetrics::default(),
            classroom_runtime: runtime,
            supervisor_hints: VecDeque::new(),
            created_at: now,
            updated_at: now,
        };
        let session = self.store.create_session(session).await?;

        let event = SessionEvent::new(
            SessionEventType::SessionCreated,
            json!({
                "mode": session.mode,
                "channel": session.channel,
                "topic": session.topic,
                "agents": session.agents.len(),
            }),
        );
        self.store.append_events(&session.id, std::slice::from_ref(&event)).await?;
        self.bus.publish_events(&session.id, std::slice::from_ref(&event));
        info!(session_id = %session.id, agents = session.agents.len(), "Session created");

        Ok(CreatedSession {
            session_id: session.id,
            mode: session.mode,
            channel: session.channel,
        })
    }

    pub async fn get_session_summary(&self, session_id: &str) -> Result<SessionSummary> {
        self.store.read(session_id, |session| SessionSummary::from(session)).await
    }

    /// Removes a session once any in-flight turn has finished.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn end_session(&self, session_id: &str) -> Result<()> {
        let _turn_guard = self.store.lock_turns(session_id).await?;
        let session = self.store.remove_session(session_id).await?;
        info!(turns = session.turns.len(), "Session ended");
        Ok(())
    }

    pub async fn process_turn(&self, session_id: &str, message: &str) -> Result<TurnResult> {
        self.orchestrator.process_turn(session_id, message).await
    }

    /// Queues a supervisor hint for the next classroom turn.
    #[instrument(skip(self, text), fields(session_id = %session_id))]
    pub async fn submit_supervisor_hint(&self, session_id: &str, text: &str) -> Result<HintReceipt> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SimulationError::bad_request("hint must not be empty"));
        }
        let (mode, channel) = self
            .store
            .read(session_id, |session| (session.mode, session.channel))
            .await?;
        if mode != SessionMode::Classroom || channel != Channel::Supervised {
            return Err(SimulationError::bad_request(
                "hints are only accepted by supervised classroom sessions",
            ));
        }

        let queued = self
            .store
            .push_supervisor_hint(session_id, text.to_string())
            .await?;
        let event = SessionEvent::new(
            SessionEventType::SupervisorHint,
            json!({ "hintText": text, "queued": queued }),
        );
        self.store.append_events(session_id, std::slice::from_ref(&event)).await?;
        self.bus.publish_events(session_id, std::slice::from_ref(&event));
        info!(queued, "Supervisor hint queued");
        Ok(HintReceipt { queued })
    }

    pub async fn submit_task_assignment(
        &self,
        session_id: &str,
        request: TaskAssignmentRequest,
    ) -> Result<ClassroomRuntime> {
        self.orchestrator.submit_task_assignment(session_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::StaticCurriculumService;
    use crate::llm_client::MockCompletion;
    use crate::roster::InMemoryRoster;

    fn service() -> SimulationService {
        SimulationService::new(
            Arc::new(SessionStore::new()),
            RealtimeBus::new(),
            Arc::new(InMemoryRoster::demo().with_classroom("empty", vec![])),
            Arc::new(StaticCurriculumService),
            Arc::new(MockCompletion),
        )
    }

    fn request(mode: SessionMode, classroom_id: &str) -> CreateSessionRequest {
        CreateSessionRequest {
            mode,
            channel: None,
            topic: "Fractions".into(),
            classroom_id: classroom_id.into(),
            config: None,
        }
    }

    #[tokio::test]
    async fn test_create_classroom_session() {
        let service = service();
        let created = service
            .create_session(request(SessionMode::Classroom, InMemoryRoster::DEMO_CLASSROOM))
            .await
            .unwrap();
        assert_eq!(created.channel, Channel::Unsupervised);

        let summary = service.get_session_summary(&created.session_id).await.unwrap();
        assert_eq!(summary.agents.len(), 5);
        assert_eq!(summary.lesson_plan.len(), 9);
        assert!(summary.classroom_runtime.is_some());
        // teacher<->4 students plus 6 student pairs, both directions.
        assert_eq!(summary.communication_graph.edges.len(), 20);

        let events = service
            .store()
            .read(&created.session_id, |s| s.events.clone())
            .await
            .unwrap();
        assert_eq!(events[0].event_type, SessionEventType::SessionCreated);
    }

    #[tokio::test]
    async fn test_create_session_validation() {
        let service = service();
        let mut blank = request(SessionMode::Classroom, "demo");
        blank.topic = "  ".into();
        assert!(matches!(
            service.create_session(blank).await,
            Err(SimulationError::BadRequest(_))
        ));
        assert!(matches!(
            service.create_session(request(SessionMode::Classroom, "nowhere")).await,
            Err(SimulationError::NotFound { entity: "classroom", .. })
        ));
        assert!(matches!(
            service.create_session(request(SessionMode::Classroom, "empty")).await,
            Err(SimulationError::BadRequest(_))
        ));

        let mut inverted = request(SessionMode::Classroom, "demo");
        inverted.config = Some(SessionConfig {
            min_responders: Some(3),
            max_responders: Some(1),
            ..Default::default()
        });
        assert!(matches!(
            service.create_session(inverted).await,
            Err(SimulationError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_debate_session_with_judge() {
        let service = service();
        let mut req = request(SessionMode::Debate, "demo");
        req.config = Some(SessionConfig {
            include_judge: true,
            ..Default::default()
        });
        let created = service.create_session(req).await.unwrap();

        let result = service
            .process_turn(&created.session_id, "Uniforms reduce bullying because studies show 20 percent fewer incidents.")
            .await
            .unwrap();
        assert_eq!(result.turns.len(), 2);
        let scores = result.metrics.debate.unwrap();
        assert!(scores.evidence > 0.0);
        assert!(result.classroom_runtime.is_none());
        assert!(
            result
                .communication_graph
                .edge("coach", "judge")
                .is_some_and(|edge| edge.current_turn_active)
        );

        let summary = service.get_session_summary(&created.session_id).await.unwrap();
        let debater = summary.agents.iter().find(|a| a.id == "user").unwrap();
        assert!(debater.state.engagement.is_some());
    }

    #[tokio::test]
    async fn test_hints_require_supervised_classroom() {
        let service = service();
        let created = service
            .create_session(request(SessionMode::Classroom, "demo"))
            .await
            .unwrap();
        assert!(matches!(
            service.submit_supervisor_hint(&created.session_id, "slow down").await,
            Err(SimulationError::BadRequest(_))
        ));

        let mut supervised = request(SessionMode::Classroom, "demo");
        supervised.channel = Some(Channel::Supervised);
        let created = service.create_session(supervised).await.unwrap();
        let receipt = service
            .submit_supervisor_hint(&created.session_id, "slow down")
            .await
            .unwrap();
        assert_eq!(receipt.queued, 1);
        assert!(matches!(
            service.submit_supervisor_hint(&created.session_id, "   ").await,
            Err(SimulationError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_end_session_evicts_it() {
        let service = service();
        let created = service
            .create_session(request(SessionMode::Classroom, "demo"))
            .await
            .unwrap();
        service.process_turn(&created.session_id, "Hello class").await.unwrap();

        service.end_session(&created.session_id).await.unwrap();
        assert_eq!(service.store().session_count().await, 0);
        assert!(matches!(
            service.get_session_summary(&created.session_id).await,
            Err(SimulationError::NotFound { entity: "session", .. })
        ));
        assert!(matches!(
            service.end_session(&created.session_id).await,
            Err(SimulationError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_task_assignment_rejected_in_debate() {
        let service = service();
        let created = service
            .create_session(request(SessionMode::Debate, "demo"))
            .await
            .unwrap();
        let err = service
            .submit_task_assignment(
                &created.session_id,
                TaskAssignmentRequest {
                    mode: crate::model::AssignmentMode::Pair,
                    groups: None,
                    autonomous_grouping: false,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SimulationError::BadRequest(_)));
    }
}
