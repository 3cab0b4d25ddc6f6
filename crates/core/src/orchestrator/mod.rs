//! Turn Orchestrator
//!
//! The phase-aware state machine that drives one turn of a session: it gates
//! on task assignments, screens the input, decides which students respond,
//! runs every participant concurrently and commits their results to the store,
//! the communication graph and the realtime bus.
//!
//! Turns of one session are serialized through the store's turn lock. All
//! graph writes happen on the orchestrating task between awaits; agents only
//! ever see snapshots.

pub mod assignment;
pub mod context;
pub mod metrics;
pub mod phase;
pub mod review;
pub mod selection;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::agent::{AgentContext, AgentInput, AgentOutput, AgentRegistry};
use crate::agent::heuristics::{analyze, engagement_delta};
use crate::bus::RealtimeBus;
use crate::error::{Result, SimulationError};
use crate::graph::{ActivationPayload, CommunicationGraph, InteractionType};
use crate::model::{
    AgentKind, AgentProfile, AgentStatePatch, AssignedBy, Channel, ClassroomRuntime, MetricsPatch, Phase,
    Session, SessionEvent, SessionEventType, SessionMetrics, SessionMode, TaskAssignment, Turn, TurnRole,
};
use crate::safety::{self, SafetyVerdict};
use crate::store::SessionStore;

pub use assignment::TaskAssignmentRequest;
use selection::ResponderWindow;

/// How many turns a turn result carries back to the caller.
pub const RESULT_TURN_WINDOW: usize = 12;

const PEER_REACTION_WORDS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Completed,
    /// The safety filter refused the input; no agent ran.
    Blocked,
    /// Waiting for a supervisor task assignment; the request was rolled back.
    Paused,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnResult {
    pub turn_id: Option<String>,
    pub outcome: TurnOutcome,
    pub turns: Vec<Turn>,
    pub events: Vec<SessionEvent>,
    pub metrics: SessionMetrics,
    pub communication_graph: CommunicationGraph,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classroom_runtime: Option<ClassroomRuntime>,
}

struct Participant {
    profile: AgentProfile,
    input: AgentInput,
}

pub struct TurnOrchestrator {
    store: Arc<SessionStore>,
    bus: RealtimeBus,
    agents: AgentRegistry,
}

impl TurnOrchestrator {
    pub fn new(store: Arc<SessionStore>, bus: RealtimeBus, agents: AgentRegistry) -> Self {
        Self { store, bus, agents }
    }

    /// Processes one caller message. Turns of the same session never overlap.
    #[instrument(skip(self, message), fields(session_id = %session_id))]
    pub async fn process_turn(&self, session_id: &str, message: &str) -> Result<TurnResult> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SimulationError::bad_request("message must not be empty"));
        }

        let _turn_guard = self.store.lock_turns(session_id).await?;
        let mode = self.store.read(session_id, |session| session.mode).await?;
        let result = match mode {
            SessionMode::Classroom => self.classroom_turn(session_id, message).await?,
            SessionMode::Debate => self.debate_turn(session_id, message).await?,
        };
        info!(outcome = ?result.outcome, events = result.events.len(), "Turn processed");
        Ok(result)
    }

    /// Applies a supervisor assignment and resumes a paused classroom.
    #[instrument(skip(self, request), fields(session_id = %session_id, mode = request.mode.as_str()))]
    pub async fn submit_task_assignment(
        &self,
        session_id: &str,
        request: TaskAssignmentRequest,
    ) -> Result<ClassroomRuntime> {
        let _turn_guard = self.store.lock_turns(session_id).await?;
        let (mode, roster, lesson_turn) = self
            .store
            .read(session_id, |session| {
                (
                    session.mode,
                    session.students().map(|s| s.id.clone()).collect::<Vec<_>>(),
                    session.classroom_runtime.as_ref().map(|rt| rt.lesson_turn),
                )
            })
            .await?;
        if mode != SessionMode::Classroom {
            return Err(SimulationError::bad_request(
                "task assignments are only available in classroom mode",
            ));
        }
        let lesson_turn =
            lesson_turn.ok_or_else(|| SimulationError::internal("classroom session has no runtime"))?;

        let groups = match request.groups {
            Some(groups) if !request.autonomous_grouping => groups,
            _ => assignment::build_groups(request.mode, &roster),
        };
        assignment::validate_groups(request.mode, &groups, &roster)?;

        let assignment = TaskAssignment {
            mode: request.mode,
            groups,
            assigned_by: AssignedBy::SupervisorUser,
            assigned_at: Utc::now(),
            lesson_turn,
        };
        let runtime = self
            .store
            .update_classroom_runtime(session_id, |current| {
                current.map(|mut runtime| {
                    runtime.active_task_assignment = Some(assignment.clone());
                    runtime.paused = false;
                    runtime.pending_task_assignment = false;
                    runtime
                })
            })
            .await?
            .ok_or_else(|| SimulationError::internal("classroom session has no runtime"))?;

        let event = SessionEvent::new(
            SessionEventType::TaskAssignmentSubmitted,
            json!({ "assignment": assignment, "summary": assignment.summary() }),
        );
        self.commit_events(session_id, &[event]).await?;
        info!(groups = assignment.groups.len(), "Task assignment accepted, session resumed");
        Ok(runtime)
    }

    async fn classroom_turn(&self, session_id: &str, message: &str) -> Result<TurnResult> {
        let mut runtime = self.refresh_runtime(session_id).await?;
        let verdict = safety::screen(message);
        let content = match &verdict {
            SafetyVerdict::Allowed { text, redactions } => {
                if *redactions > 0 {
                    debug!(redactions, "Redacted personal data from message");
                }
                text.clone()
            }
            SafetyVerdict::Blocked { .. } => message.to_string(),
        };
        let request = self
            .store
            .append_turn(session_id, Turn::new(TurnRole::User, None, content.clone()))
            .await?;
        let turn_id = request.id.clone();

        let channel = self.store.read(session_id, |session| session.channel).await?;
        let mut auto_assigned = None;
        if runtime.phase == Phase::Practice && runtime.active_task_assignment.is_none() {
            if channel == Channel::Supervised {
                return self.pause_for_assignment(session_id, &turn_id, &runtime).await;
            }
            runtime = self.assign_autonomously(session_id, &runtime).await?;
            auto_assigned = runtime.active_task_assignment.clone();
        }

        self.store
            .update_graph(session_id, CommunicationGraph::reset_current_turn_activity)
            .await?;

        if let SafetyVerdict::Blocked { reason } = verdict {
            return self.block_turn(session_id, &turn_id, reason).await;
        }

        let snapshot = self.store.get_session(session_id).await?;
        let teacher = snapshot
            .teacher()
            .cloned()
            .ok_or_else(|| SimulationError::internal("classroom session has no teacher"))?;
        let students: Vec<AgentProfile> = snapshot.students().cloned().collect();
        let window = ResponderWindow::from_config(&snapshot.config, students.len());
        let seed = snapshot.turns.len() + snapshot.events.len();
        let responders = selection::select_responders(&students, seed, window);
        debug!(
            phase = runtime.phase.as_str(),
            lesson_turn = runtime.lesson_turn,
            responders = responders.len(),
            "Responders selected"
        );

        self.store
            .update_graph(session_id, |graph| {
                for student in &students {
                    graph.activate_edge(
                        &turn_id,
                        &teacher.id,
                        &student.id,
                        InteractionType::Broadcast,
                        ActivationPayload::text(&content),
                    );
                }
                for responder in &responders {
                    graph.activate_edge(
                        &turn_id,
                        &teacher.id,
                        &responder.id,
                        InteractionType::Direct,
                        ActivationPayload::text(&content)
                            .with_metadata(json!({ "phase": runtime.phase.as_str() })),
                    );
                }
            })
            .await?;

        let mut events = Vec::new();
        let hint = self.store.consume_supervisor_hint(session_id).await?;
        if let Some(hint_text) = &hint {
            let annotation = self
                .store
                .append_turn(
                    session_id,
                    Turn::new(TurnRole::System, None, format!("Supervisor hint: {hint_text}"))
                        .with_metadata(json!({ "supervisorHint": hint_text })),
                )
                .await?;
            events.push(
                SessionEvent::new(
                    SessionEventType::SupervisorHint,
                    json!({ "hintText": hint_text, "applied": true, "turn": annotation }),
                )
                .for_turn(&turn_id),
            );
            debug!("Supervisor hint applied to turn");
        }
        let snapshot = self.store.get_session(session_id).await?;
        let mut participants = Vec::with_capacity(responders.len() + 1);
        participants.push(Participant {
            input: self.input(
                session_id,
                &turn_id,
                &teacher,
                AgentContext::Teacher(context::teacher_context(&snapshot, &teacher, &runtime, &content, hint)),
            ),
            profile: teacher.clone(),
        });
        for responder in &responders {
            participants.push(Participant {
                input: self.input(
                    session_id,
                    &turn_id,
                    responder,
                    AgentContext::Student(context::student_context(&snapshot, responder)),
                ),
                profile: responder.clone(),
            });
        }

        let outputs = self.run_participants(SessionMode::Classroom, &participants).await;
        let mut failures = Vec::new();
        let mut replies = Vec::new();
        for (participant, output) in participants.iter().zip(outputs) {
            let output = match output {
                Ok(output) => output,
                Err(err) => {
                    error!(agent_id = %participant.profile.id, error = %format!("{err:#}"), "Agent run failed");
                    failures.push(format!("{}: {err:#}", participant.profile.id));
                    continue;
                }
            };
            let profile = &participant.profile;
            let role = if profile.kind.is_student() {
                TurnRole::Agent
            } else {
                TurnRole::Teacher
            };
            let turn = self.commit_agent_output(session_id, profile, role, &output).await?;
            if profile.kind.is_student() {
                let reply = turn.content.clone();
                self.store
                    .update_graph(session_id, |graph| {
                        graph.activate_edge(
                            &turn_id,
                            &profile.id,
                            &teacher.id,
                            InteractionType::Reply,
                            ActivationPayload::text(&reply),
                        );
                    })
                    .await?;
                replies.push((profile.clone(), reply));
            }
            events.push(
                SessionEvent::new(SessionEventType::AgentTurnEmitted, json!({ "turn": turn }))
                    .for_turn(&turn_id)
                    .for_agent(&profile.id),
            );
        }

        if !failures.is_empty() {
            self.commit_events(session_id, &events).await?;
            return Err(SimulationError::internal(format!(
                "{} of {} agent runs failed: {}",
                failures.len(),
                participants.len(),
                failures.join("; ")
            )));
        }

        self.store
            .update_graph(session_id, |graph| {
                for (i, (a, a_text)) in replies.iter().enumerate() {
                    for (b, b_text) in replies.iter().skip(i + 1) {
                        graph.activate_edge(
                            &turn_id,
                            &a.id,
                            &b.id,
                            InteractionType::PeerReaction,
                            ActivationPayload::text(peer_reaction(&a.name, a_text)),
                        );
                        graph.activate_edge(
                            &turn_id,
                            &b.id,
                            &a.id,
                            InteractionType::PeerReaction,
                            ActivationPayload::text(peer_reaction(&b.name, b_text)),
                        );
                    }
                }
            })
            .await?;

        let reviewed = self.review_pass(session_id, &turn_id, &teacher, &runtime).await?;

        let snapshot = self.store.get_session(session_id).await?;
        let students: Vec<AgentProfile> = snapshot.students().cloned().collect();
        self.store
            .update_metrics(session_id, metrics::classroom_metrics(&students))
            .await?;
        let runtime = self.refresh_runtime(session_id).await?;

        let graph = self.store.read(session_id, |s| s.communication_graph.clone()).await?;
        events.push(
            SessionEvent::new(
                SessionEventType::GraphUpdated,
                json!({ "activations": graph.current_turn_activations }),
            )
            .for_turn(&turn_id),
        );
        events.push(
            SessionEvent::new(
                SessionEventType::StudentStatesUpdated,
                json!({
                    "students": students
                        .iter()
                        .map(|s| json!({ "id": s.id, "name": s.name, "state": s.state }))
                        .collect::<Vec<_>>(),
                }),
            )
            .for_turn(&turn_id),
        );
        events.push(
            SessionEvent::new(
                SessionEventType::TurnProcessed,
                json!({
                    "outcome": TurnOutcome::Completed,
                    "phase": runtime.phase,
                    "lessonTurn": runtime.lesson_turn,
                    "responders": responders.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
                    "autoAssignment": auto_assigned,
                    "reviewed": reviewed,
                }),
            )
            .for_turn(&turn_id),
        );
        self.commit_events(session_id, &events).await?;

        self.result(session_id, Some(turn_id), TurnOutcome::Completed, events).await
    }

    async fn debate_turn(&self, session_id: &str, message: &str) -> Result<TurnResult> {
        let verdict = safety::screen(message);
        let content = match &verdict {
            SafetyVerdict::Allowed { text, .. } => text.clone(),
            SafetyVerdict::Blocked { .. } => message.to_string(),
        };
        let snapshot = self.store.get_session(session_id).await?;
        let coach = snapshot
            .teacher()
            .cloned()
            .ok_or_else(|| SimulationError::internal("debate session has no coach"))?;
        let debater = snapshot
            .agents
            .iter()
            .find(|agent| agent.kind == AgentKind::Debater)
            .cloned()
            .ok_or_else(|| SimulationError::internal("debate session has no debater"))?;
        let judge = snapshot
            .agents
            .iter()
            .find(|agent| agent.kind == AgentKind::Judge)
            .cloned();

        let request = self
            .store
            .append_turn(
                session_id,
                Turn::new(TurnRole::User, Some(debater.id.clone()), content.clone()),
            )
            .await?;
        let turn_id = request.id.clone();
        self.store
            .update_graph(session_id, CommunicationGraph::reset_current_turn_activity)
            .await?;
        if let SafetyVerdict::Blocked { reason } = verdict {
            return self.block_turn(session_id, &turn_id, reason).await;
        }

        self.store
            .update_graph(session_id, |graph| {
                graph.activate_edge(
                    &turn_id,
                    &debater.id,
                    &coach.id,
                    InteractionType::Argument,
                    ActivationPayload::text(&content),
                );
            })
            .await?;

        let snapshot = self.store.get_session(session_id).await?;
        let participants = [Participant {
            input: self.input(
                session_id,
                &turn_id,
                &coach,
                AgentContext::Debate(context::debate_context(&snapshot, &content, judge.is_some())),
            ),
            profile: coach.clone(),
        }];
        let output = self
            .run_participants(SessionMode::Debate, &participants)
            .await
            .pop()
            .ok_or_else(|| SimulationError::internal("coach produced no result"))?
            .map_err(|err| {
                error!(agent_id = %coach.id, error = %format!("{err:#}"), "Coach run failed");
                SimulationError::from_backend("coach run failed", &err)
            })?;

        let turn = self
            .commit_agent_output(session_id, &coach, TurnRole::Teacher, &output)
            .await?;
        let rebuttal = turn.content.clone();
        self.store
            .update_graph(session_id, |graph| {
                graph.activate_edge(
                    &turn_id,
                    &coach.id,
                    &debater.id,
                    InteractionType::Rebuttal,
                    ActivationPayload::text(&rebuttal),
                );
                if let Some(judge) = &judge {
                    graph.activate_edge(
                        &turn_id,
                        &debater.id,
                        &judge.id,
                        InteractionType::Transcript,
                        ActivationPayload::text(&content),
                    );
                    graph.activate_edge(
                        &turn_id,
                        &coach.id,
                        &judge.id,
                        InteractionType::Transcript,
                        ActivationPayload::text(&rebuttal),
                    );
                }
            })
            .await?;

        let patch = AgentStatePatch {
            engagement: Some(engagement_delta(&analyze(&rebuttal))),
            ..Default::default()
        };
        let debater_state = self
            .store
            .update_agent_state(session_id, &debater.id, &patch)
            .await?;

        let scores = metrics::score_argument(&content);
        self.store
            .update_metrics(
                session_id,
                MetricsPatch {
                    engagement: debater_state.engagement.map(|e| e.attention),
                    clarity: Some(scores.clarity),
                    debate: Some(scores),
                },
            )
            .await?;

        let graph = self.store.read(session_id, |s| s.communication_graph.clone()).await?;
        let events = vec![
            SessionEvent::new(SessionEventType::AgentTurnEmitted, json!({ "turn": turn }))
                .for_turn(&turn_id)
                .for_agent(&coach.id),
            SessionEvent::new(
                SessionEventType::GraphUpdated,
                json!({ "activations": graph.current_turn_activations }),
            )
            .for_turn(&turn_id),
            SessionEvent::new(
                SessionEventType::TurnProcessed,
                json!({
                    "outcome": TurnOutcome::Completed,
                    "scores": scores,
                    "debater": debater_state,
                }),
            )
            .for_turn(&turn_id),
        ];
        self.commit_events(session_id, &events).await?;

        self.result(session_id, Some(turn_id), TurnOutcome::Completed, events).await
    }

    /// Recomputes `lessonTurn` and `phase` from the turn log.
    async fn refresh_runtime(&self, session_id: &str) -> Result<ClassroomRuntime> {
        let (teacher_turns, plan_len) = self
            .store
            .read(session_id, |s| (s.teacher_turn_count(), s.lesson_plan.len()))
            .await?;
        let lesson_turn = phase::lesson_turn(teacher_turns, plan_len);
        self.store
            .update_classroom_runtime(session_id, |current| {
                current.map(|mut runtime| {
                    runtime.lesson_turn = runtime.lesson_turn.max(lesson_turn);
                    runtime.phase = phase::phase_for(runtime.lesson_turn, plan_len);
                    runtime
                })
            })
            .await?
            .ok_or_else(|| SimulationError::internal("classroom session has no runtime"))
    }

    async fn pause_for_assignment(
        &self,
        session_id: &str,
        request_id: &str,
        runtime: &ClassroomRuntime,
    ) -> Result<TurnResult> {
        let (roster, plan_len) = self
            .store
            .read(session_id, |s| {
                (
                    s.students().map(|st| st.id.clone()).collect::<Vec<_>>(),
                    s.lesson_plan.len(),
                )
            })
            .await?;
        self.store
            .update_classroom_runtime(session_id, |current| {
                current.map(|mut runtime| {
                    runtime.paused = true;
                    runtime.pending_task_assignment = true;
                    runtime
                })
            })
            .await?;
        self.store.pop_turn(session_id, request_id).await?;

        let event = SessionEvent::new(
            SessionEventType::TaskAssignmentRequired,
            json!({
                "phase": runtime.phase,
                "lessonTurn": runtime.lesson_turn,
                "suggestedMode": assignment::autonomous_mode(runtime.lesson_turn, plan_len),
                "studentIds": roster,
            }),
        );
        let events = vec![event];
        self.commit_events(session_id, &events).await?;
        info!(lesson_turn = runtime.lesson_turn, "Paused for supervisor task assignment");
        self.result(session_id, None, TurnOutcome::Paused, events).await
    }

    async fn assign_autonomously(
        &self,
        session_id: &str,
        runtime: &ClassroomRuntime,
    ) -> Result<ClassroomRuntime> {
        let (roster, plan_len) = self
            .store
            .read(session_id, |s| {
                (
                    s.students().map(|st| st.id.clone()).collect::<Vec<_>>(),
                    s.lesson_plan.len(),
                )
            })
            .await?;
        let mode = assignment::autonomous_mode(runtime.lesson_turn, plan_len);
        let assignment = TaskAssignment {
            mode,
            groups: assignment::build_groups(mode, &roster),
            assigned_by: AssignedBy::TeacherAgent,
            assigned_at: Utc::now(),
            lesson_turn: runtime.lesson_turn,
        };
        debug!(summary = %assignment.summary(), "Teacher assigned practice task");
        self.store
            .update_classroom_runtime(session_id, |current| {
                current.map(|mut runtime| {
                    runtime.active_task_assignment = Some(assignment);
                    runtime.paused = false;
                    runtime.pending_task_assignment = false;
                    runtime
                })
            })
            .await?
            .ok_or_else(|| SimulationError::internal("classroom session has no runtime"))
    }

    async fn block_turn(&self, session_id: &str, request_id: &str, reason: String) -> Result<TurnResult> {
        self.store.pop_turn(session_id, request_id).await?;
        let refusal = self
            .store
            .append_turn(
                session_id,
                Turn::new(TurnRole::System, None, reason).with_metadata(json!({ "blocked": true })),
            )
            .await?;
        let events = vec![
            SessionEvent::new(
                SessionEventType::TurnProcessed,
                json!({ "outcome": TurnOutcome::Blocked, "turn": refusal }),
            )
            .for_turn(&refusal.id),
        ];
        self.commit_events(session_id, &events).await?;
        warn!("Turn blocked by safety filter");
        self.result(session_id, Some(refusal.id), TurnOutcome::Blocked, events).await
    }

    /// Review pass over the active assignment, at most once per lesson turn.
    async fn review_pass(
        &self,
        session_id: &str,
        turn_id: &str,
        teacher: &AgentProfile,
        runtime: &ClassroomRuntime,
    ) -> Result<usize> {
        if runtime.phase != Phase::Review || runtime.last_review_turn == Some(runtime.lesson_turn) {
            return Ok(0);
        }
        let Some(assignment) = &runtime.active_task_assignment else {
            return Ok(0);
        };

        let students: Vec<AgentProfile> = self
            .store
            .read(session_id, |s| s.students().cloned().collect())
            .await?;
        let outcomes = review::evaluate(assignment, &students);
        for outcome in &outcomes {
            self.store
                .update_agent_state(session_id, &outcome.student_id, &outcome.patch)
                .await?;
        }
        self.store
            .update_graph(session_id, |graph| {
                for outcome in &outcomes {
                    graph.activate_edge(
                        turn_id,
                        &teacher.id,
                        &outcome.student_id,
                        InteractionType::Feedback,
                        ActivationPayload::text(outcome.feedback()).with_metadata(json!({
                            "passed": outcome.passed,
                            "signal": outcome.signal,
                        })),
                    );
                }
            })
            .await?;
        let lesson_turn = runtime.lesson_turn;
        self.store
            .update_classroom_runtime(session_id, |current| {
                current.map(|mut runtime| {
                    runtime.last_review_turn = Some(lesson_turn);
                    runtime
                })
            })
            .await?;
        debug!(reviewed = outcomes.len(), "Review pass complete");
        Ok(outcomes.len())
    }

    fn input(&self, session_id: &str, turn_id: &str, agent: &AgentProfile, context: AgentContext) -> AgentInput {
        AgentInput {
            session_id: session_id.to_string(),
            turn_id: turn_id.to_string(),
            agent: agent.clone(),
            context,
        }
    }

    /// Runs all participants concurrently; results come back in participant order.
    async fn run_participants(
        &self,
        mode: SessionMode,
        participants: &[Participant],
    ) -> Vec<anyhow::Result<AgentOutput>> {
        let runs = participants.iter().map(|participant| {
            let agent = self.agents.for_kind(participant.profile.kind, mode);
            let input = participant.input.clone();
            async move {
                match agent {
                    Some(agent) => agent.run(input).await,
                    None => Err(anyhow::anyhow!(
                        "no behavior model for '{}'",
                        input.agent.kind.label()
                    )),
                }
            }
        });
        join_all(runs).await
    }

    async fn commit_agent_output(
        &self,
        session_id: &str,
        profile: &AgentProfile,
        role: TurnRole,
        output: &AgentOutput,
    ) -> Result<Turn> {
        let turn = Turn::new(role, Some(profile.id.clone()), output.message.clone())
            .with_metadata(output.metadata.clone().unwrap_or_default());
        let turn = self.store.append_turn(session_id, turn).await?;
        if let Some(patch) = output.state_patch.as_ref().filter(|patch| !patch.is_empty()) {
            self.store
                .update_agent_state(session_id, &profile.id, patch)
                .await?;
        }
        Ok(turn)
    }

    async fn commit_events(&self, session_id: &str, events: &[SessionEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        self.store.append_events(session_id, events).await?;
        self.bus.publish_events(session_id, events);
        Ok(())
    }

    async fn result(
        &self,
        session_id: &str,
        turn_id: Option<String>,
        outcome: TurnOutcome,
        events: Vec<SessionEvent>,
    ) -> Result<TurnResult> {
        self.store
            .read(session_id, |session: &Session| TurnResult {
                turn_id,
                outcome,
                turns: session.last_turns(RESULT_TURN_WINDOW),
                events,
                metrics: session.metrics.clone(),
                communication_graph: session.communication_graph.clone(),
                classroom_runtime: session.classroom_runtime.clone(),
            })
            .await
    }
}

/// Short reaction a student leaves for a classmate: its own words, clipped.
fn peer_reaction(name: &str, message: &str) -> String {
    let words: Vec<&str> = message.split_whitespace().collect();
    let clipped = words[..words.len().min(PEER_REACTION_WORDS)].join(" ");
    if words.len() > PEER_REACTION_WORDS {
        format!("{name}: {clipped}…")
    } else {
        format!("{name}: {clipped}")
    }
}
