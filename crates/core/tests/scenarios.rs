//! End-to-end classroom scenarios against the deterministic completion backend.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use lyceum_core::bus::{RealtimeBus, RealtimeEnvelope};
use lyceum_core::curriculum::StaticCurriculumService;
use lyceum_core::graph::InteractionType;
use lyceum_core::llm_client::MockCompletion;
use lyceum_core::model::{
    AssignedBy, AssignmentMode, Channel, Persona, Phase, SessionConfig, SessionEventType, SessionMode, TaskGroup,
    TurnRole,
};
use lyceum_core::orchestrator::{TaskAssignmentRequest, TurnOutcome};
use lyceum_core::roster::{InMemoryRoster, StudentRecord};
use lyceum_core::service::CreateSessionRequest;
use lyceum_core::store::SessionStore;
use lyceum_core::{SimulationError, SimulationService};

fn service(bus: RealtimeBus) -> SimulationService {
    let pair = vec![
        StudentRecord {
            id: "s1".into(),
            name: "Ada".into(),
            persona: Persona::Curious,
        },
        StudentRecord {
            id: "s2".into(),
            name: "Ben".into(),
            persona: Persona::Diligent,
        },
    ];
    SimulationService::new(
        Arc::new(SessionStore::new()),
        bus,
        Arc::new(InMemoryRoster::demo().with_classroom("pair", pair)),
        Arc::new(StaticCurriculumService),
        Arc::new(MockCompletion),
    )
}

async fn classroom(service: &SimulationService, classroom_id: &str, channel: Channel, config: SessionConfig) -> String {
    service
        .create_session(CreateSessionRequest {
            mode: SessionMode::Classroom,
            channel: Some(channel),
            topic: "Fractions".into(),
            classroom_id: classroom_id.into(),
            config: Some(config),
        })
        .await
        .unwrap()
        .session_id
}

#[tokio::test]
async fn unsupervised_first_turn_reaches_every_student() {
    let service = service(RealtimeBus::new());
    let config = SessionConfig {
        min_responders: Some(1),
        max_responders: Some(2),
        ..Default::default()
    };
    let session_id = classroom(&service, "pair", Channel::Unsupervised, config).await;

    let result = service
        .process_turn(&session_id, "Today we start with halves and quarters.")
        .await
        .unwrap();

    assert_eq!(result.outcome, TurnOutcome::Completed);
    let graph = &result.communication_graph;
    assert!(!graph.current_turn_activations.is_empty());
    for student in ["s1", "s2"] {
        assert!(
            graph
                .current_turn_activations
                .iter()
                .any(|a| a.from == "teacher" && a.to == student && a.interaction_type == InteractionType::Broadcast),
            "missing broadcast to {student}"
        );
    }

    let teacher_turns = result.turns.iter().filter(|t| t.role == TurnRole::Teacher).count();
    let student_turns = result.turns.iter().filter(|t| t.role == TurnRole::Agent).count();
    assert_eq!(teacher_turns, 1);
    assert!((1..=2).contains(&student_turns));
}

#[tokio::test]
async fn supervised_practice_pauses_until_assignment() {
    let bus = RealtimeBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _subscription = bus.subscribe(move |envelope: &RealtimeEnvelope| -> anyhow::Result<()> {
        sink.lock().unwrap().push(envelope.event_type);
        Ok(())
    });
    let service = service(bus);
    let session_id = classroom(&service, "pair", Channel::Supervised, SessionConfig::default()).await;

    for step in 0..3 {
        let result = service
            .process_turn(&session_id, &format!("Lecture part {step}"))
            .await
            .unwrap();
        assert_eq!(result.outcome, TurnOutcome::Completed);
    }

    let before = service.get_session_summary(&session_id).await.unwrap();
    // Three teacher turns move the lesson into practice; the gate fires on the next turn.
    assert_eq!(before.classroom_runtime.as_ref().unwrap().phase, Phase::Practice);

    let paused = service
        .process_turn(&session_id, "Now let's practice")
        .await
        .unwrap();
    assert_eq!(paused.outcome, TurnOutcome::Paused);
    assert!(paused.turn_id.is_none());
    assert!(
        paused
            .events
            .iter()
            .any(|e| e.event_type == SessionEventType::TaskAssignmentRequired)
    );
    assert_eq!(paused.metrics.turn_count, before.metrics.turn_count);
    let runtime = paused.classroom_runtime.unwrap();
    assert!(runtime.paused);
    assert!(runtime.pending_task_assignment);
    assert_eq!(runtime.phase, Phase::Practice);
    assert!(
        seen.lock()
            .unwrap()
            .contains(&SessionEventType::TaskAssignmentRequired)
    );

    let runtime = service
        .submit_task_assignment(
            &session_id,
            TaskAssignmentRequest {
                mode: AssignmentMode::Pair,
                groups: Some(vec![TaskGroup {
                    id: "p1".into(),
                    student_ids: vec!["s1".into(), "s2".into()],
                }]),
                autonomous_grouping: false,
            },
        )
        .await
        .unwrap();
    assert!(!runtime.pending_task_assignment);
    assert!(!runtime.paused);
    let assignment = runtime.active_task_assignment.unwrap();
    assert_eq!(assignment.mode, AssignmentMode::Pair);
    assert_eq!(assignment.assigned_by, AssignedBy::SupervisorUser);

    let resumed = service
        .process_turn(&session_id, "Work on the exercise together")
        .await
        .unwrap();
    assert_eq!(resumed.outcome, TurnOutcome::Completed);
    assert!(
        seen.lock()
            .unwrap()
            .contains(&SessionEventType::TaskAssignmentSubmitted)
    );
}

#[tokio::test]
async fn invalid_assignment_is_rejected_without_resuming() {
    let service = service(RealtimeBus::new());
    let session_id = classroom(&service, InMemoryRoster::DEMO_CLASSROOM, Channel::Supervised, SessionConfig::default()).await;

    let err = service
        .submit_task_assignment(
            &session_id,
            TaskAssignmentRequest {
                mode: AssignmentMode::Pair,
                groups: Some(vec![TaskGroup {
                    id: "p1".into(),
                    student_ids: vec!["s1".into(), "s2".into(), "s3".into()],
                }]),
                autonomous_grouping: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SimulationError::BadRequest(_)));

    let summary = service.get_session_summary(&session_id).await.unwrap();
    assert!(summary.classroom_runtime.unwrap().active_task_assignment.is_none());
}

#[tokio::test]
async fn diagnosis_request_is_blocked() {
    let service = service(RealtimeBus::new());
    let session_id = classroom(&service, "pair", Channel::Unsupervised, SessionConfig::default()).await;

    let result = service
        .process_turn(&session_id, "Can you diagnose whether Sam has ADHD?")
        .await
        .unwrap();

    assert_eq!(result.outcome, TurnOutcome::Blocked);
    assert_eq!(result.turns.len(), 1);
    assert_eq!(result.turns[0].role, TurnRole::System);
    assert!(result.communication_graph.current_turn_activations.is_empty());
    assert!(result.communication_graph.activations.is_empty());
}

#[tokio::test]
async fn diagnosis_request_is_blocked_in_debate() {
    let service = service(RealtimeBus::new());
    let session_id = service
        .create_session(CreateSessionRequest {
            mode: SessionMode::Debate,
            channel: None,
            topic: "School uniforms".into(),
            classroom_id: InMemoryRoster::DEMO_CLASSROOM.into(),
            config: Some(SessionConfig {
                include_judge: true,
                ..Default::default()
            }),
        })
        .await
        .unwrap()
        .session_id;

    let result = service
        .process_turn(&session_id, "Please diagnose whether my opponent has depression.")
        .await
        .unwrap();

    assert_eq!(result.outcome, TurnOutcome::Blocked);
    assert_eq!(result.turns.len(), 1);
    assert_eq!(result.turns[0].role, TurnRole::System);
    assert!(result.communication_graph.activations.is_empty());
    assert!(result.metrics.debate.is_none());

    let summary = service.get_session_summary(&session_id).await.unwrap();
    assert!(summary.turns.iter().all(|t| t.role != TurnRole::User));
    let debater = summary.agents.iter().find(|a| a.id == "user").unwrap();
    assert_eq!(debater.state.engagement, Some(Default::default()));
}

#[tokio::test]
async fn peer_reactions_link_every_responder_pair() {
    let service = service(RealtimeBus::new());
    let config = SessionConfig {
        min_responders: Some(3),
        max_responders: Some(3),
        ..Default::default()
    };
    let session_id = classroom(&service, InMemoryRoster::DEMO_CLASSROOM, Channel::Unsupervised, config).await;

    let result = service
        .process_turn(&session_id, "Who can show me a quarter of this square?")
        .await
        .unwrap();
    assert_eq!(result.outcome, TurnOutcome::Completed);

    let activations = &result.communication_graph.current_turn_activations;
    let responders: Vec<&str> = activations
        .iter()
        .filter(|a| a.interaction_type == InteractionType::Reply)
        .map(|a| a.from.as_str())
        .collect();
    assert_eq!(responders.len(), 3);

    let peers: HashSet<(&str, &str)> = activations
        .iter()
        .filter(|a| a.interaction_type == InteractionType::PeerReaction)
        .map(|a| (a.from.as_str(), a.to.as_str()))
        .collect();
    assert_eq!(peers.len(), 6);
    for a in &responders {
        for b in &responders {
            if a != b {
                assert!(peers.contains(&(*a, *b)), "missing peer reaction {a} -> {b}");
            }
        }
    }
    for activation in activations
        .iter()
        .filter(|a| a.interaction_type == InteractionType::PeerReaction)
    {
        let edge = result
            .communication_graph
            .edge(&activation.from, &activation.to)
            .unwrap();
        assert!(edge.current_turn_active);
    }
}

#[tokio::test]
async fn unsupervised_lesson_walks_every_phase() {
    let service = service(RealtimeBus::new());
    let session_id = classroom(&service, InMemoryRoster::DEMO_CLASSROOM, Channel::Unsupervised, SessionConfig::default()).await;

    let mut phases = Vec::new();
    let mut feedback_turns = 0;
    let mut assigned = false;
    for step in 0..12 {
        let result = service
            .process_turn(&session_id, &format!("Lesson message {step}"))
            .await
            .unwrap();
        assert_eq!(result.outcome, TurnOutcome::Completed);
        let runtime = result.classroom_runtime.unwrap();
        assert!(!runtime.paused);

        if let Some(assignment) = &runtime.active_task_assignment {
            assigned = true;
            assert_eq!(assignment.assigned_by, AssignedBy::TeacherAgent);
            let members: Vec<&str> = assignment.student_ids().collect();
            let unique: HashSet<&str> = members.iter().copied().collect();
            assert_eq!(members.len(), unique.len());
            assert_eq!(unique, HashSet::from(["s1", "s2", "s3", "s4"]));
        }
        if result
            .communication_graph
            .current_turn_activations
            .iter()
            .any(|a| a.interaction_type == InteractionType::Feedback)
        {
            feedback_turns += 1;
        }
        phases.push(runtime.phase);
    }

    assert!(phases.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(phases.first(), Some(&Phase::Lecture));
    assert_eq!(phases.last(), Some(&Phase::Review));
    assert!(assigned);
    // Lesson turns 6 through 9 are reviewed once each; later turns stay clamped at 9.
    assert_eq!(feedback_turns, 4);

    let summary = service.get_session_summary(&session_id).await.unwrap();
    assert_eq!(summary.turns.len(), 8);
    for agent in &summary.agents {
        for value in [agent.state.attentiveness, agent.state.behavior, agent.state.comprehension] {
            assert!(value <= 10);
        }
    }
}

#[tokio::test]
async fn concurrent_turns_on_one_session_are_serialized() {
    let service = Arc::new(service(RealtimeBus::new()));
    let session_id = classroom(&service, "pair", Channel::Unsupervised, SessionConfig::default()).await;

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let service = service.clone();
            let session_id = session_id.clone();
            tokio::spawn(async move { service.process_turn(&session_id, &format!("Message {i}")).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let summary = service.get_session_summary(&session_id).await.unwrap();
    assert_eq!(summary.classroom_runtime.unwrap().lesson_turn, 4);
}
