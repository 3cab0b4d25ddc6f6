//! Session State Store
//!
//! The single owner of mutable session data. Every mutation goes through one of
//! the methods below; callers only ever receive clones. Each session also owns
//! an async turn lock so that turns for the same session are processed one at a
//! time.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use crate::{
    error::{Result, SimulationError},
    graph::CommunicationGraph,
    model::{
        AgentState, AgentStatePatch, ClassroomRuntime, MetricsPatch, Session, SessionEvent,
        SessionMetrics, Turn,
    },
};

struct SessionEntry {
    session: Mutex<Session>,
    turn_lock: Arc<Mutex<()>>,
}

/// In-memory store keyed by session id.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn entry(&self, session_id: &str) -> Result<Arc<SessionEntry>> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SimulationError::not_found("session", session_id))
    }

    /// Runs `f` against the live session and refreshes `updated_at` when it succeeds.
    async fn mutate<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> Result<R>,
    ) -> Result<R> {
        let entry = self.entry(session_id).await?;
        let mut session = entry.session.lock().await;
        let result = f(&mut session)?;
        session.updated_at = Utc::now();
        Ok(result)
    }

    pub async fn create_session(&self, mut session: Session) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(SimulationError::bad_request(format!(
                "session '{}' already exists",
                session.id
            )));
        }
        session.metrics.turn_count = session.turns.len();
        session.updated_at = Utc::now();
        let snapshot = session.clone();
        sessions.insert(
            session.id.clone(),
            Arc::new(SessionEntry {
                session: Mutex::new(session),
                turn_lock: Arc::new(Mutex::new(())),
            }),
        );
        debug!(session_id = %snapshot.id, "Session stored");
        Ok(snapshot)
    }

    /// Drops the session. A turn already holding its lock finishes against the
    /// detached entry and its later mutations report `NotFound`.
    pub async fn remove_session(&self, session_id: &str) -> Result<Session> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(session_id)
            .ok_or_else(|| SimulationError::not_found("session", session_id))?;
        let session = entry.session.lock().await.clone();
        debug!(session_id, "Session removed");
        Ok(session)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns a snapshot of the session.
    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        let entry = self.entry(session_id).await?;
        let session = entry.session.lock().await;
        Ok(session.clone())
    }

    /// Read-only projection without cloning the whole session.
    pub async fn read<R>(&self, session_id: &str, f: impl FnOnce(&Session) -> R) -> Result<R> {
        let entry = self.entry(session_id).await?;
        let session = entry.session.lock().await;
        Ok(f(&session))
    }

    /// Serializes turn processing for one session. Hold the guard for the whole turn.
    pub async fn lock_turns(&self, session_id: &str) -> Result<OwnedMutexGuard<()>> {
        let entry = self.entry(session_id).await?;
        Ok(entry.turn_lock.clone().lock_owned().await)
    }

    pub async fn append_turn(&self, session_id: &str, turn: Turn) -> Result<Turn> {
        self.mutate(session_id, |session| {
            session.turns.push(turn.clone());
            session.metrics.turn_count = session.turns.len();
            Ok(turn)
        })
        .await
    }

    /// Removes the last turn if it is `turn_id`. Used to roll back a paused or blocked request.
    pub async fn pop_turn(&self, session_id: &str, turn_id: &str) -> Result<Option<Turn>> {
        self.mutate(session_id, |session| {
            let popped = match session.turns.last() {
                Some(last) if last.id == turn_id => session.turns.pop(),
                _ => None,
            };
            session.metrics.turn_count = session.turns.len();
            Ok(popped)
        })
        .await
    }

    pub async fn append_events(&self, session_id: &str, events: &[SessionEvent]) -> Result<()> {
        self.mutate(session_id, |session| {
            session.events.extend_from_slice(events);
            Ok(())
        })
        .await
    }

    pub async fn update_agent_state(
        &self,
        session_id: &str,
        agent_id: &str,
        patch: &AgentStatePatch,
    ) -> Result<AgentState> {
        self.mutate(session_id, |session| {
            let agent = session
                .agents
                .iter_mut()
                .find(|agent| agent.id == agent_id)
                .ok_or_else(|| SimulationError::not_found("agent", agent_id))?;
            agent.state.apply(patch);
            Ok(agent.state.clone())
        })
        .await
    }

    pub async fn update_metrics(
        &self,
        session_id: &str,
        patch: MetricsPatch,
    ) -> Result<SessionMetrics> {
        self.mutate(session_id, |session| {
            if let Some(engagement) = patch.engagement {
                session.metrics.engagement = engagement;
            }
            if let Some(clarity) = patch.clarity {
                session.metrics.clarity = clarity;
            }
            if let Some(debate) = patch.debate {
                session.metrics.debate = Some(debate);
            }
            Ok(session.metrics.clone())
        })
        .await
    }

    /// Atomic read-modify-write of the classroom runtime.
    pub async fn update_classroom_runtime(
        &self,
        session_id: &str,
        updater: impl FnOnce(Option<ClassroomRuntime>) -> Option<ClassroomRuntime>,
    ) -> Result<Option<ClassroomRuntime>> {
        self.mutate(session_id, |session| {
            let next = updater(session.classroom_runtime.take());
            session.classroom_runtime.clone_from(&next);
            Ok(next)
        })
        .await
    }

    pub async fn update_graph<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut CommunicationGraph) -> R,
    ) -> Result<R> {
        self.mutate(session_id, |session| Ok(f(&mut session.communication_graph)))
            .await
    }

    /// Queues a hint; returns the queue length.
    pub async fn push_supervisor_hint(&self, session_id: &str, hint: String) -> Result<usize> {
        self.mutate(session_id, |session| {
            session.supervisor_hints.push_back(hint);
            Ok(session.supervisor_hints.len())
        })
        .await
    }

    pub async fn consume_supervisor_hint(&self, session_id: &str) -> Result<Option<String>> {
        self.mutate(session_id, |session| Ok(session.supervisor_hints.pop_front()))
            .await
    }
}
