//! Roster boundary.
//!
//! Static classroom/student data lives outside the simulation. The core only
//! needs to resolve a classroom id into its students once, at session creation.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::Persona;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub persona: Persona,
}

#[async_trait]
pub trait RosterRepository: Send + Sync {
    /// `None` when the classroom does not exist; `Some(vec![])` when it has no students.
    async fn classroom_roster(&self, classroom_id: &str) -> Result<Option<Vec<StudentRecord>>>;
}

/// Roster held in memory; used for demos and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoster {
    classrooms: HashMap<String, Vec<StudentRecord>>,
}

impl InMemoryRoster {
    pub const DEMO_CLASSROOM: &'static str = "demo";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classroom(mut self, classroom_id: impl Into<String>, students: Vec<StudentRecord>) -> Self {
        self.classrooms.insert(classroom_id.into(), students);
        self
    }

    /// A four-student classroom covering the main personas.
    pub fn demo() -> Self {
        let student = |id: &str, name: &str, persona| StudentRecord {
            id: id.to_string(),
            name: name.to_string(),
            persona,
        };
        Self::new().with_classroom(
            Self::DEMO_CLASSROOM,
            vec![
                student("s1", "Ada", Persona::Curious),
                student("s2", "Ben", Persona::Diligent),
                student("s3", "Cleo", Persona::Distracted),
                student("s4", "Dev", Persona::Disruptive),
            ],
        )
    }
}

#[async_trait]
impl RosterRepository for InMemoryRoster {
    async fn classroom_roster(&self, classroom_id: &str) -> Result<Option<Vec<StudentRecord>>> {
        Ok(self.classrooms.get(classroom_id).cloned())
    }
}
