//! Data Access Layer
//!
//! Postgres-backed classroom roster. Sessions themselves stay in memory; the
//! database only holds the static classroom and student records.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lyceum_core::model::Persona;
use lyceum_core::roster::{RosterRepository, StudentRecord};
use sqlx::{FromRow, PgPool};

/// A wrapper around the `PgPool` to provide a clear data access interface.
#[derive(Clone)]
pub struct Db {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct StudentRow {
    id: String,
    name: String,
    persona: String,
}

impl TryFrom<StudentRow> for StudentRecord {
    type Error = anyhow::Error;

    fn try_from(row: StudentRow) -> Result<Self> {
        let persona = parse_persona(&row.persona)
            .with_context(|| format!("student '{}' has an unknown persona", row.id))?;
        Ok(StudentRecord {
            id: row.id,
            name: row.name,
            persona,
        })
    }
}

fn parse_persona(raw: &str) -> Result<Persona> {
    Ok(serde_json::from_value(serde_json::Value::String(
        raw.trim().to_lowercase(),
    ))?)
}

impl Db {
    /// Creates a new `Db` instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs all pending `sqlx` migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RosterRepository for Db {
    async fn classroom_roster(&self, classroom_id: &str) -> Result<Option<Vec<StudentRecord>>> {
        let exists: Option<(String,)> = sqlx::query_as("SELECT id FROM classrooms WHERE id = $1")
            .bind(classroom_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Ok(None);
        }

        let rows: Vec<StudentRow> = sqlx::query_as(
            r#"
            SELECT id, name, persona
            FROM students
            WHERE classroom_id = $1
            ORDER BY seat ASC, id ASC
            "#,
        )
        .bind(classroom_id)
        .fetch_all(&self.pool)
        .await?;

        let students = rows
            .into_iter()
            .map(StudentRecord::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(students))
    }
}
