//! Task-assignment grouping and validation.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::phase::practice_position;
use crate::error::{Result, SimulationError};
use crate::model::{AssignmentMode, TaskGroup};

/// A supervisor's request to resume a paused classroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAssignmentRequest {
    pub mode: AssignmentMode,
    #[serde(default)]
    pub groups: Option<Vec<TaskGroup>>,
    /// Ignore `groups` and let the classroom build them.
    #[serde(default)]
    pub autonomous_grouping: bool,
}

/// Early practice works individually, then in pairs, then in groups.
pub fn autonomous_mode(lesson_turn: usize, plan_len: usize) -> AssignmentMode {
    let (position, span) = practice_position(lesson_turn, plan_len);
    match position * 3 / span {
        0 => AssignmentMode::Individual,
        1 => AssignmentMode::Pair,
        _ => AssignmentMode::Group,
    }
}

/// Deterministic grouping in roster order.
pub fn build_groups(mode: AssignmentMode, student_ids: &[String]) -> Vec<TaskGroup> {
    let members: Vec<Vec<String>> = match mode {
        AssignmentMode::Individual => student_ids.iter().map(|id| vec![id.clone()]).collect(),
        AssignmentMode::Pair => student_ids.chunks(2).map(<[String]>::to_vec).collect(),
        AssignmentMode::Group => {
            let count = student_ids.len().div_ceil(3).max(2).min(student_ids.len().max(1));
            let mut groups = vec![Vec::new(); count];
            for (i, id) in student_ids.iter().enumerate() {
                groups[i % count].push(id.clone());
            }
            groups
        }
    };

    let prefix = match mode {
        AssignmentMode::Individual => "i",
        AssignmentMode::Pair => "p",
        AssignmentMode::Group => "g",
    };
    members
        .into_iter()
        .filter(|ids| !ids.is_empty())
        .enumerate()
        .map(|(i, student_ids)| TaskGroup {
            id: format!("{prefix}{}", i + 1),
            student_ids,
        })
        .collect()
}

/// Rejects unknown students, oversized pairs, empty groups and any student placed twice.
pub fn validate_groups(mode: AssignmentMode, groups: &[TaskGroup], roster: &[String]) -> Result<()> {
    if groups.is_empty() {
        return Err(SimulationError::bad_request("task assignment needs at least one group"));
    }
    let known: HashSet<&str> = roster.iter().map(String::as_str).collect();
    let mut group_ids = HashSet::new();
    let mut seen = HashSet::new();

    for group in groups {
        if !group_ids.insert(group.id.as_str()) {
            return Err(SimulationError::bad_request(format!("duplicate group id '{}'", group.id)));
        }
        if group.student_ids.is_empty() {
            return Err(SimulationError::bad_request(format!("group '{}' is empty", group.id)));
        }
        if mode == AssignmentMode::Pair && group.student_ids.len() > 2 {
            return Err(SimulationError::bad_request(format!(
                "pair group '{}' has {} members",
                group.id,
                group.student_ids.len()
            )));
        }
        for student_id in &group.student_ids {
            if !known.contains(student_id.as_str()) {
                return Err(SimulationError::bad_request(format!("unknown student '{student_id}'")));
            }
            if !seen.insert(student_id.as_str()) {
                return Err(SimulationError::bad_request(format!(
                    "student '{student_id}' appears in more than one group"
                )));
            }
        }
    }
    Ok(())
}
