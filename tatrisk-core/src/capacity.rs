//! Capacity engine: per-person workload against the sprint ceiling.
//!
//! Status bands (defaults):
//! - overload: hours > 52
//! - warning:  45 < hours <= 52
//! - ok:       everything else, including people with no estimates yet
//!
//! Forever tickets are dropped first; their estimates are placeholders, not sprint work.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::policy::{CapacityPolicy, EnginePolicy};
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacityStatus {
    Ok,
    Warning,
    Overload,
}

impl CapacityStatus {
    pub fn for_hours(hours: f64, policy: &CapacityPolicy) -> Self {
        if hours > policy.max_hours {
            CapacityStatus::Overload
        } else if hours > policy.warning_hours {
            CapacityStatus::Warning
        } else {
            CapacityStatus::Ok
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersonCapacity {
    pub hours: f64,
    /// Share of the ceiling, in percent.
    pub percentage: f64,
    pub status: CapacityStatus,
    pub available: f64,
    pub over_capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityInfo {
    pub total_hours: f64,
    /// Keyed by assignee; sorted by name.
    pub per_person: BTreeMap<String, PersonCapacity>,
    pub overloaded: Vec<String>,
    pub warnings: Vec<String>,
    pub max_capacity: f64,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Sum estimates per assignee and classify each person.
///
/// Unassigned tasks are ignored. Missing estimates count as zero, so someone with only
/// unestimated work shows up with 0 hours and an `Ok` status.
pub fn validate_capacity(tasks: &[Task], policy: &EnginePolicy) -> CapacityInfo {
    let cap = &policy.capacity;
    let mut hours_by_person: BTreeMap<String, f64> = BTreeMap::new();

    for t in tasks.iter().filter(|t| !policy.forever.is_forever(t)) {
        let Some(person) = t.assignee() else { continue };
        *hours_by_person.entry(person.to_string()).or_insert(0.0) +=
            t.hours_estimated.unwrap_or(0.0);
    }

    let mut info = CapacityInfo {
        total_hours: round1(hours_by_person.values().sum()),
        per_person: BTreeMap::new(),
        overloaded: Vec::new(),
        warnings: Vec::new(),
        max_capacity: cap.max_hours,
    };

    for (person, hours) in hours_by_person {
        let status = CapacityStatus::for_hours(hours, cap);
        match status {
            CapacityStatus::Overload => info.overloaded.push(person.clone()),
            CapacityStatus::Warning => info.warnings.push(person.clone()),
            CapacityStatus::Ok => {}
        }

        info.per_person.insert(
            person,
            PersonCapacity {
                hours: round1(hours),
                percentage: round1(hours / cap.max_hours * 100.0),
                status,
                available: round1((cap.max_hours - hours).max(0.0)),
                over_capacity: (hours - cap.max_hours).max(0.0),
            },
        );
    }

    if !info.overloaded.is_empty() {
        tracing::debug!(overloaded = ?info.overloaded, "capacity ceiling exceeded");
    }

    info
}

/// One row of the capacity table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityRow {
    pub person: String,
    #[serde(flatten)]
    pub capacity: PersonCapacity,
}

/// Per-person rows, heaviest allocation first.
pub fn capacity_rows(tasks: &[Task], policy: &EnginePolicy) -> Vec<CapacityRow> {
    let mut rows: Vec<CapacityRow> = validate_capacity(tasks, policy)
        .per_person
        .into_iter()
        .map(|(person, capacity)| CapacityRow { person, capacity })
        .collect();
    rows.sort_by(|a, b| b.capacity.hours.total_cmp(&a.capacity.hours));
    rows
}

pub fn unassigned_tasks(tasks: &[Task]) -> Vec<&Task> {
    tasks.iter().filter(|t| t.assignee().is_none()).collect()
}

pub fn tasks_for_person<'a>(tasks: &'a [Task], person: &str) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.assignee() == Some(person))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reassignment {
    pub task_num: String,
    pub subject: Option<String>,
    pub effort: f64,
    pub from_person: String,
    pub to_person: String,
    pub reason: String,
}

/// Greedy rebalancing proposal.
///
/// For each overloaded person, their tasks are visited smallest estimate first and
/// handed to whoever has the most headroom that still fits the task, until the
/// overload is covered. Nothing is mutated; callers decide what to apply.
pub fn suggest_reassignments(tasks: &[Task], policy: &EnginePolicy) -> Vec<Reassignment> {
    let info = validate_capacity(tasks, policy);
    if info.overloaded.is_empty() {
        return vec![];
    }

    let mut headroom: Vec<(String, f64)> = info
        .per_person
        .iter()
        .filter(|(_, c)| c.available > 0.0)
        .map(|(p, c)| (p.clone(), c.available))
        .collect();
    if headroom.is_empty() {
        return vec![];
    }
    sort_by_headroom(&mut headroom);

    let eligible: Vec<&Task> = tasks
        .iter()
        .filter(|t| !policy.forever.is_forever(t))
        .collect();

    let mut out = Vec::new();

    for person in &info.overloaded {
        let over = info.per_person[person].over_capacity;
        let mut remaining = over;

        let mut mine: Vec<&Task> = eligible
            .iter()
            .copied()
            .filter(|t| t.assignee() == Some(person.as_str()))
            .collect();
        mine.sort_by(|a, b| {
            a.hours_estimated
                .unwrap_or(0.0)
                .total_cmp(&b.hours_estimated.unwrap_or(0.0))
        });

        for task in mine {
            if remaining <= 0.0 {
                break;
            }
            let effort = task.hours_estimated.unwrap_or(0.0);
            if effort <= 0.0 {
                continue;
            }

            let Some(slot) = headroom.iter_mut().find(|(_, h)| *h >= effort) else {
                continue;
            };
            slot.1 -= effort;
            out.push(Reassignment {
                task_num: task.task_num.clone(),
                subject: task.subject.clone(),
                effort,
                from_person: person.clone(),
                to_person: slot.0.clone(),
                reason: format!("Balance workload ({person} overloaded by {over:.1}h)"),
            });
            remaining -= effort;
            sort_by_headroom(&mut headroom);
        }
    }

    out
}

fn sort_by_headroom(headroom: &mut [(String, f64)]) {
    headroom.sort_by(|a, b| b.1.total_cmp(&a.1));
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TeamCapacityMetrics {
    pub num_people: usize,
    pub total_team_capacity: f64,
    pub total_allocated: f64,
    pub total_available: f64,
    pub utilization_percentage: f64,
    pub num_overloaded: usize,
    pub num_warnings: usize,
    pub num_ok: usize,
    /// 0-100, higher is more even.
    pub balance_score: f64,
}

pub fn calculate_team_capacity_metrics(
    tasks: &[Task],
    policy: &EnginePolicy,
) -> TeamCapacityMetrics {
    let info = validate_capacity(tasks, policy);

    let num_people = info.per_person.len();
    let team_capacity = num_people as f64 * policy.capacity.max_hours;

    TeamCapacityMetrics {
        num_people,
        total_team_capacity: team_capacity,
        total_allocated: info.total_hours,
        total_available: (team_capacity - info.total_hours).max(0.0),
        utilization_percentage: if team_capacity > 0.0 {
            info.total_hours / team_capacity * 100.0
        } else {
            0.0
        },
        num_overloaded: info.overloaded.len(),
        num_warnings: info.warnings.len(),
        num_ok: num_people - info.overloaded.len() - info.warnings.len(),
        balance_score: balance_score(&info),
    }
}

/// Population std-dev of per-person percentages mapped onto 0-100.
/// A spread of 30 points or more scores 0.
fn balance_score(info: &CapacityInfo) -> f64 {
    const UNBALANCED_STD_DEV: f64 = 30.0;

    let pcts: Vec<f64> = info.per_person.values().map(|c| c.percentage).collect();
    if pcts.is_empty() {
        return 100.0;
    }

    let n = pcts.len() as f64;
    let mean = pcts.iter().sum::<f64>() / n;
    let variance = pcts.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    let score = (100.0 - variance.sqrt() / UNBALANCED_STD_DEV * 100.0).max(0.0);
    round1(score)
}
