//! Metrics aggregator: sprint and section summaries for reporting.
//!
//! Pure grouping and counting over the forever-filtered collection. At-risk counts use
//! the TAT engine's classification, never ad hoc day cutoffs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::policy::EnginePolicy;
use crate::tat::{TatStatus, classify};
use crate::task::{StatusFamily, Task, TicketType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SprintSummary {
    pub total_tasks: usize,
    pub completed_tasks: usize,
    pub cancelled_tasks: usize,
    pub in_progress_tasks: usize,
    pub pending_tasks: usize,
    /// Percent of tasks completed; 0 for an empty sprint.
    pub completion_rate: f64,
    /// Priority -> count, tasks without a priority omitted.
    pub priority_breakdown: BTreeMap<u8, usize>,
    /// Every known type appears, zero-filled. Untyped tasks are not counted.
    pub type_breakdown: BTreeMap<TicketType, usize>,
    pub total_estimated_hours: f64,
    /// Over tasks with a known age; 0 when none.
    pub avg_days_open: f64,
    pub max_days_open: f64,
    /// At-risk plus exceeded.
    pub at_risk_count: usize,
    pub section_breakdown: BTreeMap<String, usize>,
}

fn mean_and_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (n, sum, max) = values.fold((0usize, 0.0, f64::MIN), |(n, s, m), v| (n + 1, s + v, m.max(v)));
    if n == 0 { (0.0, 0.0) } else { (sum / n as f64, max) }
}

fn is_at_risk_or_exceeded(task: &Task, policy: &EnginePolicy) -> bool {
    classify(task, policy) != TatStatus::Compliant
}

pub fn sprint_summary(tasks: &[Task], policy: &EnginePolicy) -> SprintSummary {
    let tasks = policy.forever.exclude(tasks);

    let count = |family: StatusFamily| tasks.iter().filter(|t| t.status_family() == family).count();
    let completed = count(StatusFamily::Completed);

    let mut priority_breakdown = BTreeMap::new();
    for p in tasks.iter().filter_map(|t| t.customer_priority) {
        *priority_breakdown.entry(p).or_insert(0) += 1;
    }

    let mut type_breakdown: BTreeMap<TicketType, usize> =
        TicketType::ALL.iter().map(|t| (*t, 0)).collect();
    for ty in tasks.iter().filter_map(|t| t.ticket_type) {
        *type_breakdown.entry(ty).or_insert(0) += 1;
    }

    let (avg_days_open, max_days_open) = mean_and_max(tasks.iter().filter_map(|t| t.days_open));

    SprintSummary {
        total_tasks: tasks.len(),
        completed_tasks: completed,
        cancelled_tasks: count(StatusFamily::Cancelled),
        in_progress_tasks: count(StatusFamily::InProgress),
        pending_tasks: count(StatusFamily::Pending),
        completion_rate: if tasks.is_empty() {
            0.0
        } else {
            completed as f64 / tasks.len() as f64 * 100.0
        },
        priority_breakdown,
        type_breakdown,
        total_estimated_hours: tasks.iter().filter_map(|t| t.hours_estimated).sum(),
        avg_days_open,
        max_days_open,
        at_risk_count: tasks.iter().filter(|t| is_at_risk_or_exceeded(t, policy)).count(),
        section_breakdown: section_counts(&tasks),
    }
}

fn section_counts(tasks: &[Task]) -> BTreeMap<String, usize> {
    let mut out = BTreeMap::new();
    for s in tasks.iter().filter_map(|t| t.section.as_deref()) {
        *out.entry(s.to_string()).or_insert(0) += 1;
    }
    out
}

/// Raw workflow status -> count, in descending count order (ties by name).
pub fn status_breakdown(tasks: &[Task], policy: &EnginePolicy) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in tasks.iter().filter(|t| !policy.forever.is_forever(t)) {
        *counts.entry(t.task_status.as_str()).or_insert(0) += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(s, n)| (s.to_string(), n))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

/// Tasks in `section`. Empty or `"All"` selects everything.
pub fn filter_by_section(tasks: &[Task], section: &str) -> Vec<Task> {
    if section.is_empty() || section == "All" {
        return tasks.to_vec();
    }
    tasks
        .iter()
        .filter(|t| t.section.as_deref() == Some(section))
        .cloned()
        .collect()
}

/// Distinct sections, sorted.
pub fn available_sections(tasks: &[Task]) -> Vec<String> {
    section_counts(tasks).into_keys().collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub section: String,
    pub total_tasks: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub pending: usize,
    pub at_risk: usize,
    pub total_effort: f64,
    /// Rounded to one decimal.
    pub avg_days_open: f64,
    pub team_members: Vec<String>,
}

pub fn section_summary(tasks: &[Task], section: &str, policy: &EnginePolicy) -> SectionSummary {
    let tasks = policy.forever.exclude(&filter_by_section(tasks, section));
    let count = |family: StatusFamily| tasks.iter().filter(|t| t.status_family() == family).count();

    let (avg, _) = mean_and_max(tasks.iter().filter_map(|t| t.days_open));

    let mut team_members: Vec<String> = tasks
        .iter()
        .filter_map(|t| t.assignee())
        .map(str::to_string)
        .collect();
    team_members.sort();
    team_members.dedup();

    SectionSummary {
        section: section.to_string(),
        total_tasks: tasks.len(),
        completed: count(StatusFamily::Completed),
        in_progress: count(StatusFamily::InProgress),
        pending: count(StatusFamily::Pending),
        at_risk: tasks.iter().filter(|t| is_at_risk_or_exceeded(t, policy)).count(),
        total_effort: tasks.iter().filter_map(|t| t.hours_estimated).sum(),
        avg_days_open: (avg * 10.0).round() / 10.0,
        team_members,
    }
}

/// One summary per section, largest first.
pub fn all_section_summaries(tasks: &[Task], policy: &EnginePolicy) -> Vec<SectionSummary> {
    let mut out: Vec<SectionSummary> = available_sections(tasks)
        .iter()
        .map(|s| section_summary(tasks, s, policy))
        .collect();
    out.sort_by(|a, b| b.total_tasks.cmp(&a.total_tasks));
    out
}
