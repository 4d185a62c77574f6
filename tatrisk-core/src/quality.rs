//! Data-quality checks over a task collection.
//!
//! These report problems; they never reject data. Engines already treat missing values
//! as "not applicable".

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::task::{PRIORITY_CRITICAL, Task};

/// Estimates above this are flagged as suspicious.
pub const MAX_PLAUSIBLE_ESTIMATE_HOURS: f64 = 100.0;

/// Problems with a single task, one message per issue.
pub fn validate_task(task: &Task) -> Vec<String> {
    let mut errors = Vec::new();

    if task.task_num.trim().is_empty() {
        errors.push("TaskNum is required".to_string());
    }
    if task.ticket_num.trim().is_empty() {
        errors.push("TicketNum is required".to_string());
    }
    if let Some(p) = task.customer_priority {
        if p > PRIORITY_CRITICAL {
            errors.push(format!("CustomerPriority must be 0-5 (received: {p})"));
        }
    }
    if let Some(h) = task.hours_estimated {
        if h < 0.0 {
            errors.push("Estimated Effort cannot be negative".to_string());
        } else if h > MAX_PLAUSIBLE_ESTIMATE_HOURS {
            errors.push("Estimated Effort seems unusually high (>100 hours)".to_string());
        }
    }
    if task.days_open.is_some_and(|d| d < 0.0) {
        errors.push("DaysOpen cannot be negative".to_string());
    }

    errors
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_rows: usize,
    pub issues: Vec<String>,
    pub unassigned_tasks: usize,
    pub tasks_without_estimate: usize,
    /// 0-100.
    pub quality_score: f64,
}

/// Collection-level report: missing critical fields, assignments, estimates, bad
/// priorities, negative values, and duplicate task numbers.
pub fn data_quality_report(tasks: &[Task]) -> DataQualityReport {
    // Critical fields + assignments + estimates + priorities.
    const TOTAL_CHECKS: f64 = 7.0;

    let mut issues = Vec::new();

    let missing = |name: &str, n: usize, issues: &mut Vec<String>| {
        if n > 0 {
            issues.push(format!("{name}: {n} missing values"));
        }
    };
    missing("TaskNum", tasks.iter().filter(|t| t.task_num.trim().is_empty()).count(), &mut issues);
    missing("TicketNum", tasks.iter().filter(|t| t.ticket_num.trim().is_empty()).count(), &mut issues);
    missing("Status", tasks.iter().filter(|t| t.task_status.trim().is_empty()).count(), &mut issues);
    missing("Subject", tasks.iter().filter(|t| t.subject.is_none()).count(), &mut issues);

    let unassigned = tasks.iter().filter(|t| t.assignee().is_none()).count();
    if unassigned > 0 {
        issues.push(format!("{unassigned} tasks without assignment"));
    }

    let no_estimate = tasks.iter().filter(|t| t.hours_estimated.is_none()).count();
    if no_estimate > 0 {
        issues.push(format!("{no_estimate} tasks without effort estimate"));
    }

    let bad_priority = tasks
        .iter()
        .filter(|t| t.customer_priority.is_some_and(|p| p > PRIORITY_CRITICAL))
        .count();
    if bad_priority > 0 {
        issues.push(format!("{bad_priority} tasks with invalid priority"));
    }

    let negative = tasks
        .iter()
        .filter(|t| t.hours_estimated.is_some_and(|h| h < 0.0) || t.days_open.is_some_and(|d| d < 0.0))
        .count();
    if negative > 0 {
        issues.push(format!("{negative} tasks with negative hours or age"));
    }

    let mut seen = HashSet::new();
    let duplicates = tasks
        .iter()
        .filter(|t| !t.task_num.is_empty() && !seen.insert(t.task_num.as_str()))
        .count();
    if duplicates > 0 {
        issues.push(format!("{duplicates} duplicate task numbers"));
    }

    let quality_score = ((TOTAL_CHECKS - issues.len() as f64) / TOTAL_CHECKS * 100.0).max(0.0);

    DataQualityReport {
        total_rows: tasks.len(),
        issues,
        unassigned_tasks: unassigned,
        tasks_without_estimate: no_estimate,
        quality_score,
    }
}
