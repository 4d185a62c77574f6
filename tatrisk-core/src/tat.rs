//! TAT engine: urgency classification, compliance metrics, and auto-escalation.
//!
//! Classification for a task with a TAT limit `L` and warning fraction `w`:
//! - compliant: `days_open < L * w`
//! - at-risk:   `L * w <= days_open < L`
//! - exceeded:  `days_open >= L`
//!
//! Tasks without a limit (PR/NC/AD/untyped), without an age, or matching a forever
//! keyword are always compliant and never escalated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::{EnginePolicy, TatPolicy};
use crate::task::{PRIORITY_CRITICAL, Task, TicketType};
use crate::time::audit_stamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TatStatus {
    Compliant,
    AtRisk,
    Exceeded,
}

/// Slack for the warning boundary only: `0.8 * 0.75` is `0.6000000000000001` in f64,
/// and ages are recorded to one decimal, so a 0.6-day incident must count as at-risk.
/// The limit itself is compared exactly.
const WARNING_EPSILON: f64 = 1e-9;

fn exceeded(days_open: f64, limit: f64) -> bool {
    days_open >= limit
}

fn warned(days_open: f64, warning_days: f64) -> bool {
    days_open + WARNING_EPSILON >= warning_days
}

impl TatStatus {
    fn for_age(days_open: f64, limit: f64, threshold: f64) -> Self {
        if exceeded(days_open, limit) {
            TatStatus::Exceeded
        } else if warned(days_open, limit * threshold) {
            TatStatus::AtRisk
        } else {
            TatStatus::Compliant
        }
    }
}

/// Classify a single task.
pub fn classify(task: &Task, policy: &EnginePolicy) -> TatStatus {
    classify_with_threshold(task, policy, policy.tat.warning_threshold)
}

fn classify_with_threshold(task: &Task, policy: &EnginePolicy, threshold: f64) -> TatStatus {
    if policy.forever.is_forever(task) {
        return TatStatus::Compliant;
    }
    match tat_limit(task, &policy.tat) {
        Some((days, limit)) => TatStatus::for_age(days, limit, threshold),
        None => TatStatus::Compliant,
    }
}

/// `(days_open, limit)` when the task has both an age and a TAT policy.
fn tat_limit(task: &Task, tat: &TatPolicy) -> Option<(f64, f64)> {
    let days = task.days_open?;
    let limit = tat.limit_for(task.ticket_type?)?;
    Some((days, limit))
}

/// A task that crossed the warning threshold, with its urgency figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AtRiskTask {
    #[serde(flatten)]
    pub task: Task,
    pub status: TatStatus,
    /// Share of the TAT allowance consumed, in percent.
    #[serde(rename = "TAT_Percentage")]
    pub tat_percentage: f64,
    /// Days left before the limit is hit; 0 once exceeded.
    #[serde(rename = "Days_Until_Escalation")]
    pub days_until_escalation: f64,
}

/// At-risk and exceeded IR/SR tasks, most urgent first.
///
/// `threshold` overrides the policy's warning fraction. The sort is stable, so tasks
/// with equal percentages keep their input order.
pub fn get_at_risk_tasks(
    tasks: &[Task],
    policy: &EnginePolicy,
    threshold: Option<f64>,
) -> Vec<AtRiskTask> {
    let threshold = threshold.unwrap_or(policy.tat.warning_threshold);

    let mut out: Vec<AtRiskTask> = tasks
        .iter()
        .filter_map(|t| {
            let status = classify_with_threshold(t, policy, threshold);
            if status == TatStatus::Compliant {
                return None;
            }
            let (days, limit) = tat_limit(t, &policy.tat)?;
            Some(AtRiskTask {
                task: t.clone(),
                status,
                tat_percentage: days / limit * 100.0,
                days_until_escalation: (limit - days).max(0.0),
            })
        })
        .collect();

    out.sort_by(|a, b| b.tat_percentage.total_cmp(&a.tat_percentage));
    out
}

/// Counts for one ticket type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TypeTatMetrics {
    pub tasks: usize,
    pub exceeded: usize,
    pub at_risk: usize,
    /// `(tasks - exceeded) / tasks * 100`, or 100 for an empty type.
    pub compliance_rate: f64,
}

impl Default for TypeTatMetrics {
    fn default() -> Self {
        Self {
            tasks: 0,
            exceeded: 0,
            at_risk: 0,
            compliance_rate: 100.0,
        }
    }
}

impl TypeTatMetrics {
    fn record(&mut self, status: TatStatus) {
        self.tasks += 1;
        match status {
            TatStatus::Exceeded => self.exceeded += 1,
            TatStatus::AtRisk => self.at_risk += 1,
            TatStatus::Compliant => {}
        }
    }

    fn finish(&mut self) {
        self.compliance_rate = if self.tasks == 0 {
            100.0
        } else {
            (self.tasks - self.exceeded) as f64 / self.tasks as f64 * 100.0
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TatMetrics {
    /// All non-forever tasks, any type.
    pub total_tasks: usize,
    pub ir: TypeTatMetrics,
    pub sr: TypeTatMetrics,
    pub total_exceeded: usize,
    pub total_at_risk: usize,
}

impl TatMetrics {
    /// Headline compliance: plain mean of the IR and SR rates.
    ///
    /// Not weighted by task count. A sprint with one late IR and fifty clean SRs
    /// reports 75%, which is what the dashboard has always shown.
    pub fn overall_compliance(&self) -> f64 {
        (self.ir.compliance_rate + self.sr.compliance_rate) / 2.0
    }
}

pub fn calculate_tat_metrics(tasks: &[Task], policy: &EnginePolicy) -> TatMetrics {
    let mut m = TatMetrics::default();

    for t in tasks.iter().filter(|t| !policy.forever.is_forever(t)) {
        m.total_tasks += 1;
        let status = classify(t, policy);
        match t.ticket_type {
            Some(TicketType::IR) => m.ir.record(status),
            Some(TicketType::SR) => m.sr.record(status),
            _ => {}
        }
    }

    m.ir.finish();
    m.sr.finish();
    m.total_exceeded = m.ir.exceeded + m.sr.exceeded;
    m.total_at_risk = m.ir.at_risk + m.sr.at_risk;
    m
}

/// Promote every breached IR/SR task to critical priority and record why.
///
/// Takes the collection by `&mut` so no one else can observe it mid-pass. Tasks that
/// are already critical are left untouched, which makes re-running a no-op.
/// Returns the number of tasks escalated by this call.
pub fn apply_tat_escalation(
    tasks: &mut [Task],
    policy: &EnginePolicy,
    now: DateTime<Utc>,
) -> usize {
    let stamp = audit_stamp(now, policy.timezone);
    let mut escalated = 0;

    for task in tasks.iter_mut() {
        if policy.forever.is_forever(task) {
            continue;
        }
        let Some(ticket_type) = task.ticket_type else { continue };
        let Some((days, limit)) = tat_limit(task, &policy.tat) else { continue };

        if !exceeded(days, limit) || task.is_critical() {
            continue;
        }

        let reason = format!("{ticket_type} TAT exceeded ({days:.1} days >= {limit} days)");
        task.customer_priority = Some(PRIORITY_CRITICAL);
        task.append_comment(&format!(
            "[{stamp}] Auto-escalated to Priority {PRIORITY_CRITICAL}: {reason}"
        ));
        escalated += 1;

        tracing::info!(task = %task.task_num, %ticket_type, days_open = days, "auto-escalated");
    }

    escalated
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy() -> EnginePolicy {
        EnginePolicy {
            timezone: chrono_tz::UTC,
            ..EnginePolicy::default()
        }
    }

    fn ir(id: &str, days: f64) -> Task {
        Task::new(id, format!("R-{id}"))
            .with_type(TicketType::IR)
            .with_days_open(days)
    }

    fn sr(id: &str, days: f64) -> Task {
        Task::new(id, format!("R-{id}"))
            .with_type(TicketType::SR)
            .with_days_open(days)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 4, 9, 15, 0).unwrap()
    }

    #[test]
    fn ir_boundaries() {
        let p = policy();
        assert_eq!(classify(&ir("a", 0.59), &p), TatStatus::Compliant);
        assert_eq!(classify(&ir("b", 0.6), &p), TatStatus::AtRisk);
        assert_eq!(classify(&ir("c", 0.79), &p), TatStatus::AtRisk);
        assert_eq!(classify(&ir("d", 0.8), &p), TatStatus::Exceeded);
    }

    #[test]
    fn limit_is_compared_without_slack() {
        let p = policy();
        let almost = ir("a", 0.7999999995);
        assert_eq!(classify(&almost, &p), TatStatus::AtRisk);

        let rows = get_at_risk_tasks(std::slice::from_ref(&almost), &p, None);
        assert!(rows[0].tat_percentage < 100.0);
        assert!(rows[0].days_until_escalation > 0.0);

        let mut tasks = vec![almost];
        assert_eq!(apply_tat_escalation(&mut tasks, &p, now()), 0);
        assert_eq!(tasks[0].customer_priority, None);
    }

    #[test]
    fn sr_boundaries() {
        let p = policy();
        assert_eq!(classify(&sr("a", 16.4), &p), TatStatus::Compliant);
        assert_eq!(classify(&sr("b", 16.5), &p), TatStatus::AtRisk);
        assert_eq!(classify(&sr("c", 21.9), &p), TatStatus::AtRisk);
        assert_eq!(classify(&sr("d", 22.0), &p), TatStatus::Exceeded);
    }

    #[test]
    fn no_policy_types_and_forever_tickets_are_compliant() {
        let p = policy();
        let pr = Task::new("p", "R").with_type(TicketType::PR).with_days_open(400.0);
        let untyped = Task::new("u", "R").with_days_open(400.0);
        let forever = sr("f", 90.0).with_subject("Lab Standing Meeting");
        let ageless = Task::new("n", "R").with_type(TicketType::IR);
        assert_eq!(classify(&pr, &p), TatStatus::Compliant);
        assert_eq!(classify(&untyped, &p), TatStatus::Compliant);
        assert_eq!(classify(&forever, &p), TatStatus::Compliant);
        assert_eq!(classify(&ageless, &p), TatStatus::Compliant);
    }

    #[test]
    fn at_risk_example_figures() {
        let out = get_at_risk_tasks(&[ir("T1", 0.65)], &policy(), None);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].status, TatStatus::AtRisk);
        assert!((out[0].tat_percentage - 81.25).abs() < 1e-9);
        assert!((out[0].days_until_escalation - 0.15).abs() < 1e-9);
    }

    #[test]
    fn at_risk_sorted_by_percentage_descending_and_stable() {
        let tasks = vec![
            sr("s1", 17.0),
            ir("i1", 0.7),
            sr("s2", 30.0),
            ir("i2", 0.1),
            sr("s3", 17.0),
            ir("i3", 0.76),
            sr("forever", 40.0).with_subject("misc Standing meeting"),
        ];
        let out = get_at_risk_tasks(&tasks, &policy(), None);
        let ids: Vec<_> = out.iter().map(|a| a.task.task_num.as_str()).collect();
        // 136.4%, 95%, 87.5%, then the two 77.3% SRs in input order
        assert_eq!(ids, vec!["s2", "i3", "i1", "s1", "s3"]);

        for w in out.windows(2) {
            assert!(w[0].tat_percentage >= w[1].tat_percentage);
        }
        assert_eq!(out[0].days_until_escalation, 0.0);
    }

    #[test]
    fn at_risk_threshold_override() {
        let tasks = vec![sr("s1", 12.0)];
        assert!(get_at_risk_tasks(&tasks, &policy(), None).is_empty());
        assert_eq!(get_at_risk_tasks(&tasks, &policy(), Some(0.5)).len(), 1);
    }

    #[test]
    fn at_risk_on_empty_input() {
        assert!(get_at_risk_tasks(&[], &policy(), None).is_empty());
    }

    #[test]
    fn metrics_on_empty_input() {
        let m = calculate_tat_metrics(&[], &policy());
        assert_eq!(m.total_tasks, 0);
        assert_eq!(m.ir.compliance_rate, 100.0);
        assert_eq!(m.sr.compliance_rate, 100.0);
        assert_eq!(m.total_at_risk, 0);
        assert_eq!(m.total_exceeded, 0);
        assert_eq!(m.overall_compliance(), 100.0);
    }

    #[test]
    fn metrics_counts_and_rates() {
        let tasks = vec![
            ir("i1", 0.2),
            ir("i2", 0.65),
            ir("i3", 1.5),
            ir("i4", 0.9),
            sr("s1", 5.0),
            sr("s2", 25.0),
            Task::new("p1", "R").with_type(TicketType::PR).with_days_open(50.0),
            sr("f1", 99.0).with_subject("Standing Meeting"),
        ];
        let m = calculate_tat_metrics(&tasks, &policy());
        assert_eq!(m.total_tasks, 7);
        assert_eq!(m.ir.tasks, 4);
        assert_eq!(m.ir.exceeded, 2);
        assert_eq!(m.ir.at_risk, 1);
        assert_eq!(m.ir.compliance_rate, 50.0);
        assert_eq!(m.sr.tasks, 2);
        assert_eq!(m.sr.exceeded, 1);
        assert_eq!(m.sr.compliance_rate, 50.0);
        assert_eq!(m.total_exceeded, 3);
        assert_eq!(m.total_at_risk, 1);
    }

    #[test]
    fn overall_compliance_is_unweighted() {
        let mut tasks = vec![ir("late", 2.0)];
        tasks.extend((0..9).map(|i| sr(&format!("s{i}"), 1.0)));
        let m = calculate_tat_metrics(&tasks, &policy());
        assert_eq!(m.ir.compliance_rate, 0.0);
        assert_eq!(m.sr.compliance_rate, 100.0);
        assert_eq!(m.overall_compliance(), 50.0);
    }

    #[test]
    fn escalates_breached_sr_once() {
        let mut tasks = vec![sr("T7", 25.0).with_priority(2)];
        let p = policy();

        assert_eq!(apply_tat_escalation(&mut tasks, &p, now()), 1);
        assert_eq!(tasks[0].customer_priority, Some(5));
        assert_eq!(
            tasks[0].comments.as_deref(),
            Some("[2026-03-04 09:15] Auto-escalated to Priority 5: SR TAT exceeded (25.0 days >= 22 days)")
        );

        let before = tasks.clone();
        assert_eq!(apply_tat_escalation(&mut tasks, &p, now()), 0);
        assert_eq!(tasks, before);
    }

    #[test]
    fn escalation_appends_to_existing_comments() {
        let mut tasks = vec![ir("T1", 0.8).with_comments("waiting on vendor")];
        assert_eq!(apply_tat_escalation(&mut tasks, &policy(), now()), 1);
        assert_eq!(
            tasks[0].comments.as_deref(),
            Some("waiting on vendor\n[2026-03-04 09:15] Auto-escalated to Priority 5: IR TAT exceeded (0.8 days >= 0.8 days)")
        );
    }

    #[test]
    fn escalation_skips_ineligible_tasks() {
        let mut tasks = vec![
            ir("young", 0.5),
            sr("critical", 30.0).with_priority(5).with_comments("already"),
            sr("forever", 30.0).with_subject("Miscellaneous Meetings"),
            Task::new("pr", "R").with_type(TicketType::PR).with_days_open(99.0),
            Task::new("untyped", "R").with_days_open(99.0),
            Task::new("ageless", "R").with_type(TicketType::IR),
        ];
        let before = tasks.clone();
        assert_eq!(apply_tat_escalation(&mut tasks, &policy(), now()), 0);
        assert_eq!(tasks, before);
    }

    #[test]
    fn missing_priority_counts_as_zero() {
        let mut tasks = vec![ir("T1", 3.0)];
        assert_eq!(apply_tat_escalation(&mut tasks, &policy(), now()), 1);
        assert_eq!(tasks[0].customer_priority, Some(5));
    }
}
