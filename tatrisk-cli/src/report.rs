//! Plain-text renderers for the terminal. Each returns a `String` so commands can
//! print it and tests can inspect it.

use std::fmt::Write;

use tatrisk_core::{
    AtRiskTask, CapacityRow, DataQualityReport, Reassignment, SectionSummary, SprintSummary,
    TatMetrics, TeamCapacityMetrics, TypeTatMetrics,
};

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

pub fn at_risk(rows: &[AtRiskTask]) -> String {
    if rows.is_empty() {
        return "No tasks at risk.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<10} {:<4} {:<9} {:>7} {:>8} {:>9}  {}",
        "Task", "Type", "Status", "TAT %", "Days", "Left", "Subject"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "{:<10} {:<4} {:<9} {:>6.1}% {:>8.1} {:>9.1}  {}",
            r.task.task_num,
            r.task.ticket_type.map(|t| t.as_str()).unwrap_or("-"),
            format!("{:?}", r.status),
            r.tat_percentage,
            r.task.days_open.unwrap_or(0.0),
            r.days_until_escalation,
            truncate(r.task.subject.as_deref().unwrap_or(""), 50),
        );
    }
    out
}

fn type_line(out: &mut String, label: &str, m: &TypeTatMetrics) {
    let _ = writeln!(
        out,
        "{label}: {} tasks, {} exceeded, {} at risk, {:.1}% compliant",
        m.tasks, m.exceeded, m.at_risk, m.compliance_rate
    );
}

pub fn tat(m: &TatMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# TAT compliance\n");
    let _ = writeln!(out, "Tasks considered: {}", m.total_tasks);
    type_line(&mut out, "IR", &m.ir);
    type_line(&mut out, "SR", &m.sr);
    let _ = writeln!(
        out,
        "\nExceeded: {}  At risk: {}  Overall: {:.1}%",
        m.total_exceeded,
        m.total_at_risk,
        m.overall_compliance()
    );
    out
}

pub fn capacity(rows: &[CapacityRow], team: &TeamCapacityMetrics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Sprint capacity\n");
    if rows.is_empty() {
        let _ = writeln!(out, "(no assigned work)");
    } else {
        let _ = writeln!(
            out,
            "{:<20} {:>7} {:>7} {:>9}  {}",
            "Person", "Hours", "Load", "Available", "Status"
        );
        for r in rows {
            let c = &r.capacity;
            let _ = writeln!(
                out,
                "{:<20} {:>7.1} {:>6.1}% {:>9.1}  {:?}",
                truncate(&r.person, 20),
                c.hours,
                c.percentage,
                c.available,
                c.status
            );
        }
    }
    let _ = writeln!(
        out,
        "\nTeam: {} people, {:.1}/{:.1} h allocated ({:.1}%), balance {:.1}",
        team.num_people,
        team.total_allocated,
        team.total_team_capacity,
        team.utilization_percentage,
        team.balance_score
    );
    let _ = writeln!(
        out,
        "Overloaded: {}  Warning: {}  OK: {}",
        team.num_overloaded, team.num_warnings, team.num_ok
    );
    out
}

pub fn reassignments(moves: &[Reassignment]) -> String {
    if moves.is_empty() {
        return "No reassignments needed.\n".to_string();
    }
    let mut out = String::from("## Suggested reassignments\n\n");
    for m in moves {
        let _ = writeln!(
            out,
            "- {} ({:.1} h): {} -> {} | {}",
            m.task_num, m.effort, m.from_person, m.to_person, m.reason
        );
    }
    out
}

pub fn summary(s: &SprintSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Sprint summary\n");
    let _ = writeln!(
        out,
        "Tasks: {} (completed {}, in progress {}, pending {}, cancelled {})",
        s.total_tasks, s.completed_tasks, s.in_progress_tasks, s.pending_tasks, s.cancelled_tasks
    );
    let _ = writeln!(out, "Completion: {:.1}%", s.completion_rate);
    let _ = writeln!(out, "Estimated hours: {:.1}", s.total_estimated_hours);
    let _ = writeln!(
        out,
        "Days open: avg {:.1}, max {:.1}",
        s.avg_days_open, s.max_days_open
    );
    let _ = writeln!(out, "At risk or exceeded: {}", s.at_risk_count);

    let types: Vec<String> = s
        .type_breakdown
        .iter()
        .map(|(t, n)| format!("{t}={n}"))
        .collect();
    let _ = writeln!(out, "Types: {}", types.join(" "));

    if !s.priority_breakdown.is_empty() {
        let prios: Vec<String> = s
            .priority_breakdown
            .iter()
            .map(|(p, n)| format!("P{p}={n}"))
            .collect();
        let _ = writeln!(out, "Priorities: {}", prios.join(" "));
    }

    if !s.section_breakdown.is_empty() {
        let _ = writeln!(out, "\n## Sections\n");
        for (section, n) in &s.section_breakdown {
            let _ = writeln!(out, "- {section}: {n}");
        }
    }
    out
}

pub fn sections(rows: &[SectionSummary]) -> String {
    if rows.is_empty() {
        return "No sections found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<28} {:>5} {:>5} {:>5} {:>5} {:>5} {:>8} {:>7}",
        "Section", "Tasks", "Done", "Prog", "Pend", "Risk", "Effort", "AvgAge"
    );
    for s in rows {
        let _ = writeln!(
            out,
            "{:<28} {:>5} {:>5} {:>5} {:>5} {:>5} {:>8.1} {:>7.1}",
            truncate(&s.section, 28),
            s.total_tasks,
            s.completed,
            s.in_progress,
            s.pending,
            s.at_risk,
            s.total_effort,
            s.avg_days_open
        );
    }
    out
}

pub fn quality(r: &DataQualityReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Data quality\n");
    let _ = writeln!(out, "Rows: {}", r.total_rows);
    let _ = writeln!(out, "Score: {:.1}", r.quality_score);
    if r.issues.is_empty() {
        let _ = writeln!(out, "\nNo issues found.");
    } else {
        let _ = writeln!(out, "\n## Issues\n");
        for issue in &r.issues {
            let _ = writeln!(out, "- {issue}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tatrisk_core::{EnginePolicy, Task, TicketType, get_at_risk_tasks};

    #[test]
    fn truncates_long_text_by_chars() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ééééééééé", 5), "éé...");
    }

    #[test]
    fn at_risk_table_lists_tasks_in_given_order() {
        let tasks = vec![
            Task::new("T1", "R1")
                .with_type(TicketType::IR)
                .with_days_open(1.0)
                .with_subject("analyzer down"),
            Task::new("T2", "R2")
                .with_type(TicketType::SR)
                .with_days_open(18.0),
        ];
        let rows = get_at_risk_tasks(&tasks, &EnginePolicy::default(), None);
        let text = at_risk(&rows);

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("T1"));
        assert!(lines[1].contains("Exceeded"));
        assert!(lines[1].contains("125.0%"));
        assert!(lines[2].contains("AtRisk"));
        assert_eq!(at_risk(&[]), "No tasks at risk.\n");
    }

    #[test]
    fn tat_report_shows_headline_compliance() {
        let m = TatMetrics {
            total_tasks: 3,
            ir: TypeTatMetrics {
                tasks: 2,
                exceeded: 1,
                at_risk: 0,
                compliance_rate: 50.0,
            },
            ..TatMetrics::default()
        };
        let text = tat(&m);
        assert!(text.contains("IR: 2 tasks, 1 exceeded, 0 at risk, 50.0% compliant"));
        assert!(text.contains("Overall: 75.0%"));
    }

    #[test]
    fn quality_report_lists_issues() {
        let r = DataQualityReport {
            total_rows: 4,
            issues: vec!["2 tasks unassigned".to_string()],
            unassigned_tasks: 2,
            tasks_without_estimate: 0,
            quality_score: 85.7,
        };
        let text = quality(&r);
        assert!(text.contains("Score: 85.7"));
        assert!(text.contains("- 2 tasks unassigned"));
    }
}
