//! tatrisk-core: TAT risk and capacity engine for sprint task collections.
//!
//! Every operation takes a task slice plus an `EnginePolicy` and returns derived data.
//! The only mutation is `apply_tat_escalation`, which needs `&mut [Task]`.

pub mod capacity;
pub mod exclusion;
pub mod metrics;
pub mod policy;
pub mod quality;
pub mod task;
pub mod tat;
pub mod team;
pub mod time;

pub use capacity::{
    CapacityInfo, CapacityRow, CapacityStatus, PersonCapacity, Reassignment,
    TeamCapacityMetrics, calculate_team_capacity_metrics, capacity_rows, suggest_reassignments,
    tasks_for_person, unassigned_tasks, validate_capacity,
};
pub use exclusion::{
    ForeverTickets, default_forever_tickets, exclude_admin_tickets, exclude_forever_tickets,
    is_forever_ticket,
};
pub use metrics::{
    SectionSummary, SprintSummary, all_section_summaries, available_sections,
    filter_by_section, section_summary, sprint_summary, status_breakdown,
};
pub use policy::{CapacityPolicy, EnginePolicy, TatPolicy};
pub use quality::{DataQualityReport, data_quality_report, validate_task};
pub use task::{PRIORITY_CRITICAL, StatusFamily, Task, TicketType};
pub use tat::{
    AtRiskTask, TatMetrics, TatStatus, TypeTatMetrics, apply_tat_escalation,
    calculate_tat_metrics, classify, get_at_risk_tasks,
};
pub use team::filter_by_team_members;
