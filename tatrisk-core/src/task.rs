//! Task model shared by the TAT, capacity, and metrics engines.
//!
//! Field names serialize to the sprint sheet column names (`TaskNum`, `DaysOpen`, ...)
//! so a collection can round-trip through CSV/JSON without a mapping layer.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Highest customer priority. Escalation promotes to this value.
pub const PRIORITY_CRITICAL: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TicketType {
    /// Incident request
    IR,
    /// Service request
    SR,
    /// Project request
    PR,
    /// Not classified
    NC,
    /// Admin request
    AD,
}

impl TicketType {
    pub const ALL: [TicketType; 5] = [
        TicketType::IR,
        TicketType::SR,
        TicketType::PR,
        TicketType::NC,
        TicketType::AD,
    ];

    /// Case-insensitive parse. Unknown codes return `None` and are treated as
    /// "no policy" by every engine.
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "IR" => Some(TicketType::IR),
            "SR" => Some(TicketType::SR),
            "PR" => Some(TicketType::PR),
            "NC" => Some(TicketType::NC),
            "AD" => Some(TicketType::AD),
            _ => None,
        }
    }

    /// Infer the type from a subject line like `LAB-SR: new analyzer interface`.
    /// Falls back to `NC`.
    pub fn from_subject(subject: &str) -> Self {
        static MARKERS: Lazy<Vec<(TicketType, Regex)>> = Lazy::new(|| {
            [TicketType::IR, TicketType::SR, TicketType::PR, TicketType::AD]
                .into_iter()
                .map(|t| {
                    let re = Regex::new(&format!(r"(?i)LAB-{code}|-{code}:", code = t.as_str()))
                        .expect("static ticket marker regex");
                    (t, re)
                })
                .collect()
        });

        MARKERS
            .iter()
            .find(|(_, re)| re.is_match(subject))
            .map(|(t, _)| *t)
            .unwrap_or(TicketType::NC)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketType::IR => "IR",
            TicketType::SR => "SR",
            TicketType::PR => "PR",
            TicketType::NC => "NC",
            TicketType::AD => "AD",
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TicketType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        TicketType::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown ticket type: {raw}")))
    }
}

/// Coarse grouping of the free-form workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusFamily {
    Completed,
    Cancelled,
    InProgress,
    Pending,
    Other,
}

impl StatusFamily {
    pub fn of(status: &str) -> Self {
        match status.trim() {
            "Completed" => StatusFamily::Completed,
            "Cancelled" | "Canceled" => StatusFamily::Cancelled,
            "Accepted" | "Assigned" | "Waiting" => StatusFamily::InProgress,
            "Logged" | "Pending" => StatusFamily::Pending,
            _ => StatusFamily::Other,
        }
    }
}

/// One row of a sprint task collection.
///
/// Every field the engines read is optional: a missing value means "not applicable"
/// and the task is skipped by the rule that needs it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Task {
    pub task_num: String,
    pub ticket_num: String,

    #[serde(default, deserialize_with = "lenient_ticket_type")]
    pub ticket_type: Option<TicketType>,

    #[serde(default)]
    pub task_status: String,

    #[serde(default)]
    pub subject: Option<String>,

    /// 0-5, 5 = critical.
    #[serde(default)]
    pub customer_priority: Option<u8>,

    /// Age in days.
    #[serde(default)]
    pub days_open: Option<f64>,

    /// Effort estimate in hours.
    #[serde(default)]
    pub hours_estimated: Option<f64>,

    #[serde(default)]
    pub assigned_to: Option<String>,

    #[serde(default)]
    pub section: Option<String>,

    /// Append-only audit trail.
    #[serde(default)]
    pub comments: Option<String>,
}

fn lenient_ticket_type<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<TicketType>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(TicketType::parse))
}

impl Task {
    pub fn new(task_num: impl Into<String>, ticket_num: impl Into<String>) -> Self {
        Self {
            task_num: task_num.into(),
            ticket_num: ticket_num.into(),
            ..Self::default()
        }
    }

    pub fn with_type(mut self, ticket_type: TicketType) -> Self {
        self.ticket_type = Some(ticket_type);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.task_status = status.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.customer_priority = Some(priority);
        self
    }

    pub fn with_days_open(mut self, days: f64) -> Self {
        self.days_open = Some(days);
        self
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours_estimated = Some(hours);
        self
    }

    pub fn with_assignee(mut self, person: impl Into<String>) -> Self {
        self.assigned_to = Some(person.into());
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn status_family(&self) -> StatusFamily {
        StatusFamily::of(&self.task_status)
    }

    /// Assignee with blank values normalized away.
    pub fn assignee(&self) -> Option<&str> {
        self.assigned_to
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn is_critical(&self) -> bool {
        self.customer_priority == Some(PRIORITY_CRITICAL)
    }

    /// Append one line to the audit trail.
    pub fn append_comment(&mut self, line: &str) {
        self.comments = match self.comments.take() {
            Some(existing) if !existing.is_empty() => Some(format!("{existing}\n{line}")),
            _ => Some(line.to_string()),
        };
    }
}
