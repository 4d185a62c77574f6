//! Exclusion filters applied before any risk or compliance math.
//!
//! Forever tickets are standing meetings and similar recurring obligations; they are
//! exempt from TAT. Admin tickets are excluded only where a caller asks for it.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::task::{Task, TicketType};

pub const DEFAULT_FOREVER_KEYWORDS: [&str; 2] = ["Standing Meeting", "Miscellaneous Meetings"];

/// Case-insensitive subject matcher for forever tickets.
#[derive(Debug, Clone)]
pub struct ForeverTickets {
    keywords: Vec<String>,
    matcher: Option<Regex>,
}

impl Default for ForeverTickets {
    fn default() -> Self {
        Self::new(DEFAULT_FOREVER_KEYWORDS)
    }
}

impl ForeverTickets {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords
            .into_iter()
            .map(Into::into)
            .filter(|k: &String| !k.trim().is_empty())
            .collect();

        let matcher = if keywords.is_empty() {
            None
        } else {
            let pattern = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("forever-ticket keywords rejected, matching disabled: {e}");
                    None
                }
            }
        };

        Self { keywords, matcher }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// True iff the subject is present and contains any keyword.
    pub fn matches(&self, subject: Option<&str>) -> bool {
        match (subject, &self.matcher) {
            (Some(s), Some(re)) => re.is_match(s),
            _ => false,
        }
    }

    pub fn is_forever(&self, task: &Task) -> bool {
        self.matches(task.subject.as_deref())
    }

    /// Keep tasks whose subject does not match, in input order.
    pub fn exclude(&self, tasks: &[Task]) -> Vec<Task> {
        let kept: Vec<Task> = tasks
            .iter()
            .filter(|t| !self.is_forever(t))
            .cloned()
            .collect();
        if kept.len() != tasks.len() {
            tracing::debug!(
                excluded = tasks.len() - kept.len(),
                "dropped forever tickets"
            );
        }
        kept
    }
}

impl Serialize for ForeverTickets {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.keywords.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ForeverTickets {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let keywords = Vec::<String>::deserialize(deserializer)?;
        Ok(ForeverTickets::new(keywords))
    }
}

static DEFAULT_FOREVER: Lazy<ForeverTickets> = Lazy::new(ForeverTickets::default);

/// Shared matcher for the default keyword set, compiled once.
pub fn default_forever_tickets() -> &'static ForeverTickets {
    &DEFAULT_FOREVER
}

/// Forever-ticket check against the default keyword set.
pub fn is_forever_ticket(subject: Option<&str>) -> bool {
    DEFAULT_FOREVER.matches(subject)
}

/// Drop forever tickets using the default keyword set.
pub fn exclude_forever_tickets(tasks: &[Task]) -> Vec<Task> {
    DEFAULT_FOREVER.exclude(tasks)
}

/// Drop admin (AD) tickets. Untyped tasks are kept.
pub fn exclude_admin_tickets(tasks: &[Task]) -> Vec<Task> {
    tasks
        .iter()
        .filter(|t| t.ticket_type != Some(TicketType::AD))
        .cloned()
        .collect()
}
