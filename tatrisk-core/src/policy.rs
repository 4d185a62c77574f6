//! Policy constants for TAT limits, capacity ceilings, and forever-ticket keywords.
//!
//! Callers load these from configuration; the engines only read them.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::exclusion::ForeverTickets;
use crate::task::TicketType;

/// Incident turnaround limit, in days.
pub const TAT_IR_DAYS: f64 = 0.8;
/// Service request turnaround limit, in days.
pub const TAT_SR_DAYS: f64 = 22.0;
/// Fraction of the limit at which a task becomes at-risk.
pub const TAT_WARNING_THRESHOLD: f64 = 0.75;

/// Per-person ceiling per sprint, in hours.
pub const MAX_CAPACITY_HOURS: f64 = 52.0;
/// Above this (and up to the ceiling) a person is in the warning band.
pub const WARNING_CAPACITY_HOURS: f64 = 45.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TatPolicy {
    pub ir_days: f64,
    pub sr_days: f64,
    pub warning_threshold: f64,
}

impl Default for TatPolicy {
    fn default() -> Self {
        Self {
            ir_days: TAT_IR_DAYS,
            sr_days: TAT_SR_DAYS,
            warning_threshold: TAT_WARNING_THRESHOLD,
        }
    }
}

impl TatPolicy {
    /// Turnaround limit for a ticket type. PR/NC/AD have none.
    pub fn limit_for(&self, ticket_type: TicketType) -> Option<f64> {
        match ticket_type {
            TicketType::IR => Some(self.ir_days),
            TicketType::SR => Some(self.sr_days),
            TicketType::PR | TicketType::NC | TicketType::AD => None,
        }
    }

    /// Age at which a task of this type becomes at-risk.
    pub fn warning_days(&self, ticket_type: TicketType) -> Option<f64> {
        self.limit_for(ticket_type)
            .map(|limit| limit * self.warning_threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityPolicy {
    pub max_hours: f64,
    pub warning_hours: f64,
}

impl Default for CapacityPolicy {
    fn default() -> Self {
        Self {
            max_hours: MAX_CAPACITY_HOURS,
            warning_hours: WARNING_CAPACITY_HOURS,
        }
    }
}

/// Everything an engine call needs to know about policy, bundled so call sites pass one value.
#[derive(Debug, Clone)]
pub struct EnginePolicy {
    pub tat: TatPolicy,
    pub capacity: CapacityPolicy,
    pub forever: ForeverTickets,
    /// Zone used to stamp escalation audit lines.
    pub timezone: Tz,
}

impl Default for EnginePolicy {
    fn default() -> Self {
        Self {
            tat: TatPolicy::default(),
            capacity: CapacityPolicy::default(),
            forever: ForeverTickets::default(),
            timezone: chrono_tz::America::Chicago,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_ir_and_sr_have_limits() {
        let p = TatPolicy::default();
        assert_eq!(p.limit_for(TicketType::IR), Some(0.8));
        assert_eq!(p.limit_for(TicketType::SR), Some(22.0));
        assert_eq!(p.limit_for(TicketType::PR), None);
        assert_eq!(p.limit_for(TicketType::NC), None);
        assert_eq!(p.limit_for(TicketType::AD), None);
    }

    #[test]
    fn warning_days_scale_with_threshold() {
        let p = TatPolicy::default();
        assert!((p.warning_days(TicketType::IR).unwrap() - 0.6).abs() < 1e-9);
        assert!((p.warning_days(TicketType::SR).unwrap() - 16.5).abs() < 1e-9);
    }
}
