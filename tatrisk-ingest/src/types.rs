use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use csv::StringRecord;

/// Logical columns of a task extract, each accepting the header spellings seen across
/// the ticketing exports and the sprint sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    TaskNum,
    TicketNum,
    TicketType,
    Status,
    Subject,
    CustomerPriority,
    DaysOpen,
    HoursEstimated,
    AssignedTo,
    Section,
    Comments,
    CreatedAt,
}

impl Column {
    pub const ALL: [Column; 12] = [
        Column::TaskNum,
        Column::TicketNum,
        Column::TicketType,
        Column::Status,
        Column::Subject,
        Column::CustomerPriority,
        Column::DaysOpen,
        Column::HoursEstimated,
        Column::AssignedTo,
        Column::Section,
        Column::Comments,
        Column::CreatedAt,
    ];

    /// Columns an extract must carry.
    pub const REQUIRED: [Column; 4] = [
        Column::TaskNum,
        Column::TicketNum,
        Column::Status,
        Column::Subject,
    ];

    /// Accepted header names, preferred first.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::TaskNum => &["TaskNum", "Task ID", "Task"],
            Column::TicketNum => &["TicketNum", "Ticket Number", "Parent ID", "Ticket ID"],
            Column::TicketType => &["TicketType", "Ticket Type"],
            Column::Status => &["TaskStatus", "Task Status", "Status"],
            Column::Subject => &["Subject", "Ticket_Subject"],
            Column::CustomerPriority => &["CustomerPriority", "Customer Priority", "Priority"],
            Column::DaysOpen => &["DaysOpen", "Days Open"],
            Column::HoursEstimated => &["HoursEstimated", "Estimated Effort", "Hours Estimated"],
            Column::AssignedTo => &["AssignedTo", "Assignee", "Assigned To"],
            Column::Section => &["Section", "Team"],
            Column::Comments => &["Comments"],
            Column::CreatedAt => &[
                "TicketCreatedDt",
                "Ticket Created Date",
                "TaskCreatedDt",
                "Task Created Date",
                "Created On",
                "Task Assigned Date",
            ],
        }
    }
}

/// Header position for each logical column present in an extract.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    idx: Vec<(Column, usize)>,
}

impl ColumnMap {
    pub fn from_headers(headers: &StringRecord) -> Self {
        let names: Vec<&str> = headers.iter().map(str::trim).collect();
        let idx = Column::ALL
            .iter()
            .filter_map(|col| {
                col.aliases()
                    .iter()
                    .find_map(|alias| names.iter().position(|h| h.eq_ignore_ascii_case(alias)))
                    .map(|i| (*col, i))
            })
            .collect();
        Self { idx }
    }

    pub fn has(&self, col: Column) -> bool {
        self.position(col).is_some()
    }

    pub fn position(&self, col: Column) -> Option<usize> {
        self.idx.iter().find(|(c, _)| *c == col).map(|(_, i)| *i)
    }

    /// Required columns that are absent, as "(A or B or C)" groups for error messages.
    pub fn missing_required(&self) -> Vec<String> {
        Column::REQUIRED
            .iter()
            .filter(|c| !self.has(**c))
            .map(|c| format!("({})", c.aliases().join(" or ")))
            .collect()
    }

    /// Trimmed cell, `None` when the column is absent or the cell is blank.
    pub fn get<'r>(&self, record: &'r StringRecord, col: Column) -> Option<&'r str> {
        self.position(col)
            .and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("nan"))
    }
}

/// How to derive values the extract does not carry directly.
#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    /// "Now" for computing `DaysOpen` from a creation date.
    pub reference: DateTime<Utc>,
    /// Zone for naive timestamps in the extract.
    pub timezone: Tz,
}

impl IngestOptions {
    pub fn new(reference: DateTime<Utc>, timezone: Tz) -> Self {
        Self { reference, timezone }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_resolve_case_insensitively_and_prefer_first_match() {
        let headers = StringRecord::from(vec![" task id ", "Parent ID", "Team", "TicketNum", "status"]);
        let cols = ColumnMap::from_headers(&headers);

        assert_eq!(cols.position(Column::TaskNum), Some(0));
        assert_eq!(cols.position(Column::TicketNum), Some(3));
        assert_eq!(cols.position(Column::Section), Some(2));
        assert_eq!(cols.position(Column::Status), Some(4));
        assert!(!cols.has(Column::Comments));
        assert_eq!(cols.missing_required(), vec!["(Subject or Ticket_Subject)"]);
    }

    #[test]
    fn blank_and_nan_cells_are_absent() {
        let cols = ColumnMap::from_headers(&StringRecord::from(vec!["TaskNum", "Comments", "Section"]));
        let row = StringRecord::from(vec!["  T1 ", "NaN", "   "]);
        assert_eq!(cols.get(&row, Column::TaskNum), Some("T1"));
        assert_eq!(cols.get(&row, Column::Comments), None);
        assert_eq!(cols.get(&row, Column::Section), None);
        assert_eq!(cols.get(&row, Column::Subject), None);
    }
}
