//! A parsed extract that remembers its source rows.
//!
//! Writing a sheet back only touches `CustomerPriority` and `Comments`; every other
//! cell, column, and row (including skipped rows) is emitted as it was read.

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use std::io::Write;
use std::path::Path;

use tatrisk_core::Task;

use crate::types::{Column, ColumnMap};

#[derive(Debug, Clone)]
pub struct TaskSheet {
    headers: StringRecord,
    cols: ColumnMap,
    records: Vec<StringRecord>,
    /// (index into `records`, task as parsed) for each row that produced a task.
    rows: Vec<(usize, Task)>,
}

impl TaskSheet {
    pub(crate) fn new(
        headers: StringRecord,
        cols: ColumnMap,
        records: Vec<StringRecord>,
        rows: Vec<(usize, Task)>,
    ) -> Self {
        Self {
            headers,
            cols,
            records,
            rows,
        }
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.rows.iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn into_tasks(self) -> Vec<Task> {
        self.rows.into_iter().map(|(_, t)| t).collect()
    }

    /// Write the sheet with `tasks` applied.
    ///
    /// `tasks` must be this sheet's tasks in the same order (as returned by `tasks()`,
    /// possibly mutated). A priority or comment that changed is written into its cell;
    /// when the sheet has no such column one is appended.
    pub fn write_updated<W: Write>(&self, writer: W, tasks: &[Task]) -> Result<()> {
        if tasks.len() != self.rows.len() {
            bail!(
                "sheet has {} tasks, got {} to write back",
                self.rows.len(),
                tasks.len()
            );
        }

        let mut changes: Vec<Option<(bool, bool)>> = vec![None; self.records.len()];
        for ((idx, before), after) in self.rows.iter().zip(tasks) {
            if before.task_num != after.task_num {
                bail!(
                    "task order changed: expected {}, found {}",
                    before.task_num,
                    after.task_num
                );
            }
            changes[*idx] = Some((
                before.customer_priority != after.customer_priority,
                before.comments != after.comments,
            ));
        }

        let mut headers: Vec<String> = self.headers.iter().map(str::to_string).collect();
        let any_priority = changes.iter().flatten().any(|c| c.0);
        let any_comment = changes.iter().flatten().any(|c| c.1);
        let priority_col = self.column_or_append(&mut headers, Column::CustomerPriority, any_priority);
        let comment_col = self.column_or_append(&mut headers, Column::Comments, any_comment);

        let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);
        wtr.write_record(&headers).context("writing header row")?;

        let mut task_iter = tasks.iter();
        for (idx, record) in self.records.iter().enumerate() {
            let mut fields: Vec<String> = record.iter().map(str::to_string).collect();
            if let Some((priority_changed, comment_changed)) = changes[idx] {
                let task = task_iter.next().context("task list shorter than sheet")?;
                if priority_changed {
                    if let Some(col) = priority_col {
                        let value = task.customer_priority.map(|p| p.to_string());
                        set_cell(&mut fields, col, value.unwrap_or_default());
                    }
                }
                if comment_changed {
                    if let Some(col) = comment_col {
                        set_cell(&mut fields, col, task.comments.clone().unwrap_or_default());
                    }
                }
            }
            if fields.len() < headers.len() && (priority_col.is_some() || comment_col.is_some()) {
                fields.resize(headers.len(), String::new());
            }
            wtr.write_record(&fields)
                .with_context(|| format!("writing row {}", idx + 2))?;
        }

        wtr.flush().context("flushing csv")?;
        Ok(())
    }

    pub fn write_updated_to(&self, path: impl AsRef<Path>, tasks: &[Task]) -> Result<()> {
        let path = path.as_ref();
        let file =
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        self.write_updated(file, tasks)
            .with_context(|| format!("writing {}", path.display()))
    }

    fn column_or_append(&self, headers: &mut Vec<String>, col: Column, needed: bool) -> Option<usize> {
        match self.cols.position(col) {
            Some(i) => Some(i),
            None if needed => {
                headers.push(col.aliases()[0].to_string());
                Some(headers.len() - 1)
            }
            None => None,
        }
    }
}

fn set_cell(fields: &mut Vec<String>, col: usize, value: String) {
    if fields.len() <= col {
        fields.resize(col + 1, String::new());
    }
    fields[col] = value;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IngestOptions, parse_task_sheet};
    use chrono::{TimeZone, Utc};
    use tatrisk_core::{EnginePolicy, apply_tat_escalation};

    fn opts() -> IngestOptions {
        IngestOptions::new(
            Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap(),
            chrono_tz::UTC,
        )
    }

    fn policy() -> EnginePolicy {
        EnginePolicy {
            timezone: chrono_tz::UTC,
            ..EnginePolicy::default()
        }
    }

    fn render(sheet: &TaskSheet, tasks: &[Task]) -> String {
        let mut buf = Vec::new();
        sheet.write_updated(&mut buf, tasks).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn escalation_keeps_raw_export_layout() {
        let csv = "\
Task ID,Ticket Number,Task Status,Subject,Created On,Assignee,Extra
9001,5001,Logged,LAB-SR: x,2026-02-01 12:00,ben,keep me
,5999,Logged,orphan row,2026-03-01 12:00,,
9002,5002,Logged,LAB-SR: y,2026-03-09 12:00,cy,
";
        let sheet = parse_task_sheet(csv.as_bytes(), &opts()).unwrap();
        let mut tasks = sheet.tasks();
        assert_eq!(tasks.len(), 2);
        assert_eq!(apply_tat_escalation(&mut tasks, &policy(), opts().reference), 1);

        let out = render(&sheet, &tasks);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Task ID,Ticket Number,Task Status,Subject,Created On,Assignee,Extra,CustomerPriority,Comments",
                "9001,5001,Logged,LAB-SR: x,2026-02-01 12:00,ben,keep me,5,[2026-03-10 12:00] Auto-escalated to Priority 5: SR TAT exceeded (37.0 days >= 22 days)",
                ",5999,Logged,orphan row,2026-03-01 12:00,,,,",
                "9002,5002,Logged,LAB-SR: y,2026-03-09 12:00,cy,,,",
            ]
        );
    }

    #[test]
    fn unchanged_sheet_is_written_verbatim() {
        let csv = "\
TaskNum,TicketNum,TicketType,TaskStatus,Subject,CustomerPriority,DaysOpen,Comments
T1,R1,IR,Assigned,s,4.0,0.2,first
T2,R2,XX,Assigned,LAB-SR: odd,,30,
";
        let sheet = parse_task_sheet(csv.as_bytes(), &opts()).unwrap();
        let tasks = sheet.tasks();
        assert_eq!(render(&sheet, &tasks).lines().collect::<Vec<_>>(), csv.lines().collect::<Vec<_>>());
    }

    #[test]
    fn only_priority_and_comment_cells_change() {
        let csv = "\
TaskNum,TicketNum,TicketType,TaskStatus,Subject,CustomerPriority,DaysOpen,Comments
T1,R1,IR,Assigned,s,4.0,1.5,first
";
        let sheet = parse_task_sheet(csv.as_bytes(), &opts()).unwrap();
        let mut tasks = sheet.tasks();
        apply_tat_escalation(&mut tasks, &policy(), opts().reference);

        let out = render(&sheet, &tasks).replace("\r\n", "\n");
        assert_eq!(
            out,
            "TaskNum,TicketNum,TicketType,TaskStatus,Subject,CustomerPriority,DaysOpen,Comments\n\
T1,R1,IR,Assigned,s,5,1.5,\"first\n[2026-03-10 12:00] Auto-escalated to Priority 5: IR TAT exceeded (1.5 days >= 0.8 days)\"\n"
        );
        let back = parse_task_sheet(out.as_bytes(), &opts()).unwrap().into_tasks();
        assert_eq!(back, tasks);
    }

    #[test]
    fn rejects_a_different_task_list() {
        let csv = "TaskNum,TicketNum,TaskStatus,Subject\nT1,R1,Assigned,s\nT2,R2,Assigned,s\n";
        let sheet = parse_task_sheet(csv.as_bytes(), &opts()).unwrap();
        let mut tasks = sheet.tasks();

        assert!(sheet.write_updated(Vec::new(), &tasks[..1]).is_err());
        tasks.swap(0, 1);
        let err = sheet.write_updated(Vec::new(), &tasks).unwrap_err();
        assert!(err.to_string().contains("task order changed"), "{err}");
    }
}
