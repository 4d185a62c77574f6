//! Task extract parser (CSV).
//!
//! Accepts both the sprint sheet layout (`TaskNum,TicketNum,TicketType,...,DaysOpen`)
//! and raw ticketing exports (`Task ID,Ticket Number,Task Status,...,Created On`).
//! `TicketType` is inferred from the subject only when the extract has no such column;
//! a blank or unknown cell in a sheet that carries the column means "no policy".
//! Missing `DaysOpen` is computed from the creation date.

use anyhow::{Context, Result, bail};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;

use tatrisk_core::time::{days_open, parse_flexible};
use tatrisk_core::{Task, TicketType};

use crate::sheet::TaskSheet;
use crate::types::{Column, ColumnMap, IngestOptions};

/// Read a task extract from disk.
pub fn read_tasks_csv(path: impl AsRef<Path>, opts: &IngestOptions) -> Result<Vec<Task>> {
    Ok(read_task_sheet(path, opts)?.into_tasks())
}

/// Parse a task extract from any reader.
///
/// Rows without a task number are skipped. Unparseable numeric cells become `None`
/// with a warning rather than failing the whole extract.
pub fn parse_tasks_csv<R: Read>(reader: R, opts: &IngestOptions) -> Result<Vec<Task>> {
    Ok(parse_task_sheet(reader, opts)?.into_tasks())
}

/// Like `read_tasks_csv`, but keeps the source rows so the sheet can be written back
/// in its own layout.
pub fn read_task_sheet(path: impl AsRef<Path>, opts: &IngestOptions) -> Result<TaskSheet> {
    let path = path.as_ref();
    let file =
        std::fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_task_sheet(file, opts).with_context(|| format!("parsing {}", path.display()))
}

pub fn parse_task_sheet<R: Read>(reader: R, opts: &IngestOptions) -> Result<TaskSheet> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers = rdr.headers().context("reading header row")?.clone();
    let cols = ColumnMap::from_headers(&headers);

    let missing = cols.missing_required();
    if !missing.is_empty() {
        bail!("missing required columns: {}", missing.join(", "));
    }

    let mut records = Vec::new();
    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("reading row {}", i + 2))?;
        let line = i + 2;

        if let Some(task) = parse_row(&cols, &record, opts, line) {
            rows.push((records.len(), task));
        } else {
            tracing::debug!(line, "skipping row without task number");
        }
        records.push(record);
    }

    tracing::debug!(rows = rows.len(), "parsed task extract");
    Ok(TaskSheet::new(headers, cols, records, rows))
}

fn parse_row(
    cols: &ColumnMap,
    record: &StringRecord,
    opts: &IngestOptions,
    line: usize,
) -> Option<Task> {
    let task_num = cols.get(record, Column::TaskNum)?;

    let mut task = Task::new(task_num, cols.get(record, Column::TicketNum).unwrap_or(""));
    task.task_status = cols.get(record, Column::Status).unwrap_or("").to_string();
    task.subject = cols.get(record, Column::Subject).map(str::to_string);
    task.assigned_to = cols.get(record, Column::AssignedTo).map(str::to_string);
    task.section = cols.get(record, Column::Section).map(str::to_string);
    task.comments = cols.get(record, Column::Comments).map(str::to_string);
    task.ticket_type = ticket_type(cols, record, task.subject.as_deref(), line);
    task.customer_priority = priority(cols, record, line);
    task.hours_estimated = number(cols, record, Column::HoursEstimated, line);
    task.days_open = number(cols, record, Column::DaysOpen, line)
        .or_else(|| age_from_created(cols, record, opts, line));
    Some(task)
}

fn ticket_type(
    cols: &ColumnMap,
    record: &StringRecord,
    subject: Option<&str>,
    line: usize,
) -> Option<TicketType> {
    if !cols.has(Column::TicketType) {
        return Some(subject.map(TicketType::from_subject).unwrap_or(TicketType::NC));
    }
    let raw = cols.get(record, Column::TicketType)?;
    let parsed = TicketType::parse(raw);
    if parsed.is_none() {
        tracing::warn!(line, value = raw, "unknown ticket type, no TAT policy applies");
    }
    parsed
}

fn number(cols: &ColumnMap, record: &StringRecord, col: Column, line: usize) -> Option<f64> {
    let raw = cols.get(record, col)?;
    match raw.replace(',', "").parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::warn!(line, column = ?col, value = raw, "ignoring unparseable number");
            None
        }
    }
}

/// Priorities arrive as `3` or `3.0` depending on which tool wrote the sheet.
fn priority(cols: &ColumnMap, record: &StringRecord, line: usize) -> Option<u8> {
    let v = number(cols, record, Column::CustomerPriority, line)?;
    if (0.0..=f64::from(u8::MAX)).contains(&v) && v.fract() == 0.0 {
        Some(v as u8)
    } else {
        tracing::warn!(line, value = v, "ignoring out-of-range priority");
        None
    }
}

fn age_from_created(
    cols: &ColumnMap,
    record: &StringRecord,
    opts: &IngestOptions,
    line: usize,
) -> Option<f64> {
    let raw = cols.get(record, Column::CreatedAt)?;
    match parse_flexible(raw, opts.timezone) {
        Ok(created) => Some(days_open(created, opts.reference)),
        Err(e) => {
            tracing::warn!(line, "no age for row: {e}");
            None
        }
    }
}
