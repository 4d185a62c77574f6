//! Write task collections back out in the sprint sheet layout.

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

use tatrisk_core::Task;

/// Serialize flat rows as CSV with a header row.
pub fn write_rows<W: Write, T: Serialize>(writer: W, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("serializing row")?;
    }
    wtr.flush().context("flushing csv")?;
    Ok(())
}

/// Write the modelled columns only. To update an extract in its own layout use
/// `TaskSheet::write_updated`.
pub fn write_tasks_csv(path: impl AsRef<Path>, tasks: &[Task]) -> Result<()> {
    let path = path.as_ref();
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    write_rows(file, tasks).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IngestOptions, parse_tasks_csv};
    use chrono::Utc;
    use tatrisk_core::TicketType;

    #[test]
    fn written_sheet_reads_back() {
        let tasks = vec![
            Task::new("T1", "R1")
                .with_type(TicketType::SR)
                .with_status("Assigned")
                .with_subject("LAB-SR: report, v2")
                .with_priority(5)
                .with_days_open(25.0)
                .with_comments("line one\nline two"),
            Task::new("T2", "R2").with_status("Logged").with_subject("misc"),
        ];

        let mut buf = Vec::new();
        write_rows(&mut buf, &tasks).unwrap();

        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("TaskNum,TicketNum,TicketType,TaskStatus,Subject,"));

        let back = parse_tasks_csv(
            buf.as_slice(),
            &IngestOptions::new(Utc::now(), chrono_tz::UTC),
        )
        .unwrap();
        assert_eq!(back[0], tasks[0]);
        // Blank cell in a sheet with the column: no type, not inferred.
        assert_eq!(back[1].ticket_type, None);
        assert_eq!(back[1].customer_priority, None);
    }
}
