//! tatrisk-ingest: task extract parsing and sprint sheet export.

pub mod export;
pub mod parsers;
pub mod sheet;
pub mod types;

pub use export::{write_rows, write_tasks_csv};
pub use parsers::{parse_task_sheet, parse_tasks_csv, read_task_sheet, read_tasks_csv};
pub use sheet::TaskSheet;
pub use types::{Column, ColumnMap, IngestOptions};
