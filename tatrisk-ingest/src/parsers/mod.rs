pub mod task_extract;

pub use task_extract::{parse_task_sheet, parse_tasks_csv, read_task_sheet, read_tasks_csv};
