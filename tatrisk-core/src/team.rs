//! Team roster: a process-wide memoized list of valid assignees.
//!
//! The roster is loaded once through a caller-supplied loader and then served from
//! memory until `invalidate()` is called (e.g. after the config file changes). A loader
//! failure never reaches the caller: it is logged and the roster is empty, which
//! disables team filtering.

use anyhow::Result;
use once_cell::sync::Lazy;
use std::sync::{Arc, RwLock};

use crate::task::Task;

static ROSTER: Lazy<RwLock<Option<Arc<Vec<String>>>>> = Lazy::new(|| RwLock::new(None));

/// Return the cached roster, running `loader` only if nothing is cached.
pub fn load_with<F>(loader: F) -> Arc<Vec<String>>
where
    F: FnOnce() -> Result<Vec<String>>,
{
    if let Some(cached) = ROSTER.read().ok().and_then(|g| g.clone()) {
        return cached;
    }

    let mut slot = match ROSTER.write() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    };
    // Another caller may have filled it while we waited for the lock.
    if let Some(cached) = slot.as_ref() {
        return Arc::clone(cached);
    }

    let roster = match loader() {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!("could not load team members: {e:#}");
            Vec::new()
        }
    };
    let roster = Arc::new(roster);
    *slot = Some(Arc::clone(&roster));
    roster
}

/// Drop the cached roster so the next `load_with` reloads it.
pub fn invalidate() {
    match ROSTER.write() {
        Ok(mut g) => *g = None,
        Err(poisoned) => *poisoned.into_inner() = None,
    }
}

/// Keep tasks assigned to roster members (case-insensitive) plus unassigned tasks,
/// so backlog items stay visible. An empty roster keeps everything.
pub fn filter_by_team_members(tasks: &[Task], roster: &[String]) -> Vec<Task> {
    if roster.is_empty() {
        return tasks.to_vec();
    }
    let roster: Vec<String> = roster.iter().map(|n| n.trim().to_lowercase()).collect();

    tasks
        .iter()
        .filter(|t| match t.assignee() {
            None => true,
            Some(who) => roster.contains(&who.to_lowercase()),
        })
        .cloned()
        .collect()
}
