//! Append-only report history.
//!
//! Each status change on a report appends exactly one [`TimelineEntry`]. Entries are
//! never edited, removed or reordered once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::report::Report;

/// Action labels written to the timeline, one per transition.
pub mod action {
    pub const REPORT_CREATED: &str = "Report Created";
    pub const FORWARDED: &str = "Forwarded to Koordinator";
    pub const TASK_ASSIGNED: &str = "Task Assigned";
    pub const TASK_STARTED: &str = "Task Started";
    pub const TASK_COMPLETED: &str = "Task Completed";
    pub const TASK_APPROVED: &str = "Task Approved";
    pub const TASK_REVISION: &str = "Task Needs Revision";
    pub const REVISION_ADDRESSED: &str = "Revision Addressed";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: u64,
    pub action: String,
    /// Display name of the acting user at the time of the action.
    pub user: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Append one entry to `report`'s timeline, stamped now, and return it.
///
/// Call after the status change it records, so the newest entry always names the
/// newest transition.
pub fn append_entry<'r>(report: &'r mut Report, action: &str, actor: &str, details: Option<String>) -> &'r TimelineEntry {
    let id = report.timeline.iter().map(|e| e.id).max().unwrap_or(0) + 1;
    report.timeline.push(TimelineEntry {
        id,
        action: action.to_string(),
        user: actor.to_string(),
        timestamp: Utc::now(),
        details,
    });
    &report.timeline[report.timeline.len() - 1]
}
