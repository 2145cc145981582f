//! Delegated work against a report, and the state machine that drives it.
//!
//! ```text
//! assign ──► assigned ──start──► in-progress ──complete──► completed ──approve──► approved
//!                                     ▲                        │
//!                                     └──acknowledge── revision ◄──request revision
//! ```
//!
//! Every transition moves the task and its owning report in lockstep and appends one
//! timeline entry to the report. Preconditions are checked before anything is written,
//! so a rejected call leaves both values untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WorkflowError};
use crate::fields::{normalise_names, ReportStatus, Role, TaskStatus};
use crate::report::Report;
use crate::session::Session;
use crate::timeline::{action, append_entry};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub report_id: u64,
    /// Staff names the work is delegated to.
    pub assigned_to: Vec<String>,
    /// Id of the assigning koordinator.
    pub assigned_by: u64,
    /// Checklist labels selected by the koordinator.
    pub todo_list: Vec<String>,
    /// Koordinator instructions.
    #[serde(default)]
    pub catatan: String,
    /// Revision feedback; present only while a revision is outstanding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catatan_revisi: Option<String>,
    pub status: TaskStatus,
    pub assigned_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// What a koordinator hands out when assigning a task.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    pub assignees: Vec<String>,
    pub todo_list: Vec<String>,
    pub catatan: String,
}

/// Events accepted by an existing task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskEvent {
    Start,
    Complete,
    Approve,
    RequestRevision,
    AcknowledgeRevision,
}

impl TaskEvent {
    pub fn name(self) -> &'static str {
        match self {
            TaskEvent::Start => "start",
            TaskEvent::Complete => "complete",
            TaskEvent::Approve => "approve",
            TaskEvent::RequestRevision => "request revision on",
            TaskEvent::AcknowledgeRevision => "acknowledge revision on",
        }
    }

    fn actor(self) -> Role {
        match self {
            TaskEvent::Approve | TaskEvent::RequestRevision => Role::Koordinator,
            TaskEvent::Start | TaskEvent::Complete | TaskEvent::AcknowledgeRevision => Role::Staff,
        }
    }
}

/// Target task and report status for `event` fired from `from`, if defined.
pub fn next_status(from: TaskStatus, event: TaskEvent) -> Option<(TaskStatus, ReportStatus)> {
    use TaskEvent::*;
    match (from, event) {
        (TaskStatus::Assigned, Start) => Some((TaskStatus::InProgress, ReportStatus::InProgress)),
        (TaskStatus::InProgress, Complete) => Some((TaskStatus::Completed, ReportStatus::Completed)),
        (TaskStatus::Completed, Approve) => Some((TaskStatus::Approved, ReportStatus::Completed)),
        (TaskStatus::Completed, RequestRevision) => Some((TaskStatus::Revision, ReportStatus::Revision)),
        (TaskStatus::Revision, AcknowledgeRevision) => Some((TaskStatus::InProgress, ReportStatus::InProgress)),
        _ => None,
    }
}

/// Events that may be fired from `from`.
pub fn allowed_events(from: TaskStatus) -> Vec<TaskEvent> {
    use TaskEvent::*;
    [Start, Complete, Approve, RequestRevision, AcknowledgeRevision]
        .into_iter()
        .filter(|e| next_status(from, *e).is_some())
        .collect()
}

pub fn next_task_id(tasks: &[Task]) -> u64 {
    tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1
}

/// Check that `session` may assign `assignment` on `report`, returning the normalised
/// assignees and checklist. Nothing is modified.
pub fn check_assignment(report: &Report, session: &Session, assignment: &Assignment) -> Result<(Vec<String>, Vec<String>)> {
    session.require_role(Role::Koordinator, "assign tasks")?;
    if !report.forwarded_to.iter().any(|n| n == session.name()) {
        return Err(WorkflowError::denied(format!(
            "report {} was not forwarded to {}",
            report.id,
            session.name()
        )));
    }
    if report.status != ReportStatus::Forwarded {
        warn!(report_id = report.id, status = %report.status, "assign rejected");
        return Err(report.invalid("assign a task on"));
    }
    let assignees = normalise_names(&assignment.assignees);
    if assignees.is_empty() {
        return Err(WorkflowError::validation("select at least one staff member"));
    }
    let todo_list = normalise_names(&assignment.todo_list);
    if todo_list.is_empty() {
        return Err(WorkflowError::validation("select at least one checklist item"));
    }
    Ok((assignees, todo_list))
}

/// Create a task on a forwarded report (`forwarded` → `assigned`).
///
/// The koordinator must be one the report was forwarded to. At least one assignee and
/// one checklist item are required.
pub fn assign_task(id: u64, report: &mut Report, session: &Session, assignment: Assignment) -> Result<Task> {
    let (assignees, todo_list) = check_assignment(report, session, &assignment)?;

    let joined = assignees.join(", ");
    let task = Task {
        id,
        report_id: report.id,
        assigned_to: assignees,
        assigned_by: session.user_id(),
        todo_list,
        catatan: assignment.catatan.trim().to_string(),
        catatan_revisi: None,
        status: TaskStatus::Assigned,
        assigned_at: Utc::now(),
        completed_at: None,
        submitted_at: None,
    };
    report.status = ReportStatus::Assigned;
    report.current_assignee = Some(joined.clone());
    append_entry(report, action::TASK_ASSIGNED, session.name(), Some(format!("Assigned to: {joined}")));
    info!(task_id = id, report_id = report.id, to = %joined, by = session.name(), "task assigned");
    Ok(task)
}

/// `assigned` → `in-progress`. Staff on the task only.
pub fn start_task(task: &mut Task, report: &mut Report, session: &Session) -> Result<()> {
    apply(task, report, session, TaskEvent::Start, None)
}

/// `in-progress` → `completed`; stamps completion and submission times.
pub fn complete_task(task: &mut Task, report: &mut Report, session: &Session) -> Result<()> {
    apply(task, report, session, TaskEvent::Complete, None)
}

/// `completed` → `approved`; the report stays `completed`. Assigning koordinator only.
pub fn approve_task(task: &mut Task, report: &mut Report, session: &Session) -> Result<()> {
    apply(task, report, session, TaskEvent::Approve, None)
}

/// `completed` → `revision` with non-blank feedback. Assigning koordinator only.
pub fn request_revision(task: &mut Task, report: &mut Report, session: &Session, notes: &str) -> Result<()> {
    apply(task, report, session, TaskEvent::RequestRevision, Some(notes))
}

/// `revision` → `in-progress`; clears the revision feedback.
pub fn acknowledge_revision(task: &mut Task, report: &mut Report, session: &Session) -> Result<()> {
    apply(task, report, session, TaskEvent::AcknowledgeRevision, None)
}

fn authorize(task: &Task, session: &Session, event: TaskEvent) -> Result<()> {
    session.require_role(event.actor(), event.name())?;
    let allowed = match event.actor() {
        Role::Koordinator => task.assigned_by == session.user_id(),
        _ => task.assigned_to.iter().any(|n| n == session.name()),
    };
    if allowed {
        Ok(())
    } else {
        Err(WorkflowError::denied(format!("{} is not on task {}", session.name(), task.id)))
    }
}

fn apply(task: &mut Task, report: &mut Report, session: &Session, event: TaskEvent, notes: Option<&str>) -> Result<()> {
    if task.report_id != report.id {
        return Err(WorkflowError::validation(format!(
            "task {} belongs to report {}, not {}",
            task.id, task.report_id, report.id
        )));
    }
    authorize(task, session, event)?;
    let Some((task_status, report_status)) = next_status(task.status, event) else {
        warn!(task_id = task.id, status = %task.status, event = event.name(), "transition rejected");
        return Err(WorkflowError::InvalidTransition {
            entity: "task",
            id: task.id,
            from: task.status.to_string(),
            event: event.name(),
        });
    };
    let notes = match notes.map(str::trim) {
        Some("") => return Err(WorkflowError::validation("revision notes must not be empty")),
        other => other,
    };

    let now = Utc::now();
    let (label, details) = match event {
        TaskEvent::Start => (action::TASK_STARTED, "Staff started working on the task".to_string()),
        TaskEvent::Complete => {
            task.completed_at = Some(now);
            task.submitted_at = Some(now);
            (action::TASK_COMPLETED, "Task completed and sent to Koordinator for review".to_string())
        }
        TaskEvent::Approve => (action::TASK_APPROVED, "Task completed and approved".to_string()),
        TaskEvent::RequestRevision => {
            let notes = notes.unwrap_or_default();
            task.catatan_revisi = Some(notes.to_string());
            (action::TASK_REVISION, format!("Revision requested: {notes}"))
        }
        TaskEvent::AcknowledgeRevision => {
            task.catatan_revisi = None;
            (action::REVISION_ADDRESSED, "Staff is addressing the revision comments".to_string())
        }
    };
    task.status = task_status;
    report.status = report_status;
    append_entry(report, label, session.name(), Some(details));
    info!(
        task_id = task.id,
        report_id = report.id,
        task_status = %task_status,
        report_status = %report_status,
        by = session.name(),
        "task transition"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::forward_report;
    use crate::report::tests::{sample_report, tu_session};
    use crate::user::{default_users, User};

    fn koordinator() -> Session {
        Session::new(default_users()[2].clone())
    }

    fn staff() -> Session {
        Session::new(default_users()[3].clone())
    }

    fn forwarded_report() -> Report {
        let mut r = sample_report();
        forward_report(&mut r, &tu_session(), &["Suwati, S.h".into()]).unwrap();
        r
    }

    fn assignment() -> Assignment {
        Assignment {
            assignees: vec!["Roza Erlinda".into()],
            todo_list: vec!["Untuk ditindaklanjuti".into()],
            catatan: "Segera ditindaklanjuti".into(),
        }
    }

    fn assigned() -> (Task, Report) {
        let mut r = forwarded_report();
        let t = assign_task(1, &mut r, &koordinator(), assignment()).unwrap();
        (t, r)
    }

    #[test]
    fn test_transition_table() {
        use TaskEvent::*;
        assert_eq!(allowed_events(TaskStatus::Assigned), vec![Start]);
        assert_eq!(allowed_events(TaskStatus::InProgress), vec![Complete]);
        assert_eq!(allowed_events(TaskStatus::Completed), vec![Approve, RequestRevision]);
        assert_eq!(allowed_events(TaskStatus::Revision), vec![AcknowledgeRevision]);
        assert!(allowed_events(TaskStatus::Approved).is_empty());
    }

    #[test]
    fn test_assign_task() {
        let (t, r) = assigned();
        assert_eq!(t.status, TaskStatus::Assigned);
        assert_eq!(t.report_id, r.id);
        assert_eq!(t.assigned_by, 3);
        assert_eq!(r.status, ReportStatus::Assigned);
        assert_eq!(r.current_assignee.as_deref(), Some("Roza Erlinda"));
        assert_eq!(r.timeline.len(), 3);
        assert_eq!(r.last_entry().unwrap().details.as_deref(), Some("Assigned to: Roza Erlinda"));
    }

    #[test]
    fn test_assign_requires_forwarded_report() {
        let mut r = sample_report();
        r.forwarded_to = vec!["Suwati, S.h".into()];
        let err = assign_task(1, &mut r, &koordinator(), assignment()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(r.status, ReportStatus::Draft);
        assert_eq!(r.timeline.len(), 1);
    }

    #[test]
    fn test_assign_requires_assignees_and_checklist() {
        let mut r = forwarded_report();
        let mut a = assignment();
        a.todo_list.clear();
        assert!(matches!(
            assign_task(1, &mut r, &koordinator(), a),
            Err(WorkflowError::ValidationFailed(_))
        ));
        let mut a = assignment();
        a.assignees = vec!["".into()];
        assert!(matches!(
            assign_task(1, &mut r, &koordinator(), a),
            Err(WorkflowError::ValidationFailed(_))
        ));
        assert_eq!(r.status, ReportStatus::Forwarded);
        assert_eq!(r.timeline.len(), 2);
    }

    #[test]
    fn test_assign_only_by_forwarded_koordinator() {
        let mut r = forwarded_report();
        let other = Session::new(User::new(9, "Yosi Yosandi", "pw", Role::Koordinator));
        assert!(matches!(
            assign_task(1, &mut r, &other, assignment()),
            Err(WorkflowError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_full_cycle_with_revision() {
        let (mut t, mut r) = assigned();
        start_task(&mut t, &mut r, &staff()).unwrap();
        assert_eq!((t.status, r.status), (TaskStatus::InProgress, ReportStatus::InProgress));

        complete_task(&mut t, &mut r, &staff()).unwrap();
        assert_eq!((t.status, r.status), (TaskStatus::Completed, ReportStatus::Completed));
        assert!(t.completed_at.is_some());
        assert_eq!(t.completed_at, t.submitted_at);

        request_revision(&mut t, &mut r, &koordinator(), "  fix X ").unwrap();
        assert_eq!((t.status, r.status), (TaskStatus::Revision, ReportStatus::Revision));
        assert_eq!(t.catatan_revisi.as_deref(), Some("fix X"));
        assert_eq!(r.last_entry().unwrap().details.as_deref(), Some("Revision requested: fix X"));

        acknowledge_revision(&mut t, &mut r, &staff()).unwrap();
        assert_eq!((t.status, r.status), (TaskStatus::InProgress, ReportStatus::InProgress));
        assert!(t.catatan_revisi.is_none());

        complete_task(&mut t, &mut r, &staff()).unwrap();
        approve_task(&mut t, &mut r, &koordinator()).unwrap();
        assert_eq!((t.status, r.status), (TaskStatus::Approved, ReportStatus::Completed));

        let actions: Vec<&str> = r.timeline.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(
            actions,
            vec![
                "Report Created",
                "Forwarded to Koordinator",
                "Task Assigned",
                "Task Started",
                "Task Completed",
                "Task Needs Revision",
                "Revision Addressed",
                "Task Completed",
                "Task Approved",
            ]
        );
    }

    #[test]
    fn test_replay_is_rejected_without_new_entry() {
        let (mut t, mut r) = assigned();
        start_task(&mut t, &mut r, &staff()).unwrap();
        let len = r.timeline.len();
        let err = start_task(&mut t, &mut r, &staff()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { entity: "task", .. }));
        assert_eq!(r.timeline.len(), len);
    }

    #[test]
    fn test_approve_and_revise_need_completed_task() {
        let (mut t, mut r) = assigned();
        assert!(matches!(
            approve_task(&mut t, &mut r, &koordinator()),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        assert!(matches!(
            request_revision(&mut t, &mut r, &koordinator(), "x"),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        assert_eq!(t.status, TaskStatus::Assigned);
    }

    #[test]
    fn test_revision_needs_notes() {
        let (mut t, mut r) = assigned();
        start_task(&mut t, &mut r, &staff()).unwrap();
        complete_task(&mut t, &mut r, &staff()).unwrap();
        let len = r.timeline.len();
        let err = request_revision(&mut t, &mut r, &koordinator(), "   ").unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));
        assert_eq!(t.status, TaskStatus::Completed);
        assert_eq!(r.timeline.len(), len);
    }

    #[test]
    fn test_only_assigned_staff_may_act() {
        let (mut t, mut r) = assigned();
        let outsider = Session::new(User::new(8, "Citra Dewi", "pw", Role::Staff));
        assert!(matches!(
            start_task(&mut t, &mut r, &outsider),
            Err(WorkflowError::PermissionDenied(_))
        ));
        assert!(matches!(
            start_task(&mut t, &mut r, &koordinator()),
            Err(WorkflowError::PermissionDenied(_))
        ));
        assert_eq!(t.status, TaskStatus::Assigned);
    }

    #[test]
    fn test_approved_is_terminal() {
        let (mut t, mut r) = assigned();
        start_task(&mut t, &mut r, &staff()).unwrap();
        complete_task(&mut t, &mut r, &staff()).unwrap();
        approve_task(&mut t, &mut r, &koordinator()).unwrap();
        assert!(approve_task(&mut t, &mut r, &koordinator()).is_err());
        assert!(request_revision(&mut t, &mut r, &koordinator(), "late").is_err());
        assert!(start_task(&mut t, &mut r, &staff()).is_err());
    }

    #[test]
    fn test_task_report_mismatch() {
        let (mut t, _) = assigned();
        let mut other = forwarded_report();
        other.id = 2;
        assert!(matches!(
            start_task(&mut t, &mut other, &staff()),
            Err(WorkflowError::ValidationFailed(_))
        ));
    }
}
