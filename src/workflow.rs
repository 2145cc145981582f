//! Store-backed workflow service.
//!
//! [`Workflow`] wraps a [`Store`] and runs each operation as one read-modify-write:
//! load the affected collections, apply the transition to the in-memory copies, and
//! write the collections back only if the transition succeeded.

use std::collections::BTreeMap;

use tracing::{debug, error, info, warn};

use crate::error::{Result, WorkflowError};
use crate::fields::{ReportStatus, Role, TaskStatus};
use crate::report::{self, find_report_mut, next_report_id, Report, ReportFields};
use crate::session::{authenticate, Session};
use crate::store::{bootstrap, Store};
use crate::task::{self, next_task_id, Assignment, Task, TaskEvent};
use crate::tracker;
use crate::user::{self, User, UserUpdate};

pub struct Workflow<S: Store> {
    store: S,
}

impl<S: Store> Workflow<S> {
    pub fn new(store: S) -> Self {
        Workflow { store }
    }

    /// Wrap `store`, running first-run bootstrap if it has never been written.
    pub fn open(mut store: S, seed_defaults: bool) -> Result<Self> {
        bootstrap(&mut store, seed_defaults)?;
        Ok(Workflow { store })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    // ── Identity & session ────────────────────────────────────────────────

    /// Check credentials and persist the user as the current session.
    ///
    /// A failed login leaves any existing session pointer untouched.
    pub fn login(&mut self, name: &str, password: &str) -> Result<Session> {
        let users = self.store.load_users()?;
        let user = authenticate(&users, name, password)?;
        self.store.save_session(&user)?;
        info!(user_id = user.id, role = %user.role, "logged in");
        Ok(Session::new(user))
    }

    pub fn logout(&mut self) -> Result<()> {
        self.store.clear_session()
    }

    /// Session for the persisted current user, re-read from the user collection so
    /// role or name changes by an admin take effect. A pointer to a deleted user
    /// resolves to no session.
    pub fn current_session(&self) -> Result<Option<Session>> {
        let Some(saved) = self.store.load_session()? else {
            return Ok(None);
        };
        let users = self.store.load_users()?;
        match users.into_iter().find(|u| u.id == saved.id) {
            Some(u) => Ok(Some(Session::new(u))),
            None => {
                warn!(user_id = saved.id, "session refers to a deleted user");
                Ok(None)
            }
        }
    }

    pub fn require_session(&self) -> Result<Session> {
        self.current_session()?.ok_or(WorkflowError::NotLoggedIn)
    }

    // ── User administration ───────────────────────────────────────────────

    pub fn users(&self) -> Result<Vec<User>> {
        self.store.load_users()
    }

    pub fn create_user(&mut self, session: &Session, name: &str, password: &str, role: Role) -> Result<User> {
        let mut users = self.store.load_users()?;
        let created = user::create_user(&mut users, session, name, password, role)?;
        self.store.save_users(&users)?;
        Ok(created)
    }

    pub fn update_user(&mut self, session: &Session, id: u64, update: UserUpdate) -> Result<User> {
        let mut users = self.store.load_users()?;
        let updated = user::update_user(&mut users, session, id, update)?;
        self.store.save_users(&users)?;
        Ok(updated)
    }

    pub fn delete_user(&mut self, session: &Session, id: u64) -> Result<User> {
        let mut users = self.store.load_users()?;
        let removed = user::delete_user(&mut users, session, id)?;
        self.store.save_users(&users)?;
        Ok(removed)
    }

    pub fn role_counts(&self) -> Result<BTreeMap<Role, usize>> {
        Ok(user::role_counts(&self.store.load_users()?))
    }

    // ── Report lifecycle ──────────────────────────────────────────────────

    /// File a new report after checking every reference field is present.
    pub fn create_report(&mut self, session: &Session, fields: ReportFields) -> Result<Report> {
        fields.validate()?;
        let mut reports = self.store.load_reports()?;
        let created = report::create_report(next_report_id(&reports), fields, session)?;
        reports.push(created.clone());
        self.store.save_reports(&reports)?;
        Ok(created)
    }

    /// Forward a draft report to koordinators, who must exist as Koordinator users.
    ///
    /// Role and status are checked before the target names.
    pub fn forward_report(&mut self, session: &Session, report_id: u64, targets: &[String]) -> Result<Report> {
        let mut reports = self.store.load_reports()?;
        let r = find_report_mut(&mut reports, report_id)?;
        let targets = report::check_forward(r, session, targets)?;
        let users = self.store.load_users()?;
        check_roster(&users, Role::Koordinator, &targets, "not koordinators")?;

        report::forward_report(r, session, &targets)?;
        let updated = r.clone();
        self.store.save_reports(&reports)?;
        Ok(updated)
    }

    pub fn report(&self, id: u64) -> Result<Report> {
        self.store
            .load_reports()?
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| WorkflowError::not_found("report", id))
    }

    pub fn reports(&self) -> Result<Vec<Report>> {
        self.store.load_reports()
    }

    // ── Task lifecycle ────────────────────────────────────────────────────

    /// Delegate work on a forwarded report to staff, who must exist as Staff users.
    ///
    /// Role and status are checked before the assignee names.
    pub fn assign_task(&mut self, session: &Session, report_id: u64, assignment: Assignment) -> Result<Task> {
        let mut reports = self.store.load_reports()?;
        let r = find_report_mut(&mut reports, report_id)?;
        let (assignees, _) = task::check_assignment(r, session, &assignment)?;
        let users = self.store.load_users()?;
        check_roster(&users, Role::Staff, &assignees, "not staff")?;

        let mut tasks = self.store.load_tasks()?;
        let previous = tasks.clone();
        let created = task::assign_task(next_task_id(&tasks), r, session, assignment)?;
        tasks.push(created.clone());
        self.commit(&previous, &tasks, &reports)?;
        Ok(created)
    }

    pub fn start_task(&mut self, session: &Session, task_id: u64) -> Result<Task> {
        self.fire(session, task_id, TaskEvent::Start, None)
    }

    pub fn complete_task(&mut self, session: &Session, task_id: u64) -> Result<Task> {
        self.fire(session, task_id, TaskEvent::Complete, None)
    }

    pub fn approve_task(&mut self, session: &Session, task_id: u64) -> Result<Task> {
        self.fire(session, task_id, TaskEvent::Approve, None)
    }

    pub fn request_revision(&mut self, session: &Session, task_id: u64, notes: &str) -> Result<Task> {
        self.fire(session, task_id, TaskEvent::RequestRevision, Some(notes))
    }

    pub fn acknowledge_revision(&mut self, session: &Session, task_id: u64) -> Result<Task> {
        self.fire(session, task_id, TaskEvent::AcknowledgeRevision, None)
    }

    fn fire(&mut self, session: &Session, task_id: u64, event: TaskEvent, notes: Option<&str>) -> Result<Task> {
        let mut tasks = self.store.load_tasks()?;
        let previous = tasks.clone();
        let mut reports = self.store.load_reports()?;
        let t = tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| WorkflowError::not_found("task", task_id))?;
        let r = find_report_mut(&mut reports, t.report_id)?;
        match event {
            TaskEvent::Start => task::start_task(t, r, session)?,
            TaskEvent::Complete => task::complete_task(t, r, session)?,
            TaskEvent::Approve => task::approve_task(t, r, session)?,
            TaskEvent::RequestRevision => task::request_revision(t, r, session, notes.unwrap_or_default())?,
            TaskEvent::AcknowledgeRevision => task::acknowledge_revision(t, r, session)?,
        }
        let updated = t.clone();
        self.commit(&previous, &tasks, &reports)?;
        Ok(updated)
    }

    /// Write tasks, then reports. If the report write fails the previous task
    /// collection is written back so the two stay in lockstep.
    fn commit(&mut self, previous_tasks: &[Task], tasks: &[Task], reports: &[Report]) -> Result<()> {
        self.store.save_tasks(tasks)?;
        if let Err(e) = self.store.save_reports(reports) {
            warn!(error = %e, "report write failed, restoring tasks");
            if let Err(restore) = self.store.save_tasks(previous_tasks) {
                error!(error = %restore, "could not restore tasks");
            }
            return Err(e);
        }
        Ok(())
    }

    pub fn task(&self, id: u64) -> Result<Task> {
        self.store
            .load_tasks()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| WorkflowError::not_found("task", id))
    }

    pub fn tasks(&self) -> Result<Vec<Task>> {
        self.store.load_tasks()
    }

    /// All tasks ever created against a report, oldest first.
    pub fn tasks_for_report(&self, report_id: u64) -> Result<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .store
            .load_tasks()?
            .into_iter()
            .filter(|t| t.report_id == report_id)
            .collect();
        tasks.sort_by_key(|t| (t.assigned_at, t.id));
        Ok(tasks)
    }

    /// The most recently assigned task on a report that is not yet approved.
    pub fn active_task(&self, report_id: u64) -> Result<Option<Task>> {
        Ok(self
            .tasks_for_report(report_id)?
            .into_iter()
            .rev()
            .find(|t| t.status != TaskStatus::Approved))
    }

    // ── Role inboxes ──────────────────────────────────────────────────────

    /// Reports relevant to the session's role.
    ///
    /// TU sees what it filed plus any draft; a koordinator sees what was forwarded to
    /// them; admins see everything; staff work from tasks rather than reports.
    pub fn reports_for(&self, session: &Session) -> Result<Vec<Report>> {
        let reports = self.store.load_reports()?;
        let selected: Vec<Report> = match session.role() {
            Role::Admin => reports,
            Role::Tu => reports
                .into_iter()
                .filter(|r| r.created_by == session.user_id() || r.status == ReportStatus::Draft)
                .collect(),
            Role::Koordinator => reports
                .into_iter()
                .filter(|r| r.forwarded_to.iter().any(|n| n == session.name()))
                .collect(),
            Role::Staff => {
                let mine: Vec<u64> = self.tasks_for(session)?.iter().map(|t| t.report_id).collect();
                reports.into_iter().filter(|r| mine.contains(&r.id)).collect()
            }
        };
        debug!(role = %session.role(), count = selected.len(), "reports inbox");
        Ok(selected)
    }

    /// Forwarded reports still waiting for a koordinator to assign them.
    pub fn pending_reports(&self, session: &Session) -> Result<Vec<Report>> {
        Ok(self
            .reports_for(session)?
            .into_iter()
            .filter(|r| r.status == ReportStatus::Forwarded)
            .collect())
    }

    /// Tasks relevant to the session's role: assigned by a koordinator, or to a staff member.
    pub fn tasks_for(&self, session: &Session) -> Result<Vec<Task>> {
        let tasks = self.store.load_tasks()?;
        Ok(match session.role() {
            Role::Koordinator => tasks.into_iter().filter(|t| t.assigned_by == session.user_id()).collect(),
            Role::Staff => tasks
                .into_iter()
                .filter(|t| t.assigned_to.iter().any(|n| n == session.name()))
                .collect(),
            Role::Admin => tasks,
            Role::Tu => Vec::new(),
        })
    }

    // ── Public tracker ────────────────────────────────────────────────────

    pub fn track(&self, query: &str) -> Result<Report> {
        let reports = self.store.load_reports()?;
        tracker::find_report(&reports, query).cloned()
    }

    pub fn track_all(&self, query: &str) -> Result<Vec<Report>> {
        let reports = self.store.load_reports()?;
        Ok(tracker::find_reports(&reports, query)?.into_iter().cloned().collect())
    }
}

/// Every name must belong to a user with `role`.
fn check_roster(users: &[User], role: Role, names: &[String], label: &str) -> Result<()> {
    let known = user::names_with_role(users, role);
    let unknown: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| !known.contains(n))
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(WorkflowError::validation(format!("{label}: {}", unknown.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_fields;
    use crate::store::MemoryStore;

    fn workflow() -> Workflow<MemoryStore> {
        Workflow::open(MemoryStore::new(), true).unwrap()
    }

    fn login<S: Store>(wf: &mut Workflow<S>, name: &str, pw: &str) -> Session {
        wf.login(name, pw).unwrap()
    }

    fn staff_assignment(staff: &str) -> Assignment {
        Assignment {
            assignees: vec![staff.into()],
            todo_list: vec!["Untuk diketahui".into()],
            catatan: String::new(),
        }
    }

    /// Memory store whose report writes can be switched to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reports: bool,
    }

    impl Store for FlakyStore {
        fn load_users(&self) -> Result<Vec<User>> {
            self.inner.load_users()
        }
        fn save_users(&mut self, users: &[User]) -> Result<()> {
            self.inner.save_users(users)
        }
        fn load_reports(&self) -> Result<Vec<Report>> {
            self.inner.load_reports()
        }
        fn save_reports(&mut self, reports: &[Report]) -> Result<()> {
            if self.fail_reports {
                let source = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
                return Err(WorkflowError::Storage { path: "reports.json".into(), source });
            }
            self.inner.save_reports(reports)
        }
        fn load_tasks(&self) -> Result<Vec<Task>> {
            self.inner.load_tasks()
        }
        fn save_tasks(&mut self, tasks: &[Task]) -> Result<()> {
            self.inner.save_tasks(tasks)
        }
        fn load_session(&self) -> Result<Option<User>> {
            self.inner.load_session()
        }
        fn save_session(&mut self, user: &User) -> Result<()> {
            self.inner.save_session(user)
        }
        fn clear_session(&mut self) -> Result<()> {
            self.inner.clear_session()
        }
        fn is_initialised(&self) -> Result<bool> {
            self.inner.is_initialised()
        }
    }

    #[test]
    fn test_login_persists_session() {
        let mut wf = workflow();
        assert!(wf.current_session().unwrap().is_none());
        let s = login(&mut wf, "TU User", "tu123");
        assert_eq!(wf.current_session().unwrap(), Some(s));
        wf.logout().unwrap();
        assert!(matches!(wf.require_session(), Err(WorkflowError::NotLoggedIn)));
    }

    #[test]
    fn test_failed_login_keeps_previous_session() {
        let mut wf = workflow();
        let s = login(&mut wf, "Admin", "admin123");
        assert!(matches!(wf.login("Admin", "nope"), Err(WorkflowError::InvalidCredentials)));
        assert_eq!(wf.current_session().unwrap(), Some(s));
    }

    #[test]
    fn test_session_follows_user_changes() {
        let mut wf = workflow();
        let admin = login(&mut wf, "Admin", "admin123");
        login(&mut wf, "Roza Erlinda", "staff123");
        let update = UserUpdate { role: Some(Role::Koordinator), ..Default::default() };
        wf.update_user(&admin, 4, update).unwrap();
        assert_eq!(wf.require_session().unwrap().role(), Role::Koordinator);
        wf.delete_user(&admin, 4).unwrap();
        assert!(wf.current_session().unwrap().is_none());
    }

    #[test]
    fn test_create_report_validates_fields() {
        let mut wf = workflow();
        let tu = login(&mut wf, "TU User", "tu123");
        let mut fields = sample_fields("001/TU/2024");
        fields.dari.clear();
        assert!(matches!(wf.create_report(&tu, fields), Err(WorkflowError::ValidationFailed(_))));
        assert!(wf.reports().unwrap().is_empty());
    }

    #[test]
    fn test_forward_only_to_known_koordinators() {
        let mut wf = workflow();
        let tu = login(&mut wf, "TU User", "tu123");
        let r = wf.create_report(&tu, sample_fields("001/TU/2024")).unwrap();
        let err = wf.forward_report(&tu, r.id, &["Roza Erlinda".into()]).unwrap_err();
        assert!(matches!(err, WorkflowError::ValidationFailed(_)));
        assert_eq!(wf.report(r.id).unwrap().status, ReportStatus::Draft);
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let mut wf = workflow();
        let staff = login(&mut wf, "Roza Erlinda", "staff123");
        assert!(matches!(wf.start_task(&staff, 42), Err(WorkflowError::NotFound { .. })));
        assert!(matches!(wf.report(42), Err(WorkflowError::NotFound { .. })));
    }

    #[test]
    fn test_inboxes() {
        let mut wf = workflow();
        let tu = login(&mut wf, "TU User", "tu123");
        let r1 = wf.create_report(&tu, sample_fields("001/TU/2024")).unwrap();
        let r2 = wf.create_report(&tu, sample_fields("002/TU/2024")).unwrap();
        wf.forward_report(&tu, r1.id, &["Suwati, S.h".into()]).unwrap();

        let k = login(&mut wf, "Suwati, S.h", "koordinator123");
        let pending: Vec<u64> = wf.pending_reports(&k).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(pending, vec![r1.id]);

        let assignment = Assignment {
            assignees: vec!["Roza Erlinda".into()],
            todo_list: vec!["Untuk diketahui".into()],
            catatan: String::new(),
        };
        let t = wf.assign_task(&k, r1.id, assignment).unwrap();
        assert!(wf.pending_reports(&k).unwrap().is_empty());
        assert_eq!(wf.tasks_for(&k).unwrap().len(), 1);

        let staff = login(&mut wf, "Roza Erlinda", "staff123");
        assert_eq!(wf.tasks_for(&staff).unwrap()[0].id, t.id);
        let seen: Vec<u64> = wf.reports_for(&staff).unwrap().iter().map(|r| r.id).collect();
        assert_eq!(seen, vec![r1.id]);
        assert_eq!(wf.reports_for(&tu).unwrap().len(), 2);
        assert_eq!(wf.active_task(r1.id).unwrap().map(|t| t.id), Some(t.id));
        assert!(wf.active_task(r2.id).unwrap().is_none());
    }

    #[test]
    fn test_rejected_transition_writes_nothing() {
        let mut wf = workflow();
        let tu = login(&mut wf, "TU User", "tu123");
        let r = wf.create_report(&tu, sample_fields("001/TU/2024")).unwrap();
        wf.forward_report(&tu, r.id, &["Suwati, S.h".into()]).unwrap();
        let k = login(&mut wf, "Suwati, S.h", "koordinator123");
        let assignment = Assignment {
            assignees: vec!["Roza Erlinda".into()],
            todo_list: vec!["Untuk diketahui".into()],
            catatan: String::new(),
        };
        let t = wf.assign_task(&k, r.id, assignment).unwrap();
        let before = wf.store().raw(crate::store::REPORTS).map(str::to_string);
        assert!(wf.approve_task(&k, t.id).is_err());
        assert_eq!(wf.store().raw(crate::store::REPORTS).map(str::to_string), before);
        assert_eq!(wf.task(t.id).unwrap().status, TaskStatus::Assigned);
    }

    #[test]
    fn test_forward_checks_role_and_state_before_targets() {
        let mut wf = workflow();
        let admin = login(&mut wf, "Admin", "admin123");
        let staff = login(&mut wf, "Roza Erlinda", "staff123");
        let tu = login(&mut wf, "TU User", "tu123");
        let r = wf.create_report(&tu, sample_fields("001/TU/2024")).unwrap();
        let nobody = vec!["Nobody".to_string()];

        assert!(matches!(wf.forward_report(&staff, r.id, &nobody), Err(WorkflowError::PermissionDenied(_))));
        assert!(matches!(wf.forward_report(&tu, 999, &nobody), Err(WorkflowError::NotFound { .. })));

        wf.forward_report(&tu, r.id, &["Suwati, S.h".into()]).unwrap();
        let rename = UserUpdate { name: Some("Suwati".into()), ..Default::default() };
        wf.update_user(&admin, 3, rename).unwrap();
        let err = wf.forward_report(&tu, r.id, &["Suwati, S.h".into()]).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(wf.report(r.id).unwrap().timeline.len(), 2);
    }

    #[test]
    fn test_assign_checks_role_and_state_before_assignees() {
        let mut wf = workflow();
        let k = login(&mut wf, "Suwati, S.h", "koordinator123");
        let tu = login(&mut wf, "TU User", "tu123");
        let r = wf.create_report(&tu, sample_fields("001/TU/2024")).unwrap();
        wf.forward_report(&tu, r.id, &["Suwati, S.h".into()]).unwrap();

        assert!(matches!(
            wf.assign_task(&tu, r.id, staff_assignment("Nobody")),
            Err(WorkflowError::PermissionDenied(_))
        ));
        assert!(matches!(
            wf.assign_task(&k, 999, staff_assignment("Nobody")),
            Err(WorkflowError::NotFound { .. })
        ));
        assert!(matches!(
            wf.assign_task(&k, r.id, staff_assignment("Nobody")),
            Err(WorkflowError::ValidationFailed(_))
        ));

        wf.assign_task(&k, r.id, staff_assignment("Roza Erlinda")).unwrap();
        assert!(matches!(
            wf.assign_task(&k, r.id, staff_assignment("Nobody")),
            Err(WorkflowError::InvalidTransition { .. })
        ));
        assert_eq!(wf.tasks().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_report_write_restores_tasks() {
        let mut wf = Workflow::open(FlakyStore::default(), true).unwrap();
        let k = login(&mut wf, "Suwati, S.h", "koordinator123");
        let staff = login(&mut wf, "Roza Erlinda", "staff123");
        let tu = login(&mut wf, "TU User", "tu123");
        let r1 = wf.create_report(&tu, sample_fields("001/TU/2024")).unwrap();
        let r2 = wf.create_report(&tu, sample_fields("002/TU/2024")).unwrap();
        wf.forward_report(&tu, r1.id, &["Suwati, S.h".into()]).unwrap();
        wf.forward_report(&tu, r2.id, &["Suwati, S.h".into()]).unwrap();
        let t = wf.assign_task(&k, r1.id, staff_assignment("Roza Erlinda")).unwrap();

        let mut store = wf.into_store();
        store.fail_reports = true;
        let mut wf = Workflow::new(store);

        let err = wf.start_task(&staff, t.id).unwrap_err();
        assert!(matches!(err, WorkflowError::Storage { .. }));
        assert_eq!(wf.task(t.id).unwrap().status, TaskStatus::Assigned);
        let r = wf.report(r1.id).unwrap();
        assert_eq!(r.status, ReportStatus::Assigned);
        assert_eq!(r.timeline.len(), 3);

        assert!(wf.assign_task(&k, r2.id, staff_assignment("Roza Erlinda")).is_err());
        assert_eq!(wf.tasks().unwrap().len(), 1);
        assert_eq!(wf.report(r2.id).unwrap().status, ReportStatus::Forwarded);
    }
}
