//! Command implementations for the CLI interface.
//!
//! Each handler resolves the session it needs, calls into [`Workflow`], and prints a
//! plain-text result. Errors bubble up to `main` with context attached.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::fields::*;
use crate::report::{Report, ReportFields};
use crate::store::{JsonStore, Store};
use crate::task::{allowed_events, Assignment, Task};
use crate::user::{User, UserUpdate};
use crate::workflow::Workflow;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and remember the session.
    Login {
        /// Display name, exactly as registered.
        name: String,
        #[arg(long)]
        password: String,
    },

    /// Forget the current session.
    Logout,

    /// Show the logged-in user.
    Whoami,

    /// Manage user accounts (Admin).
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// File, route and inspect reports.
    Report {
        #[command(subcommand)]
        action: ReportAction,
    },

    /// Assign, work on and review tasks.
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Look up a report's status by letter or agenda number. No login needed.
    Track {
        /// Letter (noSurat) or agenda (noAgenda) number, or part of one.
        query: String,
        /// Show every match instead of the first.
        #[arg(long)]
        all: bool,
    },

    /// Print the default rosters, checklist items and classification labels.
    Options,

    /// Copy all collections into a timestamped backup directory.
    Backup,

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum UserAction {
    /// Create an account.
    Add {
        name: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum)]
        role: Role,
    },
    /// List accounts.
    List,
    /// Change an account's name, password or role.
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        password: Option<String>,
        #[arg(long, value_enum)]
        role: Option<Role>,
    },
    /// Delete an account.
    Delete { id: u64 },
    /// Count accounts per role.
    Stats,
}

#[derive(Subcommand)]
pub enum ReportAction {
    /// File a new report in draft (TU).
    Create {
        #[arg(long)]
        no_surat: String,
        /// Subject.
        #[arg(long)]
        hal: String,
        /// Sender.
        #[arg(long)]
        dari: String,
        #[arg(long)]
        tanggal_surat: String,
        #[arg(long)]
        tanggal_agenda: String,
        #[arg(long)]
        no_agenda: String,
        #[arg(long)]
        kelompok_asal_surat: String,
        #[arg(long)]
        agenda_sestama: String,
        /// Confidentiality label. May be repeated.
        #[arg(long)]
        sifat: Vec<String>,
        /// Urgency label. May be repeated.
        #[arg(long)]
        derajat: Vec<String>,
    },
    /// Forward a draft report to koordinators (TU).
    Forward {
        id: u64,
        /// Koordinator name. Repeat for several.
        #[arg(long = "to", required = true)]
        to: Vec<String>,
    },
    /// List reports visible to the current user.
    List {
        #[arg(long, value_enum)]
        status: Option<ReportStatus>,
        /// Koordinator: only forwarded reports awaiting assignment.
        #[arg(long)]
        pending: bool,
    },
    /// Show a report with its timeline and tasks.
    Show { id: u64 },
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Assign work on a forwarded report (Koordinator).
    Assign {
        report_id: u64,
        /// Staff name. Repeat for several.
        #[arg(long = "to", required = true)]
        to: Vec<String>,
        /// Checklist item. Repeat for several.
        #[arg(long = "todo", required = true)]
        todo: Vec<String>,
        /// Instructions for the staff.
        #[arg(long, default_value = "")]
        catatan: String,
    },
    /// Start an assigned task (Staff).
    Start { id: u64 },
    /// Submit a task for review (Staff).
    Complete { id: u64 },
    /// Approve a submitted task (Koordinator).
    Approve { id: u64 },
    /// Send a submitted task back for revision (Koordinator).
    Revise {
        id: u64,
        #[arg(long)]
        notes: String,
    },
    /// Resume work on a task returned for revision (Staff).
    Ack { id: u64 },
    /// List tasks visible to the current user.
    List {
        #[arg(long, value_enum)]
        status: Option<TaskStatus>,
    },
    /// Show a single task.
    Show { id: u64 },
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

pub fn cmd_login<S: Store>(wf: &mut Workflow<S>, name: &str, password: &str) -> Result<()> {
    let session = wf.login(name, password)?;
    println!("Logged in as {} ({})", session.name(), session.role());
    Ok(())
}

pub fn cmd_logout<S: Store>(wf: &mut Workflow<S>) -> Result<()> {
    wf.logout().context("failed to clear session")?;
    println!("Logged out.");
    Ok(())
}

pub fn cmd_whoami<S: Store>(wf: &Workflow<S>) -> Result<()> {
    match wf.current_session()? {
        Some(s) => println!("{} (#{}, {})", s.name(), s.user_id(), s.role()),
        None => println!("Not logged in."),
    }
    Ok(())
}

pub fn cmd_user<S: Store>(wf: &mut Workflow<S>, action: UserAction) -> Result<()> {
    let session = wf.require_session()?;
    session.require_role(Role::Admin, "manage users")?;
    match action {
        UserAction::Add { name, password, role } => {
            let u = wf.create_user(&session, &name, &password, role)?;
            println!("Added user {} ({}, {})", u.id, u.name, u.role);
        }
        UserAction::List => print_users(&wf.users()?),
        UserAction::Update { id, name, password, role } => {
            let u = wf.update_user(&session, id, UserUpdate { name, password, role })?;
            println!("Updated user {} ({}, {})", u.id, u.name, u.role);
        }
        UserAction::Delete { id } => {
            let u = wf.delete_user(&session, id)?;
            println!("Deleted user {} ({})", u.id, u.name);
        }
        UserAction::Stats => {
            for (role, count) in wf.role_counts()? {
                println!("{:<12} {}", role.label(), count);
            }
        }
    }
    Ok(())
}

pub fn cmd_report<S: Store>(wf: &mut Workflow<S>, action: ReportAction) -> Result<()> {
    let session = wf.require_session()?;
    match action {
        ReportAction::Create {
            no_surat, hal, dari, tanggal_surat, tanggal_agenda, no_agenda,
            kelompok_asal_surat, agenda_sestama, sifat, derajat,
        } => {
            let fields = ReportFields {
                no_surat, hal, dari, tanggal_surat, tanggal_agenda, no_agenda,
                kelompok_asal_surat, agenda_sestama,
                sifat: normalise_names(&sifat),
                derajat: normalise_names(&derajat),
            };
            let r = wf.create_report(&session, fields)?;
            println!("Added report {} ({})", r.id, r.fields.no_surat);
        }
        ReportAction::Forward { id, to } => {
            let r = wf.forward_report(&session, id, &to)?;
            println!("Forwarded report {} to {}", r.id, r.forwarded_to.join("; "));
        }
        ReportAction::List { status, pending } => {
            let reports = if pending { wf.pending_reports(&session)? } else { wf.reports_for(&session)? };
            let filtered: Vec<&Report> = reports
                .iter()
                .filter(|r| status.map_or(true, |s| r.status == s))
                .collect();
            if filtered.is_empty() {
                println!("No reports.");
            } else {
                print_reports(&filtered);
            }
        }
        ReportAction::Show { id } => {
            let r = wf.report(id)?;
            print_report(&r);
            let tasks = wf.tasks_for_report(id)?;
            if !tasks.is_empty() {
                println!("Tasks:");
                for t in &tasks {
                    println!("  #{} [{}] {}", t.id, t.status, t.assigned_to.join("; "));
                }
            }
        }
    }
    Ok(())
}

pub fn cmd_task<S: Store>(wf: &mut Workflow<S>, action: TaskAction) -> Result<()> {
    let session = wf.require_session()?;
    let (verb, task) = match action {
        TaskAction::Assign { report_id, to, todo, catatan } => {
            let assignment = Assignment { assignees: to, todo_list: todo, catatan };
            ("Assigned", wf.assign_task(&session, report_id, assignment)?)
        }
        TaskAction::Start { id } => ("Started", wf.start_task(&session, id)?),
        TaskAction::Complete { id } => ("Submitted", wf.complete_task(&session, id)?),
        TaskAction::Approve { id } => ("Approved", wf.approve_task(&session, id)?),
        TaskAction::Revise { id, notes } => ("Returned for revision", wf.request_revision(&session, id, &notes)?),
        TaskAction::Ack { id } => ("Resumed", wf.acknowledge_revision(&session, id)?),
        TaskAction::List { status } => {
            let tasks = wf.tasks_for(&session)?;
            let filtered: Vec<&Task> = tasks.iter().filter(|t| status.map_or(true, |s| t.status == s)).collect();
            if filtered.is_empty() {
                println!("No tasks.");
            } else {
                print_tasks(&filtered);
            }
            return Ok(());
        }
        TaskAction::Show { id } => {
            print_task(&wf.task(id)?);
            return Ok(());
        }
    };
    println!("{verb} task {} (report {}, now {})", task.id, task.report_id, task.status);
    Ok(())
}

pub fn cmd_track<S: Store>(wf: &Workflow<S>, query: &str, all: bool) -> Result<()> {
    if all {
        let found = wf.track_all(query)?;
        if found.is_empty() {
            println!("No report matches '{}'.", query.trim());
        } else {
            print_reports(&found.iter().collect::<Vec<_>>());
        }
    } else {
        print_report(&wf.track(query)?);
    }
    Ok(())
}

pub fn cmd_options() {
    println!("Koordinator: {}", KOORDINATOR_LIST.join(" | "));
    println!("Staff:       {}", STAFF_LIST.join(" | "));
    println!("Checklist:   {}", TODO_LIST_ITEMS.join(" | "));
    println!("Sifat:       {}", SIFAT_OPTIONS.join(" | "));
    println!("Derajat:     {}", DERAJAT_OPTIONS.join(" | "));
}

pub fn cmd_backup(store: &JsonStore) -> Result<()> {
    let path = store.backup().context("backup failed")?;
    println!("Backup created: {}", path.display());
    Ok(())
}

fn local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn print_users(users: &[User]) {
    println!("{:<5} {:<12} {}", "ID", "Role", "Name");
    for u in users {
        println!("{:<5} {:<12} {}", u.id, u.role.label(), u.name);
    }
}

fn print_reports(reports: &[&Report]) {
    println!("{:<5} {:<12} {:<18} {:<12} {:<17} {}", "ID", "Status", "No. Surat", "No. Agenda", "Created", "Hal");
    for r in reports {
        println!(
            "{:<5} {:<12} {:<18} {:<12} {:<17} {}",
            r.id,
            r.status.as_str(),
            truncate(&r.fields.no_surat, 18),
            truncate(&r.fields.no_agenda, 12),
            local(r.created_at),
            r.fields.hal
        );
    }
}

fn print_report(r: &Report) {
    let dash = |v: &[String]| if v.is_empty() { "-".to_string() } else { v.join(", ") };
    println!("ID:           {}", r.id);
    println!("No. Surat:    {}", r.fields.no_surat);
    println!("No. Agenda:   {}", r.fields.no_agenda);
    println!("Hal:          {}", r.fields.hal);
    println!("Dari:         {}", r.fields.dari);
    println!("Tgl. Surat:   {}", r.fields.tanggal_surat);
    println!("Tgl. Agenda:  {}", r.fields.tanggal_agenda);
    println!("Asal Surat:   {}", r.fields.kelompok_asal_surat);
    println!("Sestama:      {}", r.fields.agenda_sestama);
    println!("Sifat:        {}", dash(&r.fields.sifat));
    println!("Derajat:      {}", dash(&r.fields.derajat));
    println!("Status:       {}", r.status.label());
    println!("Forwarded to: {}", if r.forwarded_to.is_empty() { "-".to_string() } else { r.forwarded_to.join("; ") });
    println!("Assignee:     {}", r.current_assignee.as_deref().unwrap_or("-"));
    println!("Created:      {}", local(r.created_at));
    println!("Timeline:");
    for e in &r.timeline {
        match &e.details {
            Some(d) => println!("  {}  {:<26} {:<16} {}", local(e.timestamp), e.action, e.user, d),
            None => println!("  {}  {:<26} {}", local(e.timestamp), e.action, e.user),
        }
    }
}

fn print_tasks(tasks: &[&Task]) {
    println!("{:<5} {:<7} {:<12} {:<17} {}", "ID", "Report", "Status", "Assigned", "Staff");
    for t in tasks {
        println!(
            "{:<5} {:<7} {:<12} {:<17} {}",
            t.id,
            t.report_id,
            t.status.as_str(),
            local(t.assigned_at),
            t.assigned_to.join("; ")
        );
    }
}

fn print_task(t: &Task) {
    println!("ID:           {}", t.id);
    println!("Report:       {}", t.report_id);
    println!("Status:       {}", t.status);
    println!("Assigned to:  {}", t.assigned_to.join("; "));
    println!("Assigned by:  #{}", t.assigned_by);
    println!("Assigned:     {}", local(t.assigned_at));
    println!("Completed:    {}", t.completed_at.map(local).unwrap_or_else(|| "-".into()));
    println!("Checklist:");
    for item in &t.todo_list {
        println!("  - {item}");
    }
    println!("Catatan:      {}", if t.catatan.is_empty() { "-" } else { t.catatan.as_str() });
    if let Some(notes) = &t.catatan_revisi {
        println!("Revisi:       {notes}");
    }
    let next: Vec<&str> = allowed_events(t.status).into_iter().map(|e| e.name()).collect();
    println!("Next:         {}", if next.is_empty() { "-".to_string() } else { next.join(", ") });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("001/TU/2024", 18), "001/TU/2024");
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abcdef", 4).chars().count(), 4);
    }
}
