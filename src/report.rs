//! Incoming correspondence ("reports") and their intake lifecycle.
//!
//! A report is created by TU in `draft` and routed to one or more koordinators with
//! [`forward_report`]. Later status changes are driven by the task state machine in
//! [`crate::task`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, WorkflowError};
use crate::fields::{normalise_names, ReportStatus, Role};
use crate::session::Session;
use crate::timeline::{action, append_entry, TimelineEntry};

/// Reference data typed in from the letter itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFields {
    pub no_surat: String,
    /// Subject line.
    pub hal: String,
    /// Sender.
    pub dari: String,
    pub tanggal_surat: String,
    pub tanggal_agenda: String,
    pub no_agenda: String,
    pub kelompok_asal_surat: String,
    pub agenda_sestama: String,
    /// Confidentiality labels.
    #[serde(default)]
    pub sifat: Vec<String>,
    /// Urgency labels.
    #[serde(default)]
    pub derajat: Vec<String>,
}

impl ReportFields {
    /// Check that every reference field is filled in. Label sets may be empty.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("noSurat", &self.no_surat),
            ("hal", &self.hal),
            ("dari", &self.dari),
            ("tanggalSurat", &self.tanggal_surat),
            ("tanggalAgenda", &self.tanggal_agenda),
            ("noAgenda", &self.no_agenda),
            ("kelompokAsalSurat", &self.kelompok_asal_surat),
            ("agendaSestama", &self.agenda_sestama),
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkflowError::validation(format!("missing required fields: {}", missing.join(", "))))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: u64,
    #[serde(flatten)]
    pub fields: ReportFields,
    pub status: ReportStatus,
    /// Id of the TU user who filed the report.
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
    /// Koordinator names the report was routed to.
    #[serde(default)]
    pub forwarded_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_assignee: Option<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

impl Report {
    pub fn last_entry(&self) -> Option<&TimelineEntry> {
        self.timeline.last()
    }

    pub(crate) fn invalid(&self, event: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            entity: "report",
            id: self.id,
            from: self.status.to_string(),
            event,
        }
    }
}

pub fn next_report_id(reports: &[Report]) -> u64 {
    reports.iter().map(|r| r.id).max().unwrap_or(0) + 1
}

pub fn find_report_mut(reports: &mut [Report], id: u64) -> Result<&mut Report> {
    reports
        .iter_mut()
        .find(|r| r.id == id)
        .ok_or_else(|| WorkflowError::not_found("report", id))
}

/// File a new report in `draft`. TU only.
///
/// Field completeness is the caller's concern (see [`ReportFields::validate`]).
pub fn create_report(id: u64, fields: ReportFields, session: &Session) -> Result<Report> {
    session.require_role(Role::Tu, "create reports")?;
    let details = format!("Report {} created", fields.no_surat);
    let mut report = Report {
        id,
        fields,
        status: ReportStatus::Draft,
        created_by: session.user_id(),
        created_at: Utc::now(),
        forwarded_to: Vec::new(),
        current_assignee: None,
        timeline: Vec::new(),
    };
    append_entry(&mut report, action::REPORT_CREATED, session.name(), Some(details));
    info!(report_id = id, no_surat = %report.fields.no_surat, by = session.name(), "report created");
    Ok(report)
}

/// Check that `session` may forward `report` to `targets`, returning the normalised
/// target names. Nothing is modified.
pub fn check_forward(report: &Report, session: &Session, targets: &[String]) -> Result<Vec<String>> {
    session.require_role(Role::Tu, "forward reports")?;
    if report.status != ReportStatus::Draft {
        warn!(report_id = report.id, status = %report.status, "forward rejected");
        return Err(report.invalid("forward"));
    }
    let targets = normalise_names(targets);
    if targets.is_empty() {
        return Err(WorkflowError::validation("select at least one koordinator"));
    }
    Ok(targets)
}

/// Route a draft report to koordinators (`draft` → `forwarded`). TU only.
pub fn forward_report(report: &mut Report, session: &Session, targets: &[String]) -> Result<()> {
    let targets = check_forward(report, session, targets)?;

    let details = format!("Forwarded to: {}", targets.join(", "));
    report.status = ReportStatus::Forwarded;
    report.forwarded_to = targets;
    append_entry(report, action::FORWARDED, session.name(), Some(details));
    info!(report_id = report.id, to = ?report.forwarded_to, by = session.name(), "report forwarded");
    Ok(())
}
