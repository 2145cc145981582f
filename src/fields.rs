//! Enumerations and fixed rosters for correspondence tracking.
//!
//! This module defines the closed value sets used across the workflow: user roles,
//! report and task statuses, plus the default name rosters and checklist labels
//! offered when routing and delegating work.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Role of a user, which decides the operations they may perform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    #[value(name = "admin")]
    Admin,
    #[serde(rename = "TU")]
    #[value(name = "tu")]
    Tu,
    #[value(name = "koordinator")]
    Koordinator,
    #[value(name = "staff")]
    Staff,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Tu, Role::Koordinator, Role::Staff];

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Tu => "TU",
            Role::Koordinator => "Koordinator",
            Role::Staff => "Staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lifecycle status of a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ReportStatus {
    Draft,
    Forwarded,
    Assigned,
    InProgress,
    Completed,
    Revision,
}

impl ReportStatus {
    /// Wire name, as persisted.
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Draft => "draft",
            ReportStatus::Forwarded => "forwarded",
            ReportStatus::Assigned => "assigned",
            ReportStatus::InProgress => "in-progress",
            ReportStatus::Completed => "completed",
            ReportStatus::Revision => "revision",
        }
    }

    /// Human-readable label shown by the tracker.
    pub fn label(self) -> &'static str {
        match self {
            ReportStatus::Draft => "Draft",
            ReportStatus::Forwarded => "Forwarded",
            ReportStatus::Assigned => "Assigned",
            ReportStatus::InProgress => "In Progress",
            ReportStatus::Completed => "Completed",
            ReportStatus::Revision => "Needs Revision",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status of a delegated task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Assigned,
    InProgress,
    Completed,
    Approved,
    Revision,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Assigned => "assigned",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Approved => "approved",
            TaskStatus::Revision => "revision",
        }
    }

    /// Whether no further transition is defined from this status.
    pub fn is_terminal(self) -> bool {
        self == TaskStatus::Approved
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default staff roster offered when assigning tasks.
pub const STAFF_LIST: &[&str] = &[
    "Roza Erlinda",
    "Ahmad Syafrudin",
    "Bambang Sudirman",
    "Citra Dewi",
    "Dedi Irawan",
    "Eka Sari",
    "Fajar Nugroho",
    "Gita Permana",
    "Hadi Santoso",
    "Indra Kusuma",
    "Joko Widodo",
    "Kartika Sari",
    "Lukman Hakim",
    "Maya Putri",
    "Nanda Pratama",
    "Oktavia Ningsih",
    "Pandu Wijaya",
    "Qori Amalia",
    "Rizki Ramadan",
    "Sinta Maharani",
    "Taufik Hidayat",
    "Umi Kalsum",
    "Vina Melati",
    "Dede Winarta Putra",
];

/// Default koordinator roster offered when forwarding reports.
pub const KOORDINATOR_LIST: &[&str] = &[
    "Suwati, S.h",
    "Achamd Evianto",
    "Adi Sulaksono",
    "Yosi Yosandi",
];

/// Checklist items a koordinator can attach to a task.
pub const TODO_LIST_ITEMS: &[&str] = &[
    "Jadwalkan/Agendakan",
    "Bahas dengan saya",
    "Untuk ditindaklanjuti",
    "Untuk diperhatikan",
    "Untuk diketahui",
    "Untuk ditelaah",
    "Untuk dipelajari",
    "Untuk dikoordinasikan",
    "Untuk diselesaikan",
    "Untuk dilaksanakan",
];

/// Confidentiality labels (`sifat`).
pub const SIFAT_OPTIONS: &[&str] = &["Biasa", "Penting", "Rahasia"];

/// Urgency labels (`derajat`).
pub const DERAJAT_OPTIONS: &[&str] = &["Biasa", "Segera", "Kilat"];

/// Trim names, drop blanks and duplicates, keeping first-occurrence order.
pub fn normalise_names(inputs: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for raw in inputs {
        let name = raw.trim();
        if !name.is_empty() && !out.iter().any(|n| n == name) {
            out.push(name.to_string());
        }
    }
    out
}
