//! # Surat - Incoming Correspondence Tracker
//!
//! A file-backed tracker for official letters moving through an office: the
//! administration desk (TU) files a letter as a report, forwards it to koordinators,
//! who delegate it to staff as a task with a checklist. Staff submit their work and the
//! koordinator approves it or sends it back for revision.
//!
//! ## Key Features
//!
//! - **Role-based workflow**: Admin, TU, Koordinator and Staff each drive their own
//!   transitions; anything else is refused with an explicit error
//! - **Timeline**: every transition appends a timestamped entry to the report
//! - **Public tracker**: look up a report by letter or agenda number without logging in
//! - **Local File Storage**: one JSON file per collection with timestamped backups
//!
//! ## Quick Start
//!
//! ```bash
//! surat login "TU User" --password tu123
//! surat report create --no-surat 001/TU/2024 --hal "Undangan Rapat" ...
//! surat report forward 1 --to "Suwati, S.h"
//! surat track 001/TU
//! ```
//!
//! Data is stored locally in `~/.surat/` unless `--data-dir` or `SURAT_HOME` says
//! otherwise.

pub mod cli;
pub mod cmd;
pub mod config;
pub mod credential;
pub mod error;
pub mod fields;
pub mod report;
pub mod session;
pub mod store;
pub mod task;
pub mod timeline;
pub mod tracker;
pub mod user;
pub mod workflow;

pub use error::{Result, WorkflowError};
pub use workflow::Workflow;
