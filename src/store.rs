//! Whole-collection persistence.
//!
//! The [`Store`] trait is the only persistence surface the workflow needs: read or
//! replace an entire collection, plus the current-session pointer. There are no partial
//! updates and no transactions; the last writer wins.
//!
//! [`JsonStore`] keeps one pretty-printed JSON file per collection in a data directory
//! and writes through a temp file + rename. [`MemoryStore`] keeps the same serialized
//! form in memory and backs the tests.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, WorkflowError};
use crate::report::Report;
use crate::task::Task;
use crate::user::{default_users, User};

pub const USERS: &str = "users";
pub const REPORTS: &str = "reports";
pub const TASKS: &str = "tasks";
pub const SESSION: &str = "session";

pub trait Store {
    fn load_users(&self) -> Result<Vec<User>>;
    fn save_users(&mut self, users: &[User]) -> Result<()>;
    fn load_reports(&self) -> Result<Vec<Report>>;
    fn save_reports(&mut self, reports: &[Report]) -> Result<()>;
    fn load_tasks(&self) -> Result<Vec<Task>>;
    fn save_tasks(&mut self, tasks: &[Task]) -> Result<()>;
    fn load_session(&self) -> Result<Option<User>>;
    fn save_session(&mut self, user: &User) -> Result<()>;
    fn clear_session(&mut self) -> Result<()>;

    /// Whether a user collection has ever been written.
    fn is_initialised(&self) -> Result<bool>;
}

/// First-run setup: seed the default accounts (when `seed_defaults`) and write empty
/// report and task collections. A store that already holds users is left alone.
pub fn bootstrap<S: Store + ?Sized>(store: &mut S, seed_defaults: bool) -> Result<()> {
    if store.is_initialised()? {
        return Ok(());
    }
    let users = if seed_defaults { default_users() } else { Vec::new() };
    store.save_users(&users)?;
    if store.load_reports()?.is_empty() {
        store.save_reports(&[])?;
    }
    if store.load_tasks()?.is_empty() {
        store.save_tasks(&[])?;
    }
    info!(seeded = users.len(), "initialised store");
    Ok(())
}

/// Directory of JSON files, one per collection.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| WorkflowError::Storage { path: dir.clone(), source })?;
        Ok(JsonStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_of(key);
        if !path.exists() {
            return Ok(None);
        }
        let buf = fs::read_to_string(&path).map_err(|source| WorkflowError::Storage { path: path.clone(), source })?;
        let value = serde_json::from_str(&buf).map_err(|source| WorkflowError::Corrupt { path: path.clone(), source })?;
        debug!(path = %path.display(), "loaded");
        Ok(Some(value))
    }

    fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.path_of(key);
        let tmp = path.with_extension("json.tmp");
        let storage = |source: std::io::Error| WorkflowError::Storage { path: path.clone(), source };
        let data = serde_json::to_string_pretty(value).map_err(|source| WorkflowError::Corrupt { path: path.clone(), source })?;
        let mut f = File::create(&tmp).map_err(storage)?;
        f.write_all(data.as_bytes()).map_err(storage)?;
        f.flush().map_err(storage)?;
        fs::rename(&tmp, &path).map_err(storage)?;
        debug!(path = %path.display(), bytes = data.len(), "saved");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_of(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(WorkflowError::Storage { path, source }),
        }
    }

    /// Copy every collection file present into `backup/<timestamp>/` and return that directory.
    pub fn backup(&self) -> Result<PathBuf> {
        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
        let target = self.dir.join("backup").join(stamp);
        fs::create_dir_all(&target).map_err(|source| WorkflowError::Storage { path: target.clone(), source })?;
        for key in [USERS, REPORTS, TASKS] {
            let src = self.path_of(key);
            if src.exists() {
                let dst = target.join(format!("{key}.json"));
                fs::copy(&src, &dst).map_err(|source| WorkflowError::Storage { path: dst.clone(), source })?;
            }
        }
        info!(path = %target.display(), "backup written");
        Ok(target)
    }
}

impl Store for JsonStore {
    fn load_users(&self) -> Result<Vec<User>> {
        Ok(self.read(USERS)?.unwrap_or_default())
    }

    fn save_users(&mut self, users: &[User]) -> Result<()> {
        self.write(USERS, users)
    }

    fn load_reports(&self) -> Result<Vec<Report>> {
        Ok(self.read(REPORTS)?.unwrap_or_default())
    }

    fn save_reports(&mut self, reports: &[Report]) -> Result<()> {
        self.write(REPORTS, reports)
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.read(TASKS)?.unwrap_or_default())
    }

    fn save_tasks(&mut self, tasks: &[Task]) -> Result<()> {
        self.write(TASKS, tasks)
    }

    fn load_session(&self) -> Result<Option<User>> {
        self.read(SESSION)
    }

    fn save_session(&mut self, user: &User) -> Result<()> {
        self.write(SESSION, user)
    }

    fn clear_session(&mut self) -> Result<()> {
        self.remove(SESSION)
    }

    fn is_initialised(&self) -> Result<bool> {
        Ok(self.path_of(USERS).exists())
    }
}

/// In-memory store holding each collection in its serialized JSON form.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<&'static str, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw serialized value under `key`, as a file-backed store would hold it.
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn read<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(s) => serde_json::from_str(s)
                .map(Some)
                .map_err(|source| WorkflowError::Corrupt { path: PathBuf::from(key), source }),
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &'static str, value: &T) -> Result<()> {
        let s = serde_json::to_string(value).map_err(|source| WorkflowError::Corrupt { path: PathBuf::from(key), source })?;
        self.entries.insert(key, s);
        Ok(())
    }
}

impl Store for MemoryStore {
    fn load_users(&self) -> Result<Vec<User>> {
        Ok(self.read(USERS)?.unwrap_or_default())
    }

    fn save_users(&mut self, users: &[User]) -> Result<()> {
        self.write(USERS, users)
    }

    fn load_reports(&self) -> Result<Vec<Report>> {
        Ok(self.read(REPORTS)?.unwrap_or_default())
    }

    fn save_reports(&mut self, reports: &[Report]) -> Result<()> {
        self.write(REPORTS, reports)
    }

    fn load_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.read(TASKS)?.unwrap_or_default())
    }

    fn save_tasks(&mut self, tasks: &[Task]) -> Result<()> {
        self.write(TASKS, tasks)
    }

    fn load_session(&self) -> Result<Option<User>> {
        self.read(SESSION)
    }

    fn save_session(&mut self, user: &User) -> Result<()> {
        self.write(SESSION, user)
    }

    fn clear_session(&mut self) -> Result<()> {
        self.entries.remove(SESSION);
        Ok(())
    }

    fn is_initialised(&self) -> Result<bool> {
        Ok(self.entries.contains_key(USERS))
    }
}
