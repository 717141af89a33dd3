//! Scenario persistence
//!
//! Scenarios live in `.skyfleet/scenarios.json` under the project root.
//! Every deploy/destroy holds a per-scenario lock file so that at most one
//! operation touches a scenario's working directory at a time. A lock is only
//! taken over when its holder is a dead process on this host; anything else
//! has to be removed by hand.

use crate::error::{CloudError, Result};
use crate::scenario::Scenario;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nix::errno::Errno;
use nix::sys::signal;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".skyfleet";
const STATE_FILE: &str = "scenarios.json";
const STATE_BACKUP: &str = "scenarios.json.backup";
const STATE_TMP: &str = "scenarios.json.tmp";
const LOCK_DIR: &str = "locks";

/// Key-value record store for scenarios
#[async_trait]
pub trait ScenarioStore: Send + Sync {
    /// Look up by id, falling back to a unique name
    async fn get(&self, key: &str) -> Result<Scenario>;

    async fn list(&self) -> Result<Vec<Scenario>>;

    async fn insert(&self, scenario: Scenario) -> Result<()>;

    async fn update(&self, scenario: &Scenario) -> Result<()>;

    /// Exclusive access to one scenario until the guard is dropped
    async fn lock(&self, id: &str) -> Result<ScenarioLock>;
}

/// On-disk layout of the scenario file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub version: u32,
    pub updated_at: DateTime<Utc>,
    pub scenarios: BTreeMap<String, Scenario>,
}

impl Default for ScenarioFile {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            updated_at: Utc::now(),
            scenarios: BTreeMap::new(),
        }
    }
}

impl ScenarioFile {
    fn find(&self, key: &str) -> Result<&Scenario> {
        if let Some(scenario) = self.scenarios.get(key) {
            return Ok(scenario);
        }
        let mut by_name = self.scenarios.values().filter(|s| s.name == key);
        match (by_name.next(), by_name.next()) {
            (Some(scenario), None) => Ok(scenario),
            (Some(_), Some(_)) => Err(CloudError::StateError(format!(
                "Scenario name '{}' is ambiguous; use the id",
                key
            ))),
            _ => Err(CloudError::ScenarioNotFound(key.to_string())),
        }
    }
}

/// JSON-file scenario store with backup-on-save and atomic replace
pub struct FileScenarioStore {
    state_dir: PathBuf,
    write_guard: Mutex<()>,
}

impl FileScenarioStore {
    /// Store under `<project_root>/.skyfleet`
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self::in_dir(project_root.as_ref().join(STATE_DIR))
    }

    /// Store directly in `state_dir`
    pub fn in_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            write_guard: Mutex::new(()),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.state_dir.clone()
    }

    fn state_path(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE)
    }

    fn backup_path(&self) -> PathBuf {
        self.state_dir().join(STATE_BACKUP)
    }

    fn tmp_path(&self) -> PathBuf {
        self.state_dir().join(STATE_TMP)
    }

    fn lock_path(&self, id: &str) -> PathBuf {
        self.state_dir().join(LOCK_DIR).join(format!("{}.lock", id))
    }

    async fn ensure_dir(&self, dir: &Path) -> Result<()> {
        if !dir.exists() {
            fs::create_dir_all(dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    pub async fn load(&self) -> Result<ScenarioFile> {
        let mut path = self.state_path();
        if !path.exists() {
            let backup = self.backup_path();
            if !backup.exists() {
                tracing::debug!("Scenario file not found, returning empty state");
                return Ok(ScenarioFile::default());
            }
            tracing::warn!(
                "Scenario file missing, recovering from {}",
                backup.display()
            );
            path = backup;
        }

        let content = fs::read_to_string(&path).await?;
        let state: ScenarioFile = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(CloudError::StateError(format!(
                "Scenario file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!("Loaded {} scenarios", state.scenarios.len());
        Ok(state)
    }

    async fn save(&self, state: &mut ScenarioFile) -> Result<()> {
        self.ensure_dir(&self.state_dir()).await?;
        state.updated_at = Utc::now();

        let path = self.state_path();
        let tmp = self.tmp_path();

        // The previous file stays in place until the rename replaces it
        if path.exists() {
            fs::copy(&path, self.backup_path()).await?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;

        tracing::debug!("Saved {} scenarios", state.scenarios.len());
        Ok(())
    }
}

#[async_trait]
impl ScenarioStore for FileScenarioStore {
    async fn get(&self, key: &str) -> Result<Scenario> {
        self.load().await?.find(key).cloned()
    }

    async fn list(&self) -> Result<Vec<Scenario>> {
        let mut scenarios: Vec<Scenario> = self.load().await?.scenarios.into_values().collect();
        scenarios.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(scenarios)
    }

    async fn insert(&self, scenario: Scenario) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let mut state = self.load().await?;
        if state.scenarios.contains_key(&scenario.id)
            || state.scenarios.values().any(|s| s.name == scenario.name)
        {
            return Err(CloudError::ScenarioAlreadyExists(scenario.name));
        }
        state.scenarios.insert(scenario.id.clone(), scenario);
        self.save(&mut state).await
    }

    async fn update(&self, scenario: &Scenario) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let mut state = self.load().await?;
        match state.scenarios.get_mut(&scenario.id) {
            Some(existing) => *existing = scenario.clone(),
            None => return Err(CloudError::ScenarioNotFound(scenario.id.clone())),
        }
        self.save(&mut state).await
    }

    async fn lock(&self, id: &str) -> Result<ScenarioLock> {
        let lock_path = self.lock_path(id);
        if let Some(parent) = lock_path.parent() {
            self.ensure_dir(parent).await?;
        }

        if let Some(held) = LockInfo::read(&lock_path).await? {
            if !held.is_abandoned() {
                return Err(CloudError::LockError(format!(
                    "Scenario {} is locked by pid {} on {} since {} (remove {} if that operation is gone)",
                    id,
                    held.pid,
                    held.holder,
                    held.acquired_at,
                    lock_path.display()
                )));
            }
            // Another acquirer may have replaced it in the meantime
            if LockInfo::read(&lock_path).await?.is_some_and(|now| now.token == held.token) {
                tracing::warn!(pid = held.pid, "Removing scenario lock of a dead process");
                remove_if_present(&lock_path).await?;
            }
        }

        let lock_info = LockInfo::new();

        // The lock appears fully written: write a private file, then link it in.
        // hard_link fails when the lock exists, so a second acquirer never overwrites.
        let staging = lock_path.with_extension(format!("lock.{}", lock_info.token));
        fs::write(&staging, serde_json::to_string_pretty(&lock_info)?).await?;
        let linked = fs::hard_link(&staging, &lock_path).await;
        fs::remove_file(&staging).await?;
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(CloudError::LockError(format!(
                    "Scenario {} is locked by another operation",
                    id
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::debug!(scenario = %id, "Acquired scenario lock");
        Ok(ScenarioLock {
            lock_path,
            token: lock_info.token,
            released: false,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    token: String,
    holder: String,
    pid: u32,
    acquired_at: DateTime<Utc>,
}

impl LockInfo {
    fn new() -> Self {
        Self {
            token: uuid::Uuid::new_v4().to_string(),
            holder: hostname(),
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// `None` when no lock file exists
    async fn read(path: &Path) -> Result<Option<Self>> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map(Some).map_err(|_| {
            CloudError::LockError(format!(
                "Unreadable scenario lock {}; remove it if no operation is running",
                path.display()
            ))
        })
    }

    /// Held by a process of this host that no longer exists
    fn is_abandoned(&self) -> bool {
        self.holder == hostname() && !process_alive(self.pid)
    }
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "unknown".to_string())
}

fn process_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // signal 0 only checks existence; EPERM still means the process is there
    !matches!(signal::kill(Pid::from_raw(raw), None), Err(Errno::ESRCH))
}

async fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}

/// Whether the lock file still carries `token`
fn owns(path: &Path, token: &str) -> bool {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|content| serde_json::from_str::<LockInfo>(&content).ok())
        .is_some_and(|info| info.token == token)
}

/// RAII guard for a scenario lock
#[derive(Debug)]
pub struct ScenarioLock {
    lock_path: PathBuf,
    token: String,
    released: bool,
}

impl ScenarioLock {
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            self.released = true;
            if owns(&self.lock_path, &self.token) {
                remove_if_present(&self.lock_path).await?;
                tracing::debug!("Released scenario lock");
            } else {
                tracing::warn!("Scenario lock {} is no longer ours, leaving it", self.lock_path.display());
            }
        }
        Ok(())
    }
}

impl Drop for ScenarioLock {
    fn drop(&mut self) {
        if !self.released && owns(&self.lock_path, &self.token) {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
