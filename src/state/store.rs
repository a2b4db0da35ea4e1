//! JSON-file persistence for [`RunState`].

use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use tokio::fs;

use super::error::StateError;
use super::types::RunState;

/// Fixed name of the state document inside the project directory.
pub const STATE_FILE_NAME: &str = ".thingsync-state.json";

/// Location of a project's run state.
#[derive(Debug, Clone)]
pub struct StateFile {
    path: PathBuf,
}

/// Exclusive advisory lock held for the duration of a run. Released when
/// dropped (the OS drops the lock with the file descriptor).
#[derive(Debug)]
pub struct RunLock {
    _file: std::fs::File,
    path: PathBuf,
}

impl RunLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// State file for the project rooted at `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(STATE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(suffix);
        PathBuf::from(name)
    }

    /// Take the per-project run lock, failing fast if another run holds it.
    pub fn lock(&self) -> Result<RunLock, StateError> {
        let path = self.sibling(".lock");
        let file = std::fs::File::create(&path).map_err(|source| StateError::Lock {
            path: path.clone(),
            source,
        })?;
        file.try_lock_exclusive()
            .map_err(|_| StateError::Locked { path: path.clone() })?;
        Ok(RunLock { _file: file, path })
    }

    /// Load the state. A missing file is a fresh project, not an error.
    pub async fn load(&self) -> Result<RunState, StateError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {}, starting fresh", self.path.display());
                return Ok(RunState::default());
            }
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let state: RunState =
            serde_json::from_str(&contents).map_err(|source| StateError::Parse {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!(
            files = state.files.len(),
            images = state.images.len(),
            "Loaded state from {}",
            self.path.display()
        );
        Ok(state)
    }

    /// Write the state atomically: serialize to a `.tmp` sibling, then rename
    /// over the target. The thing description is never written.
    pub async fn save(&self, state: &RunState) -> Result<(), StateError> {
        let mut persisted = state.clone();
        persisted.thing = persisted.thing.without_description();
        let json = serde_json::to_string_pretty(&persisted)?;

        let tmp = self.sibling(".tmp");
        fs::write(&tmp, json)
            .await
            .map_err(|source| StateError::Write {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StateError::Write {
                path: self.path.clone(),
                source,
            })?;
        tracing::debug!("Saved state to {}", self.path.display());
        Ok(())
    }
}
