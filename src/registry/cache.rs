//! Process-wide registry snapshots with modification-time refresh.
//!
//! A [`RegistrySnapshot`] is immutable and remembers the fingerprint
//! (modification time + length, or absence) of every file it was built from,
//! as the loader saw it just before reading.
//! [`RegistryCache::current`] re-stats those files; any difference triggers a
//! full reload whose result replaces the cached `Arc` wholesale. Readers hold
//! whole snapshots and never see a half-built model.

use crate::core::error::GateError;
use crate::registry::loader::{self, FileStamp, RegistryLoad};
use crate::registry::model::{PolicyRegistry, RegistryIssue};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct RegistrySnapshot {
    pub registry: PolicyRegistry,
    /// Issues from a lenient load; always empty for strict caches.
    pub issues: Vec<RegistryIssue>,
    stamps: Vec<FileStamp>,
}

impl RegistrySnapshot {
    fn from_load(load: RegistryLoad) -> Self {
        Self {
            registry: load.registry,
            issues: load.issues,
            stamps: load.stamps,
        }
    }

    pub fn ok(&self) -> bool {
        self.issues.is_empty()
    }

    /// True when every tracked file still has the stamp it had at load time.
    pub fn is_fresh(&self) -> bool {
        self.stamps
            .iter()
            .all(|stamp| FileStamp::capture(stamp.path()) == *stamp)
    }
}

/// Lazily loaded, refresh-then-replace holder for one repository root.
#[derive(Debug)]
pub struct RegistryCache {
    root: PathBuf,
    strict: bool,
    current: RwLock<Option<Arc<RegistrySnapshot>>>,
}

impl RegistryCache {
    pub fn new(root: impl Into<PathBuf>, strict: bool) -> Self {
        Self {
            root: root.into(),
            strict,
            current: RwLock::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return a fresh snapshot, loading or reloading first when needed.
    ///
    /// Load failures are returned to this caller and never cached.
    pub fn current(&self) -> Result<Arc<RegistrySnapshot>, GateError> {
        let cached = self
            .current
            .read()
            .map_err(|_| GateError::LockPoisoned("registry snapshot lock".to_string()))?
            .clone();
        if let Some(snapshot) = cached {
            if snapshot.is_fresh() {
                return Ok(snapshot);
            }
            info!(root = %self.root.display(), "registry sources changed, reloading");
        } else {
            debug!(root = %self.root.display(), "registry first use, loading");
        }

        let load = loader::load(&self.root, self.strict)?;
        let snapshot = Arc::new(RegistrySnapshot::from_load(load));
        let mut slot = self
            .current
            .write()
            .map_err(|_| GateError::LockPoisoned("registry snapshot lock".to_string()))?;
        *slot = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    /// Drop the cached snapshot so the next call reloads unconditionally.
    pub fn invalidate(&self) -> Result<(), GateError> {
        let mut slot = self
            .current
            .write()
            .map_err(|_| GateError::LockPoisoned("registry snapshot lock".to_string()))?;
        *slot = None;
        Ok(())
    }
}

/// Process-wide cache for `(root, strict)`, created on first request.
pub fn global_cache(root: &Path, strict: bool) -> Result<Arc<RegistryCache>, GateError> {
    static CACHES: OnceLock<Mutex<HashMap<(PathBuf, bool), Arc<RegistryCache>>>> =
        OnceLock::new();
    let caches = CACHES.get_or_init(|| Mutex::new(HashMap::new()));
    let mut caches = caches
        .lock()
        .map_err(|_| GateError::LockPoisoned("global registry caches".to_string()))?;
    let cache = caches
        .entry((root.to_path_buf(), strict))
        .or_insert_with(|| Arc::new(RegistryCache::new(root, strict)));
    Ok(Arc::clone(cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::loader::ROLE_SKILL_MATRIX_REL_PATH;
    use std::fs::{self, File};
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    #[test]
    fn file_created_after_read_leaves_snapshot_stale() {
        let tmp = TempDir::new().expect("tmpdir");
        let load = loader::load(tmp.path(), false).expect("lenient load");

        let matrix = tmp.path().join(ROLE_SKILL_MATRIX_REL_PATH);
        fs::create_dir_all(matrix.parent().expect("parent")).expect("mkdir");
        fs::write(&matrix, r#"{"roles":{}}"#).expect("write");

        let snapshot = RegistrySnapshot::from_load(load);
        assert!(!snapshot.is_fresh());
    }

    #[test]
    fn rewrite_between_read_and_snapshot_is_detected() {
        let tmp = TempDir::new().expect("tmpdir");
        let matrix = tmp.path().join(ROLE_SKILL_MATRIX_REL_PATH);
        fs::create_dir_all(matrix.parent().expect("parent")).expect("mkdir");
        fs::write(&matrix, r#"{"roles":{}}"#).expect("write");
        let load = loader::load(tmp.path(), false).expect("lenient load");

        fs::write(&matrix, r#"{"roles":{"implementer":[]}}"#).expect("rewrite");
        File::options()
            .write(true)
            .open(&matrix)
            .expect("open")
            .set_modified(SystemTime::now() + Duration::from_secs(5))
            .expect("set mtime");

        let snapshot = RegistrySnapshot::from_load(load);
        assert!(!snapshot.is_fresh());
    }
}
