use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use kioskmig_common::{Error, Result};
use tracing::{debug, warn};

/// Advisory lock preventing two migration runs against the same database.
///
/// Held for the whole run and released on every exit path, including
/// panic unwinding, via `Drop`.
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Lock file path for a database file: a sibling `<db>.lock`.
    pub fn path_for(db_path: &Path) -> PathBuf {
        let mut name = db_path.file_name().unwrap_or_default().to_os_string();
        name.push(".lock");
        db_path.with_file_name(name)
    }

    pub fn acquire(db_path: &Path) -> Result<Self> {
        let path = Self::path_for(db_path);
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(mut file) => {
                let _ = writeln!(file, "{}", std::process::id());
                debug!("acquired run lock at {}", path.display());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path).unwrap_or_default();
                let holder = holder.trim();
                let detail = if holder.is_empty() {
                    path.display().to_string()
                } else {
                    format!("{} (held by pid {holder})", path.display())
                };
                Err(Error::Locked(detail))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!("failed to remove run lock {}: {e}", self.path.display());
        }
    }
}
