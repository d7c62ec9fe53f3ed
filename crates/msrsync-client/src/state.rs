use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::{ClientError, ClientResult};

pub const HOME_ENV_VAR: &str = "MSRSYNC_HOME";

const WORKSPACE_DIRS: [&str; 4] = ["config", "templates", "completed", "locks"];

pub fn resolve_workspace_home(home_override: Option<&Path>) -> ClientResult<PathBuf> {
    let candidate = match home_override {
        Some(path) => path.to_path_buf(),
        None => {
            if let Some(override_path) = std::env::var_os(HOME_ENV_VAR) {
                PathBuf::from(override_path)
            } else if let Some(home_path) = home::home_dir() {
                home_path.join("Documents").join("MSRs")
            } else {
                return Err(ClientError::workspace_init_failed(
                    Path::new("."),
                    "Could not resolve a home directory for the report workspace.",
                ));
            }
        }
    };

    absolutize(&candidate)
}

pub fn ensure_workspace_directories(home: &Path) -> ClientResult<()> {
    for name in WORKSPACE_DIRS {
        let path = home.join(name);
        fs::create_dir_all(&path).map_err(|error| map_io_error(&path, &error))?;
    }
    Ok(())
}

pub fn templates_dir(home: &Path) -> PathBuf {
    home.join("templates")
}

pub fn completed_dir(home: &Path) -> PathBuf {
    home.join("completed")
}

pub fn locks_dir(home: &Path) -> PathBuf {
    home.join("locks")
}

pub fn map_io_error(path: &Path, error: &std::io::Error) -> ClientError {
    if error.kind() == ErrorKind::PermissionDenied {
        return ClientError::workspace_permission_denied(path, &error.to_string());
    }

    ClientError::workspace_init_failed(path, &error.to_string())
}

/// Replaces `path` with `bytes` so readers never observe a half-written file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> ClientResult<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|error| map_io_error(parent, &error))?;

    let mut staged = NamedTempFile::new_in(parent).map_err(|error| map_io_error(parent, &error))?;
    staged
        .write_all(bytes)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|error| map_io_error(path, &error))?;
    staged
        .persist(path)
        .map_err(|error| map_io_error(path, &error.error))?;
    Ok(())
}

/// Exclusive per-family run lock. Released when dropped.
#[derive(Debug)]
pub struct FamilyLock {
    path: PathBuf,
}

impl FamilyLock {
    pub fn acquire(home: &Path, family: &str) -> ClientResult<Self> {
        let directory = locks_dir(home);
        fs::create_dir_all(&directory).map_err(|error| map_io_error(&directory, &error))?;
        let path = directory.join(format!("{family}.lock"));

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(error) = writeln!(file, "{}", std::process::id()) {
                    warn!(lock = %path.display(), error = %error, "could not record pid in report lock");
                }
                debug!(family, lock = %path.display(), "acquired report lock");
                Ok(Self { path })
            }
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .ok()
                    .and_then(|body| body.trim().parse::<u32>().ok());
                Err(ClientError::report_locked(family, &path, holder))
            }
            Err(error) => Err(map_io_error(&path, &error)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FamilyLock {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_file(&self.path) {
            warn!(lock = %self.path.display(), error = %error, "failed to release report lock");
        }
    }
}

fn absolutize(path: &Path) -> ClientResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| ClientError::workspace_init_failed(path, &error.to_string()))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{FamilyLock, resolve_workspace_home, write_atomic};

    #[test]
    fn second_lock_on_same_family_is_refused() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let first = FamilyLock::acquire(dir.path(), "TO1");
            assert!(first.is_ok());

            let second = FamilyLock::acquire(dir.path(), "TO1");
            assert_eq!(second.err().map(|error| error.code), Some("report_locked".to_string()));

            assert!(FamilyLock::acquire(dir.path(), "TO4").is_ok());

            drop(first);
            assert!(FamilyLock::acquire(dir.path(), "TO1").is_ok());
        }
    }

    #[test]
    fn leftover_lock_names_its_path_and_holder() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let lock_path = dir.path().join("locks").join("WSR.lock");
            assert!(fs::create_dir_all(dir.path().join("locks")).is_ok());
            assert!(fs::write(&lock_path, "4242\n").is_ok());

            let refused = FamilyLock::acquire(dir.path(), "WSR");
            assert!(refused.is_err());
            if let Err(error) = refused {
                let location = lock_path.display().to_string();
                assert_eq!(error.code, "report_locked");
                assert!(
                    error
                        .recovery_steps
                        .iter()
                        .any(|step| step.contains(&location) && step.contains("remove"))
                );
                assert_eq!(error.data.as_ref().map(|data| data["pid"].clone()), Some(serde_json::json!(4242)));
            }
            assert!(lock_path.exists());
        }
    }

    #[test]
    fn atomic_write_replaces_previous_content() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let path = dir.path().join("nested").join("doc.json");
            assert!(write_atomic(&path, b"first").is_ok());
            assert!(write_atomic(&path, b"second").is_ok());
            assert_eq!(fs::read_to_string(&path).ok(), Some("second".to_string()));
        }
    }

    #[test]
    fn override_wins_over_environment() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let resolved = resolve_workspace_home(Some(dir.path()));
            assert_eq!(resolved.ok(), Some(dir.path().to_path_buf()));
        }
    }
}
