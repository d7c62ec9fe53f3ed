use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ClientResult;
use crate::config::{self, RunConfig};
use crate::state::{ensure_workspace_directories, resolve_workspace_home};

/// A resolved report workspace with its configuration loaded.
#[derive(Debug, Clone)]
pub struct WorkspaceContext {
    pub home: PathBuf,
    pub config: RunConfig,
}

impl WorkspaceContext {
    pub fn config_path(&self) -> PathBuf {
        config::config_path(&self.home)
    }
}

pub fn ensure_initialized() -> ClientResult<WorkspaceContext> {
    ensure_initialized_with_home_override(None)
}

pub fn ensure_initialized_at(home_override: &Path) -> ClientResult<WorkspaceContext> {
    ensure_initialized_with_home_override(Some(home_override))
}

pub(crate) fn ensure_initialized_with_home_override(
    home_override: Option<&Path>,
) -> ClientResult<WorkspaceContext> {
    let home = resolve_workspace_home(home_override)?;
    ensure_workspace_directories(&home)?;
    let config = config::load(&home)?;
    debug!(
        home = %home.display(),
        families = config.families.len(),
        mappings = config.mappings.len(),
        "loaded run configuration"
    );
    Ok(WorkspaceContext { home, config })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::ensure_initialized_at;

    #[test]
    fn missing_config_is_reported_after_creating_folders() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let home = dir.path().join("MSRs");
            let result = ensure_initialized_at(&home);
            assert_eq!(result.err().map(|error| error.code), Some("config_missing".to_string()));
            for folder in ["config", "templates", "completed", "locks"] {
                assert!(home.join(folder).is_dir());
            }
        }
    }

    #[test]
    fn loads_config_from_workspace() {
        let temp = tempdir();
        assert!(temp.is_ok());
        if let Ok(dir) = temp {
            let config_dir = dir.path().join("config");
            assert!(fs::create_dir_all(&config_dir).is_ok());
            let body = r#"{ "families": { "TO1": { "cadence": "monthly", "sections": { "MSR": { "header_row": 3 } } } } }"#;
            assert!(fs::write(config_dir.join("msrsync.json"), body).is_ok());

            let context = ensure_initialized_at(dir.path());
            assert!(context.is_ok());
            if let Ok(context) = context {
                assert_eq!(context.home, dir.path());
                assert!(context.config.families.contains_key("TO1"));
                assert!(context.config_path().ends_with("config/msrsync.json"));
            }
        }
    }
}
