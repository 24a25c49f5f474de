use crate::infrastructure::config::{AppConfig, ensure_default_configs, load_app_config};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::storage::initialize_database;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct BootstrapResult {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
    pub config: AppConfig,
}

pub fn bootstrap_workspace(workspace_root: &Path) -> Result<BootstrapResult, InfraError> {
    let config_dir = workspace_root.join("config");
    let state_dir = workspace_root.join("state");
    let database_path = state_dir.join("focusflow.sqlite");

    fs::create_dir_all(&config_dir)?;
    fs::create_dir_all(&state_dir)?;

    ensure_default_configs(&config_dir)?;
    let config = load_app_config(&config_dir)?;
    initialize_database(&database_path)?;

    Ok(BootstrapResult {
        workspace_root: workspace_root.to_path_buf(),
        config_dir,
        database_path,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_creates_layout_and_is_repeatable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let first = bootstrap_workspace(dir.path()).expect("first bootstrap");
        let second = bootstrap_workspace(dir.path()).expect("second bootstrap");

        assert!(first.config_dir.join("app.json").exists());
        assert!(first.database_path.exists());
        assert_eq!(first.database_path, second.database_path);
        assert_eq!(first.config, second.config);
        assert_eq!(first.config.tasks_per_page, 10);
    }

    #[test]
    fn bootstrap_rejects_broken_config() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(dir.path().join("config")).expect("config dir");
        fs::write(dir.path().join("config/app.json"), "{}").expect("write");
        assert!(matches!(
            bootstrap_workspace(dir.path()),
            Err(InfraError::InvalidConfig(_))
        ));
    }
}
