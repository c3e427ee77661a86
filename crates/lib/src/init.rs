//! Initialize the data layout: config directory with a default
//! `config.toml`, and the session storage directory.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config;

/// Create the config and session directories and seed a default config file
/// when missing. Safe to call on every startup.
pub fn init_data_dirs(config_path: &Path, sessions_dir: &Path) -> Result<()> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        config::save_config(&config::AgentConfig::default(), config_path)?;
        log::info!("created default config at {}", config_path.display());
    }

    if !sessions_dir.exists() {
        std::fs::create_dir_all(sessions_dir)
            .with_context(|| format!("creating sessions directory {}", sessions_dir.display()))?;
        log::info!("created sessions directory at {}", sessions_dir.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("mira-init-test-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn seeds_default_config_and_dirs() {
        let root = temp_root();
        let config_path = root.join("config").join("config.toml");
        let sessions_dir = root.join("data").join("sessions");

        init_data_dirs(&config_path, &sessions_dir).expect("init");
        assert!(config_path.exists());
        assert!(sessions_dir.exists());

        let (config, _) = config::load_config(Some(config_path.clone())).expect("load");
        assert_eq!(config, config::AgentConfig::default());

        // Second run leaves everything in place.
        init_data_dirs(&config_path, &sessions_dir).expect("re-init");
    }
}
