use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default tasklog data directory: ~/.tasklog
pub fn get_tasklog_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".tasklog"))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {}: {}", path.display(), e))?;
    let mut cfg = toml::from_str::<AppConfig>(&s)?;
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.tasklog/config.toml
    let user_config = get_tasklog_data_dir()?.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let mut cfg: AppConfig = if user_config.exists() {
        let s = std::fs::read_to_string(&user_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else if local_config.exists() {
        let s = std::fs::read_to_string(local_config)?;
        toml::from_str::<AppConfig>(&s)?
    } else {
        AppConfig::default()
    };

    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

// Environment variable overrides (Priority 0: highest)
fn apply_env_overrides(cfg: &mut AppConfig) {
    if let Ok(v) = std::env::var("TASKLOG_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }
    if let Ok(v) = std::env::var("TASKLOG_EVENTS_OUT") {
        if !v.trim().is_empty() {
            cfg.events_out.path = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[session]\nforms_enabled = false\n\n[events_out]\npath = \"./events.jsonl\"\ndrop_when_full = true"
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();
        assert!(!cfg.session.forms_enabled);
        assert!(cfg.events_out.drop_when_full);
        assert_eq!(cfg.events_out.channel_capacity, 2048);
        assert!(cfg.logging.console);
        if std::env::var("TASKLOG_EVENTS_OUT").is_err() {
            assert_eq!(cfg.events_out.path, "./events.jsonl");
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_from_path(&dir.path().join("absent.toml")).is_err());
    }
}
