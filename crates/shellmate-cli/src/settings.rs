use std::fs;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use shellmate_core::config::Config;
use tracing::debug;
use tracing::warn;

const APP_DIR: &str = "shellmate";
const CONFIG_FILE: &str = "config.toml";

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub api_key: Option<String>,
    pub source: Option<PathBuf>,
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Loads settings from `explicit` (must exist) or the default location
/// (optional), after pulling a `.env` file into the environment.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<Settings> {
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "loaded .env file");
    }

    let (config, source) = match explicit {
        Some(path) => (read_config(path)?, Some(path.to_path_buf())),
        None => match default_config_path() {
            Some(path) if path.exists() => (read_config(&path)?, Some(path)),
            _ => (Config::default(), None),
        },
    };

    let api_key = config
        .model
        .resolve_api_key(|name| std::env::var(name).ok());
    if api_key.is_none() {
        warn!(
            env = %config.model.api_key_env,
            "no API key configured; requests will likely be rejected by the service"
        );
    }

    Ok(Settings {
        config,
        api_key,
        source,
    })
}

pub fn read_config(path: &Path) -> anyhow::Result<Config> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = toml::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use shellmate_core::config::DEFAULT_ENDPOINT;

    use super::*;

    #[test]
    fn reads_model_and_shell_sections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[model]
name = "gemini-2.5-pro"
api_key = "inline-key"

[shell]
program = "bash"
"#,
        )
        .expect("write config");

        let settings = load(Some(&path)).expect("settings");
        assert_eq!(settings.config.model.name, "gemini-2.5-pro");
        assert_eq!(settings.config.model.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(settings.config.shell.program.as_deref(), Some("bash"));
        assert_eq!(settings.api_key.as_deref(), Some("inline-key"));
        assert_eq!(settings.source, Some(path));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = load(Some(&dir.path().join("absent.toml"))).expect_err("missing file");
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[model\nname = ").expect("write config");

        let err = read_config(&path).expect_err("parse error");
        assert!(err.to_string().contains("failed to parse config file"));
        assert!(err.to_string().contains("config.toml"));
    }
}
