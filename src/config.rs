// Configuration loading and parsing (config/settings.toml).

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::gateway::UserId;
use crate::squad::{GameweekId, Price, SquadRules};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub rules: SquadRules,
    pub db_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Platform API root, without a trailing slash.
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub user_id: UserId,
    /// Gameweek opened at startup when no autosaved session exists.
    pub gameweek: GameweekId,
}

// ---------------------------------------------------------------------------
// settings.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire settings.toml file.
#[derive(Debug, Clone, Deserialize)]
struct SettingsFile {
    api: ApiConfig,
    session: SessionConfig,
    database: DatabaseSection,
    rules: RulesSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

/// The `[rules]` table. Budget is given in tenths, matching the unit the
/// catalog reports athlete costs in.
#[derive(Debug, Clone, Deserialize)]
struct RulesSection {
    squad_size: usize,
    starters: usize,
    min_keepers: usize,
    min_defenders: usize,
    min_midfielders: usize,
    min_forwards: usize,
    max_from_team: usize,
    budget_cap_tenths: u32,
}

impl RulesSection {
    fn into_rules(self) -> SquadRules {
        SquadRules {
            squad_size: self.squad_size,
            starter_count: self.starters,
            min_keepers: self.min_keepers,
            min_defenders: self.min_defenders,
            min_midfielders: self.min_midfielders,
            min_forwards: self.min_forwards,
            max_from_team: self.max_from_team,
            budget_cap: Price::from_tenths(self.budget_cap_tenths),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/settings.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let settings_path = base_dir.join("config").join("settings.toml");
    let text = read_file(&settings_path)?;
    let file: SettingsFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: settings_path.clone(),
        source: e,
    })?;

    let config = Config {
        api: file.api,
        session: file.session,
        rules: file.rules.into_rules(),
        db_path: file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure `config/settings.toml` exists by copying it from `defaults/` when
/// missing. Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();
    let source = defaults_dir.join("settings.toml");
    let target = config_dir.join("settings.toml");

    if source.exists() && !target.exists() {
        std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to copy {}: {e}", source.display()),
        })?;
        copied.push(target);
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying the default settings file first if needed.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.api.base_url.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "api.base_url".into(),
            message: "must not be empty".into(),
        });
    }

    if config.api.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "api.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    let rules = &config.rules;
    if rules.squad_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "rules.squad_size".into(),
            message: "must be greater than 0".into(),
        });
    }

    if rules.starter_count == 0 || rules.starter_count > rules.squad_size {
        return Err(ConfigError::ValidationError {
            field: "rules.starters".into(),
            message: format!(
                "must be between 1 and the squad size ({}), got {}",
                rules.squad_size, rules.starter_count
            ),
        });
    }

    // The position minimums must saturate the squad size exactly. When the
    // sum equals the size, the minimums also act as maximums (there is no
    // slack to exceed one quota without breaking another), which is the
    // whole mechanism that pins the position distribution. A config where
    // the numbers drift apart would weaken the rule set silently, so it is
    // rejected outright.
    if rules.quota_sum() != rules.squad_size {
        return Err(ConfigError::ValidationError {
            field: "rules".into(),
            message: format!(
                "position minimums sum to {} but squad_size is {}; \
                 they must be equal for the quotas to pin the distribution",
                rules.quota_sum(),
                rules.squad_size
            ),
        });
    }

    if rules.max_from_team == 0 {
        return Err(ConfigError::ValidationError {
            field: "rules.max_from_team".into(),
            message: "must be greater than 0".into(),
        });
    }

    if rules.budget_cap == Price::ZERO {
        return Err(ConfigError::ValidationError {
            field: "rules.budget_cap_tenths".into(),
            message: "must be greater than 0".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_SETTINGS: &str = r#"
[api]
base_url = "https://fantasy.example.com/api"
timeout_secs = 10

[session]
user_id = 7
gameweek = 1

[database]
path = "touchline.db"

[rules]
squad_size = 15
starters = 11
min_keepers = 2
min_defenders = 5
min_midfielders = 5
min_forwards = 3
max_from_team = 3
budget_cap_tenths = 1000
"#;

    /// Helper: write `settings` into a fresh temp config dir and load it.
    fn load_from_temp(name: &str, settings: &str) -> Result<Config, ConfigError> {
        let tmp = std::env::temp_dir().join(format!("touchline_config_{name}"));
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("settings.toml"), settings).unwrap();

        let result = load_config_from(&tmp);
        let _ = fs::remove_dir_all(&tmp);
        result
    }

    #[test]
    fn load_valid_settings() {
        let config = load_from_temp("valid", VALID_SETTINGS).expect("should load");

        assert_eq!(config.api.base_url, "https://fantasy.example.com/api");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.session.user_id, UserId(7));
        assert_eq!(config.session.gameweek, GameweekId(1));
        assert_eq!(config.db_path, "touchline.db");

        assert_eq!(config.rules.squad_size, 15);
        assert_eq!(config.rules.starter_count, 11);
        assert_eq!(config.rules.min_keepers, 2);
        assert_eq!(config.rules.min_defenders, 5);
        assert_eq!(config.rules.min_midfielders, 5);
        assert_eq!(config.rules.min_forwards, 3);
        assert_eq!(config.rules.max_from_team, 3);
        assert_eq!(config.rules.budget_cap, Price::from_tenths(1000));
    }

    #[test]
    fn repo_default_settings_parse_and_validate() {
        let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let text = fs::read_to_string(root.join("defaults/settings.toml")).unwrap();
        let result = load_from_temp("repo_defaults", &text);
        assert!(result.is_ok(), "defaults/settings.toml should be valid");
    }

    #[test]
    fn rejects_quota_sum_mismatch() {
        let settings = VALID_SETTINGS.replace("min_forwards = 3", "min_forwards = 4");
        let err = load_from_temp("quota_mismatch", &settings).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "rules");
                assert!(message.contains("16"), "got: {message}");
                assert!(message.contains("15"), "got: {message}");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_squad_size_change_without_quota_revisit() {
        // Growing the squad without revisiting the quotas breaks the
        // saturation property and must not load.
        let settings = VALID_SETTINGS.replace("squad_size = 15", "squad_size = 16");
        let err = load_from_temp("size_drift", &settings).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { .. }));
    }

    #[test]
    fn rejects_starters_above_squad_size() {
        let settings = VALID_SETTINGS.replace("starters = 11", "starters = 16");
        let err = load_from_temp("starters_high", &settings).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "rules.starters"),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_zero_budget() {
        let settings =
            VALID_SETTINGS.replace("budget_cap_tenths = 1000", "budget_cap_tenths = 0");
        let err = load_from_temp("zero_budget", &settings).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "rules.budget_cap_tenths")
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn rejects_empty_base_url() {
        let settings = VALID_SETTINGS.replace(
            "base_url = \"https://fantasy.example.com/api\"",
            "base_url = \"\"",
        );
        let err = load_from_temp("empty_url", &settings).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "api.base_url"),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn file_not_found_for_missing_settings() {
        let tmp = std::env::temp_dir().join("touchline_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("settings.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let err = load_from_temp("invalid_toml", "this is not valid [[[ toml").unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("settings.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }
    }

    #[test]
    fn ensure_config_files_copies_missing_settings() {
        let tmp = std::env::temp_dir().join("touchline_config_ensure");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/settings.toml"), VALID_SETTINGS).unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/settings.toml").exists());

        // A second run copies nothing and preserves the existing file.
        fs::write(tmp.join("config/settings.toml"), "# custom\n").unwrap();
        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());
        let content = fs::read_to_string(tmp.join("config/settings.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("touchline_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
