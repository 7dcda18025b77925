use std::path::{Path, PathBuf};

use dagboard_core::column::{ColumnId, ColumnModel};
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub source: SourceConfig,
    pub view: ViewConfig,
    pub actions: ActionsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub items_path: Option<PathBuf>,
    pub refresh_interval_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    pub scope: String,
    pub tick_interval_ms: u64,
    pub sort_column: ColumnId,
    pub sort_desc: bool,
}

/// External program invoked as `<command> <args..> <action> <dag>`.
/// An empty command disables actions.
#[derive(Debug, Clone, Default)]
pub struct ActionsConfig {
    pub command: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn default_from_env() -> Self {
        let home = std::env::var("HOME").unwrap_or_default();
        let data_dir = if home.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&home)
                .join(".local")
                .join("share")
                .join("dagboard")
        };
        let config_dir = if home.is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&home).join(".config").join("dagboard")
        };
        Self {
            global: GlobalConfig {
                data_dir,
                config_dir,
            },
            source: SourceConfig {
                items_path: None,
                refresh_interval_ms: 2000,
            },
            view: ViewConfig {
                scope: String::new(),
                tick_interval_ms: 1000,
                sort_column: ColumnId::Name,
                sort_desc: false,
            },
            actions: ActionsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "console".to_string(),
                log_dir: None,
            },
        }
    }

    pub fn items_path(&self) -> PathBuf {
        if let Some(path) = &self.source.items_path {
            return path.clone();
        }
        self.global.data_dir.join("dags.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        if let Some(path) = &self.logging.log_dir {
            return path.clone();
        }
        self.global.data_dir.join("logs")
    }

    pub fn validate(&self) -> Result<(), String> {
        match self.logging.level.as_str() {
            "debug" | "info" | "warn" | "error" => {}
            other => return Err(format!("invalid logging.level {other:?}")),
        }
        match self.logging.format.as_str() {
            "console" | "json" => {}
            other => return Err(format!("invalid logging.format {other:?}")),
        }
        if self.source.refresh_interval_ms == 0 {
            return Err("source.refresh_interval_ms must be greater than 0".to_string());
        }
        if self.view.tick_interval_ms == 0 {
            return Err("view.tick_interval_ms must be greater than 0".to_string());
        }
        let sortable = ColumnModel::standard()
            .get(self.view.sort_column)
            .is_some_and(|column| column.is_sortable());
        if !sortable {
            return Err(format!(
                "view.sort_column {} is not sortable",
                self.view.sort_column
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct PartialConfig {
    #[serde(default)]
    global: PartialGlobalConfig,
    #[serde(default)]
    source: PartialSourceConfig,
    #[serde(default)]
    view: PartialViewConfig,
    #[serde(default)]
    actions: PartialActionsConfig,
    #[serde(default)]
    logging: PartialLoggingConfig,
}

#[derive(Debug, Default, Deserialize)]
struct PartialGlobalConfig {
    #[serde(default)]
    data_dir: String,
    #[serde(default)]
    config_dir: String,
}

#[derive(Debug, Default, Deserialize)]
struct PartialSourceConfig {
    #[serde(default)]
    items_path: String,
    #[serde(default)]
    refresh_interval_ms: i64,
}

#[derive(Debug, Default, Deserialize)]
struct PartialViewConfig {
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    tick_interval_ms: i64,
    #[serde(default)]
    sort_column: String,
    #[serde(default)]
    sort_desc: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialActionsConfig {
    #[serde(default)]
    command: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialLoggingConfig {
    #[serde(default)]
    level: String,
    #[serde(default)]
    format: String,
    #[serde(default)]
    log_dir: String,
}

/// Load config with precedence defaults < (optional) config file.
/// An explicit path that cannot be read is a hard error.
pub fn load_config(config_file: Option<&str>) -> Result<(Config, Option<PathBuf>), String> {
    let mut cfg = Config::default_from_env();

    let explicit = config_file
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    let (path_to_try, used) = if let Some(path) = explicit {
        (Some(path), true)
    } else {
        (default_config_path(), false)
    };

    if let Some(path) = path_to_try {
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                let parsed: PartialConfig =
                    serde_yaml::from_str(&text).map_err(|err| format!("parse config: {err}"))?;
                apply_partial(&mut cfg, parsed)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                return Ok((cfg, Some(path)));
            }
            Err(err) => {
                if used {
                    return Err(format!("failed to load config file: {err}"));
                }
            }
        }
    }

    Ok((cfg, None))
}

fn default_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.trim().is_empty() {
            return Some(PathBuf::from(xdg).join("dagboard").join("config.yaml"));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        if !home.trim().is_empty() {
            return Some(
                PathBuf::from(home)
                    .join(".config")
                    .join("dagboard")
                    .join("config.yaml"),
            );
        }
    }
    None
}

fn apply_partial(cfg: &mut Config, partial: PartialConfig) -> Result<(), String> {
    if !partial.global.data_dir.trim().is_empty() {
        cfg.global.data_dir = expand_tilde(partial.global.data_dir.trim())?;
    }
    if !partial.global.config_dir.trim().is_empty() {
        cfg.global.config_dir = expand_tilde(partial.global.config_dir.trim())?;
    }
    if !partial.source.items_path.trim().is_empty() {
        cfg.source.items_path = Some(expand_tilde(partial.source.items_path.trim())?);
    }
    if partial.source.refresh_interval_ms > 0 {
        cfg.source.refresh_interval_ms = partial.source.refresh_interval_ms as u64;
    }
    if let Some(scope) = partial.view.scope {
        cfg.view.scope = scope.trim().to_string();
    }
    if partial.view.tick_interval_ms > 0 {
        cfg.view.tick_interval_ms = partial.view.tick_interval_ms as u64;
    }
    if !partial.view.sort_column.trim().is_empty() {
        cfg.view.sort_column = ColumnId::parse(&partial.view.sort_column)
            .map_err(|err| format!("view.sort_column: {err}"))?;
    }
    if let Some(desc) = partial.view.sort_desc {
        cfg.view.sort_desc = desc;
    }
    if !partial.actions.command.trim().is_empty() {
        cfg.actions.command = partial.actions.command.trim().to_string();
        cfg.actions.args = partial.actions.args;
    }
    if !partial.logging.level.trim().is_empty() {
        cfg.logging.level = partial.logging.level.trim().to_string();
    }
    if !partial.logging.format.trim().is_empty() {
        cfg.logging.format = partial.logging.format.trim().to_string();
    }
    if !partial.logging.log_dir.trim().is_empty() {
        cfg.logging.log_dir = Some(expand_tilde(partial.logging.log_dir.trim())?);
    }
    Ok(())
}

fn expand_tilde(input: &str) -> Result<PathBuf, String> {
    if input == "~" {
        let home = std::env::var("HOME").map_err(|_| "failed to resolve HOME".to_string())?;
        return Ok(PathBuf::from(home));
    }
    if let Some(rest) = input.strip_prefix("~/") {
        let home = std::env::var("HOME").map_err(|_| "failed to resolve HOME".to_string())?;
        return Ok(PathBuf::from(home).join(rest));
    }
    Ok(Path::new(input).to_path_buf())
}
