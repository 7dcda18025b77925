//! `dagboard` command line: flag parsing, config resolution and mode
//! selection.

use std::io::Write;

use chrono::{DateTime, Utc};
use dagboard_core::sort::{SortKey, SortState};

use crate::actions::{ActionBackend, CommandActionBackend, DisabledActionBackend};
use crate::app::App;
use crate::config::{load_config, Config};
use crate::logging::{LogTarget, LoggingGuard};
use crate::render::{render_text, RenderOptions};
use crate::runtime::{refresh_app, Intervals};
use crate::source::{FileItemSource, ItemSource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Process-level effects the command needs, swappable in tests.
pub trait CliBackend {
    fn is_interactive(&self) -> bool;
    fn now(&self) -> DateTime<Utc>;
    fn init_logging(&self, config: &Config, target: LogTarget) -> Result<LoggingGuard, String>;
    fn run_interactive(
        &self,
        app: App,
        source: &dyn ItemSource,
        actions: &dyn ActionBackend,
        intervals: Intervals,
    ) -> Result<(), String>;
}

pub struct ProcessBackend;

impl CliBackend for ProcessBackend {
    fn is_interactive(&self) -> bool {
        use std::io::IsTerminal;
        std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn init_logging(&self, config: &Config, target: LogTarget) -> Result<LoggingGuard, String> {
        crate::logging::init(config, target)
    }

    fn run_interactive(
        &self,
        app: App,
        source: &dyn ItemSource,
        actions: &dyn ActionBackend,
        intervals: Intervals,
    ) -> Result<(), String> {
        crate::runtime::run(app, source, actions, intervals)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ParsedArgs {
    help: bool,
    config: Option<String>,
    items: Option<String>,
    scope: Option<String>,
    once: bool,
}

pub fn run_for_test(args: &[&str], backend: &dyn CliBackend) -> CommandOutput {
    let owned_args: Vec<String> = args.iter().map(|arg| (*arg).to_string()).collect();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let exit_code = run_with_backend(&owned_args, backend, &mut stdout, &mut stderr);
    let stdout = match String::from_utf8(stdout) {
        Ok(value) => value,
        Err(err) => panic!("stdout should be utf-8: {err}"),
    };
    let stderr = match String::from_utf8(stderr) {
        Ok(value) => value,
        Err(err) => panic!("stderr should be utf-8: {err}"),
    };
    CommandOutput {
        stdout,
        stderr,
        exit_code,
    }
}

pub fn run_with_backend(
    args: &[String],
    backend: &dyn CliBackend,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    match execute(args, backend, stdout) {
        Ok(()) => 0,
        Err(message) => {
            let _ = writeln!(stderr, "{message}");
            1
        }
    }
}

fn execute(args: &[String], backend: &dyn CliBackend, stdout: &mut dyn Write) -> Result<(), String> {
    let parsed = parse_args(args)?;
    if parsed.help {
        return write_help(stdout).map_err(|err| err.to_string());
    }

    let (mut cfg, _) = load_config(parsed.config.as_deref())?;
    if let Some(items) = parsed.items.as_deref().filter(|s| !s.trim().is_empty()) {
        cfg.source.items_path = Some(items.trim().into());
    }
    if let Some(scope) = parsed.scope {
        cfg.view.scope = scope.trim().to_string();
    }
    cfg.validate()?;

    let interactive = !parsed.once && backend.is_interactive();
    let target = if interactive {
        LogTarget::File
    } else {
        LogTarget::Stderr
    };
    let _guard = backend.init_logging(&cfg, target)?;

    let source = FileItemSource::new(cfg.items_path());
    let sort = SortState::new(vec![SortKey {
        column: cfg.view.sort_column,
        descending: cfg.view.sort_desc,
    }]);
    let mut app = App::new(&cfg.view.scope, sort, backend.now());
    tracing::info!(items = %source.describe(), interactive, "starting dagboard");

    if !interactive {
        refresh_app(&mut app, &source);
        if let Some(err) = app.load_error() {
            return Err(err.to_string());
        }
        app.tick(backend.now());
        stdout
            .write_all(render_text(&app, RenderOptions { interactive: false }).as_bytes())
            .map_err(|err| err.to_string())?;
        return Ok(());
    }

    let intervals = Intervals::from_millis(cfg.view.tick_interval_ms, cfg.source.refresh_interval_ms);
    if cfg.actions.command.is_empty() {
        backend.run_interactive(app, &source, &DisabledActionBackend, intervals)
    } else {
        let actions = CommandActionBackend::new(cfg.actions.command.clone(), cfg.actions.args.clone());
        backend.run_interactive(app, &source, &actions, intervals)
    }
}

fn parse_args(args: &[String]) -> Result<ParsedArgs, String> {
    let mut parsed = ParsedArgs::default();
    let mut idx = 0;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" | "help" => parsed.help = true,
            "--once" => parsed.once = true,
            flag @ ("--config" | "--items" | "--scope") => {
                let Some(value) = args.get(idx + 1) else {
                    return Err(format!("{flag} requires a value"));
                };
                let slot = match flag {
                    "--config" => &mut parsed.config,
                    "--items" => &mut parsed.items,
                    _ => &mut parsed.scope,
                };
                *slot = Some(value.clone());
                idx += 1;
            }
            other => return Err(format!("unexpected argument: {other}")),
        }
        idx += 1;
    }
    Ok(parsed)
}

fn write_help(stdout: &mut dyn Write) -> std::io::Result<()> {
    writeln!(stdout, "Live status overview of scheduled DAGs.")?;
    writeln!(stdout)?;
    writeln!(stdout, "Usage:")?;
    writeln!(stdout, "  dagboard [flags]")?;
    writeln!(stdout)?;
    writeln!(stdout, "Flags:")?;
    writeln!(stdout, "  --config PATH   Config file (default ~/.config/dagboard/config.yaml)")?;
    writeln!(stdout, "  --items PATH    DAG snapshot JSON (overrides source.items_path)")?;
    writeln!(stdout, "  --scope NAME    Group scope; ungrouped DAGs show only in the empty scope")?;
    writeln!(stdout, "  --once          Print one table and exit")?;
    writeln!(stdout, "  -h, --help      Show this help")?;
    Ok(())
}
