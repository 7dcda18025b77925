//! Interactive event loop: input, countdown ticks and refresh deadlines on a
//! single-threaded tokio runtime.

use std::io::{self, Write};
use std::time::Duration;

use chrono::Utc;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event;
use crossterm::execute;
use crossterm::style::{Attribute, SetAttribute};
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::actions::ActionBackend;
use crate::app::{App, Command};
use crate::input::{map_terminal_event, InputEvent, ResizeEvent};
use crate::render::{render_lines, IncrementalRenderEngine, RenderOptions};
use crate::source::ItemSource;
use crate::ticker::spawn_ticker;

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub tick: Duration,
    pub refresh: Duration,
}

impl Intervals {
    pub fn from_millis(tick_ms: u64, refresh_ms: u64) -> Self {
        Self {
            tick: Duration::from_millis(tick_ms.max(1)),
            refresh: Duration::from_millis(refresh_ms.max(1)),
        }
    }
}

/// Load a fresh snapshot into `app`. Failures keep the previous rows.
pub fn refresh_app(app: &mut App, source: &dyn ItemSource) {
    match source.load() {
        Ok(snapshot) => {
            tracing::debug!(source = %source.describe(), dags = snapshot.dags.len(), "refreshed");
            app.set_snapshot(snapshot, Utc::now());
        }
        Err(err) => app.set_load_error(err.to_string()),
    }
}

/// Execute a command from `App::update`, following up until it settles.
pub fn dispatch_command(
    command: Command,
    app: &mut App,
    source: &dyn ItemSource,
    actions: &dyn ActionBackend,
) {
    let mut next = command;
    loop {
        next = match next {
            Command::None | Command::Quit => return,
            Command::Refresh => {
                refresh_app(app, source);
                return;
            }
            Command::RunAction { kind, dag } => {
                let result = actions.run(kind, &dag);
                app.action_result(result)
            }
        };
    }
}

pub fn run(
    mut app: App,
    source: &dyn ItemSource,
    actions: &dyn ActionBackend,
    intervals: Intervals,
) -> Result<(), String> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(|err| format!("build runtime: {err}"))?;

    let mut session =
        TerminalSession::enter().map_err(|err| format!("enter tui terminal mode: {err}"))?;
    let (width, height) = terminal::size().map_err(|err| format!("read terminal size: {err}"))?;
    let _ = app.update(InputEvent::Resize(ResizeEvent {
        width: usize::from(width),
        height: usize::from(height),
    }));

    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let reader = std::thread::Builder::new()
        .name("dagboard-input".to_string())
        .spawn(move || read_terminal_input(input_tx))
        .map_err(|err| format!("spawn input reader: {err}"))?;

    let result = runtime.block_on(drive(
        &mut app,
        source,
        actions,
        intervals,
        input_rx,
        &mut session.stdout,
    ));
    drop(session);
    // The reader notices the closed channel on its next poll timeout.
    let _ = reader.join();
    result
}

fn read_terminal_input(tx: mpsc::UnboundedSender<InputEvent>) {
    while !tx.is_closed() {
        match event::poll(INPUT_POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(err) => {
                tracing::warn!(error = %err, "poll terminal event");
                break;
            }
        }
        let terminal_event = match event::read() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "read terminal event");
                break;
            }
        };
        if let Some(input) = map_terminal_event(terminal_event) {
            if tx.send(input).is_err() {
                break;
            }
        }
    }
}

/// Event loop over an input channel and an output writer. Returns when the app
/// quits or the input channel closes.
pub async fn drive<W: Write>(
    app: &mut App,
    source: &dyn ItemSource,
    actions: &dyn ActionBackend,
    intervals: Intervals,
    mut input_rx: mpsc::UnboundedReceiver<InputEvent>,
    out: &mut W,
) -> Result<(), String> {
    let (ticker, mut ticks) = spawn_ticker(intervals.tick);
    let mut refresh = tokio::time::interval(intervals.refresh);
    refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
    refresh.tick().await;
    refresh_app(app, source);

    let mut renderer = IncrementalRenderEngine::default();
    let options = RenderOptions { interactive: true };
    let mut dirty = true;

    loop {
        if dirty {
            renderer
                .repaint(&mut *out, &render_lines(app, options))
                .map_err(|err| format!("render frame: {err}"))?;
            dirty = false;
        }
        if app.quitting() {
            break;
        }

        tokio::select! {
            biased;
            input = input_rx.recv() => {
                let Some(input) = input else {
                    break;
                };
                if matches!(input, InputEvent::Resize(_)) {
                    renderer.invalidate();
                    write!(out, "\x1b[2J").map_err(|err| format!("clear screen: {err}"))?;
                }
                let command = app.update(input);
                dispatch_command(command, app, source, actions);
                dirty = true;
            }
            tick = ticks.recv() => {
                if tick.is_none() {
                    break;
                }
                app.tick(Utc::now());
                dirty = true;
            }
            _ = refresh.tick() => {
                refresh_app(app, source);
                dirty = true;
            }
        }
    }

    ticker.shutdown().await;
    tracing::info!("interactive session ended");
    Ok(())
}

struct TerminalSession {
    stdout: io::Stdout,
}

impl TerminalSession {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(
            stdout,
            EnterAlternateScreen,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        Ok(Self { stdout })
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = execute!(
            self.stdout,
            SetAttribute(Attribute::Reset),
            LeaveAlternateScreen,
            Show,
            MoveTo(0, 0)
        );
        let _ = terminal::disable_raw_mode();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use dagboard_core::model::{DagLeaf, ItemSnapshot};
    use dagboard_core::sort::SortState;

    use super::{dispatch_command, refresh_app, Intervals};
    use crate::actions::{ActionKind, DisabledActionBackend};
    use crate::app::{App, Command};
    use crate::source::InMemoryItemSource;

    #[test]
    fn intervals_are_never_zero() {
        let intervals = Intervals::from_millis(0, 0);
        assert!(!intervals.tick.is_zero());
        assert!(!intervals.refresh.is_zero());
    }

    #[test]
    fn refresh_failure_keeps_previous_rows() {
        let source = InMemoryItemSource::new(ItemSnapshot::new(vec![DagLeaf::new("a")]));
        let mut app = App::new("", SortState::default(), Utc::now());
        refresh_app(&mut app, &source);
        assert_eq!(app.view().len(), 1);

        source.set(None);
        refresh_app(&mut app, &source);
        assert_eq!(app.view().len(), 1);
        assert_eq!(app.load_error(), Some("item source unavailable"));
    }

    #[test]
    fn failed_action_does_not_refresh() {
        let source = InMemoryItemSource::new(ItemSnapshot::new(vec![DagLeaf::new("a")]));
        let mut app = App::new("", SortState::default(), Utc::now());
        dispatch_command(
            Command::RunAction {
                kind: ActionKind::Start,
                dag: DagLeaf::new("a"),
            },
            &mut app,
            &source,
            &DisabledActionBackend,
        );
        assert!(app.view().is_empty());
        assert!(app.status_line().starts_with("error: actions are disabled"));
    }
}
