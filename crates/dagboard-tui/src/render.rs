//! Text rendering of the table and the incremental terminal repaint.

use std::io::Write;

use dagboard_core::column::ColumnId;
use dagboard_core::model::Row;
use dagboard_core::table::DisplayRow;
use tabwriter::TabWriter;

use crate::app::{App, UiMode};

const KEY_HINTS: &str =
    "j/k move  enter toggle  e all  / filter  t/T tag  c clear  1-8 sort  r refresh  s start  x stop  l live  q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Mark the selected row and show the key hints.
    pub interactive: bool,
}

/// Full screen as lines: title, error banner, table, footer.
pub fn render_lines(app: &App, options: RenderOptions) -> Vec<String> {
    let mut lines = vec![title_line(app)];
    lines.extend(error_banner(app));
    lines.extend(table_lines(app, options));

    if options.interactive {
        lines.push(String::new());
        lines.push(footer_line(app));
    }

    let (width, _) = app.size();
    if width > 0 {
        for line in &mut lines {
            truncate_to_width(line, width);
        }
    }
    lines
}

pub fn render_text(app: &App, options: RenderOptions) -> String {
    let mut out = render_lines(app, options).join("\n");
    out.push('\n');
    out
}

fn title_line(app: &App) -> String {
    let view = app.view();
    let sort = match view.sort() {
        Some(key) if key.descending => format!("{} desc", key.column),
        Some(key) => format!("{} asc", key.column),
        None => "none".to_string(),
    };
    let mut title = format!("DAGs  sort: {sort}");
    let scope = &app.state().scope;
    if !scope.is_empty() {
        title.push_str(&format!("  scope: {scope}"));
    }
    for (column, value) in view.filters() {
        let label = match column {
            ColumnId::Name => "name".to_string(),
            ColumnId::Tags => "tag".to_string(),
            other => other.as_str().to_ascii_lowercase(),
        };
        title.push_str(&format!("  {label}: {value}"));
    }
    title.push_str(&format!("  rows: {}", view.len()));
    title
}

fn error_banner(app: &App) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(err) = app.load_error() {
        lines.push(format!("! refresh failed: {err}"));
    }
    let snapshot = app.snapshot();
    if snapshot.has_error() {
        let broken = snapshot.dags.iter().filter(|dag| dag.error.is_some()).count();
        let total = snapshot.errors.len() + broken;
        lines.push(format!("! {total} DAG load error(s)"));
        for err in &snapshot.errors {
            lines.push(format!("!   {err}"));
        }
    }
    lines
}

fn table_lines(app: &App, options: RenderOptions) -> Vec<String> {
    let view = app.view();
    let model = app.model();
    let mut tw = TabWriter::new(Vec::new()).padding(2);

    let all_marker = if view.all_expanded() { "[-]" } else { "[+]" };
    let header: Vec<&str> = model
        .columns()
        .iter()
        .map(|column| match column.id {
            ColumnId::Expand => all_marker,
            _ => column.header,
        })
        .collect();
    let _ = writeln!(tw, "  {}", header.join("\t"));

    for (idx, display) in view.rows().iter().enumerate() {
        let cursor = if options.interactive && idx == app.selected_idx() {
            "> "
        } else {
            "  "
        };
        let mut cells = view.cells(display, model);
        if let Some(expand) = cells.first_mut() {
            *expand = expand_marker(display);
        }
        if let Some(name) = cells.get_mut(1) {
            if display.depth > 0 {
                name.insert_str(0, &"  ".repeat(display.depth));
            }
        }
        let _ = writeln!(tw, "{cursor}{}", cells.join("\t"));
    }

    let bytes = tw.into_inner().unwrap_or_default();
    let text = String::from_utf8_lossy(&bytes);
    let mut lines: Vec<String> = text.lines().map(|line| line.trim_end().to_string()).collect();
    if view.is_empty() {
        lines.push("  (no DAGs match)".to_string());
    }
    lines
}

fn expand_marker(display: &DisplayRow) -> String {
    match &display.row {
        Row::Group(group) if display.expanded => format!("[-] {}", group.children.len()),
        Row::Group(group) => format!("[+] {}", group.children.len()),
        Row::Leaf(_) => String::new(),
    }
}

fn footer_line(app: &App) -> String {
    match app.mode() {
        UiMode::Filter => format!("filter: {}_  (enter/esc done)", app.filter_text()),
        UiMode::Main if !app.status_line().is_empty() => {
            format!("{}  |  {KEY_HINTS}", app.status_line())
        }
        UiMode::Main => KEY_HINTS.to_string(),
    }
}

fn truncate_to_width(line: &mut String, width: usize) {
    if let Some((idx, _)) = line.char_indices().nth(width) {
        line.truncate(idx);
    }
}

/// Repaints only the lines that changed since the previous frame.
#[derive(Debug, Default)]
pub struct IncrementalRenderEngine {
    previous_lines: Vec<String>,
}

impl IncrementalRenderEngine {
    pub fn repaint<W: Write>(&mut self, mut out: W, next_lines: &[String]) -> std::io::Result<()> {
        let plan = plan_render_diff(&self.previous_lines, next_lines);
        if plan.is_noop() {
            return Ok(());
        }

        for row in plan.changed_rows {
            let line = next_lines.get(row - 1).map_or("", String::as_str);
            write!(out, "\x1b[{row};1H\x1b[2K{line}")?;
        }

        if let Some(start_row) = plan.clear_start_row {
            for row in start_row..=plan.clear_end_row {
                write!(out, "\x1b[{row};1H\x1b[2K")?;
            }
        }

        write!(out, "\x1b[{};1H", next_lines.len().saturating_add(1))?;
        out.flush()?;
        self.previous_lines = next_lines.to_vec();
        Ok(())
    }

    /// Forget the previous frame so the next repaint draws everything.
    pub fn invalidate(&mut self) {
        self.previous_lines.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderDiffPlan {
    changed_rows: Vec<usize>,
    clear_start_row: Option<usize>,
    clear_end_row: usize,
}

impl RenderDiffPlan {
    fn is_noop(&self) -> bool {
        self.changed_rows.is_empty() && self.clear_start_row.is_none()
    }
}

fn plan_render_diff(previous: &[String], next: &[String]) -> RenderDiffPlan {
    let shared = previous.len().min(next.len());
    let mut changed_rows: Vec<usize> = (0..shared)
        .filter(|&idx| previous[idx] != next[idx])
        .map(|idx| idx + 1)
        .collect();
    if next.len() > shared {
        changed_rows.extend((shared + 1)..=next.len());
    }

    let clear_start_row = (next.len() < previous.len()).then_some(next.len() + 1);

    RenderDiffPlan {
        changed_rows,
        clear_start_row,
        clear_end_row: previous.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use dagboard_core::model::{DagLeaf, ItemSnapshot};
    use dagboard_core::sort::SortState;

    use super::{plan_render_diff, render_lines, IncrementalRenderEngine, RenderOptions};
    use crate::app::App;
    use crate::input::{InputEvent, Key, KeyEvent, ResizeEvent};

    fn lines<const N: usize>(items: [&str; N]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn app() -> App {
        let now = Utc.with_ymd_and_hms(2026, 2, 10, 12, 0, 0).unwrap();
        let mut app = App::new("", SortState::default(), now);
        let mut child = DagLeaf::new("ingest");
        child.group_key = "etl".to_string();
        child.tags = vec!["daily".to_string()];
        let mut broken = DagLeaf::new("broken");
        broken.error = Some("bad yaml".to_string());
        app.set_snapshot(ItemSnapshot::new(vec![child, broken]), now);
        app
    }

    #[test]
    fn table_has_header_markers_and_indent() {
        let app = app();
        let out = render_lines(&app, RenderOptions { interactive: true });
        assert!(out[0].starts_with("DAGs  sort: Name asc"));
        assert_eq!(out[1], "! 1 DAG load error(s)");
        assert!(out[2].contains("Name"));
        assert!(out[2].contains("Next Run"));
        assert!(out[2].starts_with("  [-]"));
        assert!(out[3].starts_with("> "));
        assert!(out[3].contains("broken"));
        assert!(out[3].contains("error: bad yaml"));
        assert!(out[4].contains("[-] 1"));
        assert!(out[5].contains("  ingest"));
        assert!(out.last().unwrap().contains("q quit"));
    }

    #[test]
    fn header_marker_follows_global_expansion() {
        let mut app = app();
        app.update(InputEvent::Key(KeyEvent::plain(Key::Char('e'))));
        let out = render_lines(&app, RenderOptions { interactive: false });
        assert!(out[2].starts_with("  [+]"));
        assert!(out[4].contains("[+] 1"));
    }

    #[test]
    fn snapshot_mode_has_no_cursor_or_footer() {
        let app = app();
        let out = render_lines(&app, RenderOptions { interactive: false });
        assert!(out.iter().all(|line| !line.starts_with("> ")));
        assert!(out.iter().all(|line| !line.contains("q quit")));
    }

    #[test]
    fn lines_are_cut_to_terminal_width() {
        let mut app = app();
        app.update(InputEvent::Resize(ResizeEvent {
            width: 20,
            height: 10,
        }));
        let out = render_lines(&app, RenderOptions { interactive: true });
        assert!(out.iter().all(|line| line.chars().count() <= 20));
        app.update(InputEvent::Key(KeyEvent::plain(Key::Char('/'))));
        let out = render_lines(&app, RenderOptions { interactive: true });
        assert!(out.last().unwrap().starts_with("filter: _"));
    }

    #[test]
    fn diff_plan_tracks_changed_and_removed_rows() {
        let plan = plan_render_diff(&lines(["a", "b", "c"]), &lines(["a", "B"]));
        assert_eq!(plan.changed_rows, vec![2]);
        assert_eq!(plan.clear_start_row, Some(3));
        assert_eq!(plan.clear_end_row, 3);
        assert!(plan_render_diff(&lines(["a"]), &lines(["a"])).is_noop());
    }

    #[test]
    fn incremental_repaint_skips_identical_frames() {
        let mut engine = IncrementalRenderEngine::default();
        let frame = lines(["row-1", "row-2"]);

        let mut first = Vec::new();
        engine.repaint(&mut first, &frame).unwrap();
        assert!(!first.is_empty());

        let mut second = Vec::new();
        engine.repaint(&mut second, &frame).unwrap();
        assert!(second.is_empty());

        engine.invalidate();
        let mut third = Vec::new();
        engine.repaint(&mut third, &frame).unwrap();
        let ansi = String::from_utf8(third).unwrap();
        assert!(ansi.contains("\x1b[1;1H\x1b[2Krow-1"));
    }
}
