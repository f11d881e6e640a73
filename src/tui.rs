//! Interactive selection loop.
//!
//! `ViewState` holds everything the loop mutates and is driven one
//! `Command` at a time; it never touches the terminal. `run_interactive`
//! owns the terminal through a `TerminalSession` guard, feeds key events
//! into the state and redraws after each one.

use crate::render::{render_groups, viewport_height, RenderOptions};
use crate::render_rows::{
    build_rows, clamp_cursor, is_cursor_visible, repo_row_index, step_down, step_up,
};
use crate::render_selection::{select_all, select_none, toggle};
use crate::tui_keys::{dispatch, Command, Mode};
use crate::types::{RepoGroup, Row};
use anyhow::{Context, Result};
use colored::Colorize;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::{cursor, execute, terminal};
use std::io::{self, Write};
use tracing::debug;

const FALLBACK_SIZE: (u16, u16) = (80, 40);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Confirm,
    Quit,
}

// ── State ───────────────────────────────────────────────────

pub struct ViewState {
    groups: Vec<RepoGroup>,
    query: String,
    org: String,
    cursor: usize,
    scroll_offset: usize,
    filter_path: String,
    filter_mode: bool,
    filter_input: String,
    show_help: bool,
    term_width: usize,
    term_height: usize,
}

impl ViewState {
    pub fn new(groups: Vec<RepoGroup>, query: &str, org: &str, size: (u16, u16)) -> Self {
        let mut state = Self {
            groups,
            query: query.to_string(),
            org: org.to_string(),
            cursor: 0,
            scroll_offset: 0,
            filter_path: String::new(),
            filter_mode: false,
            filter_input: String::new(),
            show_help: false,
            term_width: usize::from(size.0),
            term_height: usize::from(size.1),
        };
        let rows = state.rows();
        state.settle(&rows, false);
        state
    }

    pub fn mode(&self) -> Mode {
        if self.show_help {
            Mode::Help
        } else if self.filter_mode {
            Mode::Filter
        } else {
            Mode::Normal
        }
    }

    /// Draft while editing, confirmed filter otherwise.
    fn active_filter(&self) -> &str {
        if self.filter_mode {
            &self.filter_input
        } else {
            &self.filter_path
        }
    }

    pub fn rows(&self) -> Vec<Row> {
        build_rows(&self.groups, self.active_filter())
    }

    fn viewport(&self) -> usize {
        viewport_height(
            self.term_height,
            self.filter_mode || !self.filter_path.is_empty(),
        )
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    pub fn groups(&self) -> &[RepoGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<RepoGroup> {
        self.groups
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.term_width = usize::from(width);
        self.term_height = usize::from(height);
        let rows = self.rows();
        self.settle(&rows, false);
    }

    /// Clamp cursor and scroll against `rows`, then scroll just far enough
    /// for the cursor row to be drawn in full. With `reveal_section`, a
    /// section header directly above the cursor is scrolled into view too
    /// when it fits.
    fn settle(&mut self, rows: &[Row], reveal_section: bool) {
        self.cursor = clamp_cursor(rows, self.cursor);
        let viewport = self.viewport();

        if self.cursor < self.scroll_offset {
            self.scroll_offset = self.cursor;
        }
        if reveal_section && self.cursor > 0 && self.scroll_offset == self.cursor {
            let above = self.cursor - 1;
            if rows[above].is_section()
                && is_cursor_visible(rows, &self.groups, self.cursor, above, viewport)
            {
                self.scroll_offset = above;
            }
        }
        while self.scroll_offset < self.cursor
            && !is_cursor_visible(rows, &self.groups, self.cursor, self.scroll_offset, viewport)
        {
            self.scroll_offset += 1;
        }
    }

    pub fn handle_key(&mut self, key: &KeyEvent) -> Flow {
        self.apply(dispatch(self.mode(), key))
    }

    pub fn apply(&mut self, command: Command) -> Flow {
        let rows = self.rows();
        let current = rows.get(self.cursor).cloned();
        let mut reveal_section = false;

        match command {
            Command::Quit => return Flow::Quit,
            Command::Confirm => return Flow::Confirm,
            Command::Ignore => {}
            Command::Up => {
                self.cursor = step_up(&rows, self.cursor);
                reveal_section = true;
            }
            Command::Down => self.cursor = step_down(&rows, self.cursor),
            Command::Fold => match current {
                Some(Row::Repo { repo }) => self.set_folded(repo, true),
                Some(Row::Extract { repo, .. }) => {
                    self.set_folded(repo, true);
                    let rows = self.rows();
                    if let Some(i) = repo_row_index(&rows, repo) {
                        self.cursor = i;
                    }
                }
                _ => {}
            },
            Command::Unfold => {
                if let Some(Row::Repo { repo }) = current {
                    self.set_folded(repo, false);
                }
            }
            Command::Toggle => {
                if let Some(row) = &current {
                    toggle(&mut self.groups, row);
                }
            }
            Command::SelectAll => {
                if let Some(row) = &current {
                    select_all(&mut self.groups, row, &self.filter_path);
                }
            }
            Command::SelectNone => {
                if let Some(row) = &current {
                    select_none(&mut self.groups, row, &self.filter_path);
                }
            }
            Command::EnterFilter => {
                self.filter_mode = true;
                self.filter_input = self.filter_path.clone();
            }
            Command::ResetFilter => {
                self.filter_path.clear();
                self.filter_input.clear();
                self.filter_mode = false;
            }
            Command::ToggleHelp => self.show_help = !self.show_help,
            Command::FilterChar(c) => self.filter_input.push(c),
            Command::FilterBackspace => {
                self.filter_input.pop();
            }
            Command::FilterConfirm => {
                self.filter_path = std::mem::take(&mut self.filter_input);
                self.filter_mode = false;
            }
            Command::FilterCancel => {
                self.filter_input.clear();
                self.filter_mode = false;
            }
        }

        let rows = self.rows();
        self.settle(&rows, reveal_section);
        Flow::Continue
    }

    fn set_folded(&mut self, repo: usize, folded: bool) {
        if let Some(group) = self.groups.get_mut(repo) {
            group.folded = folded;
        }
    }

    /// Full screen text for the current state.
    pub fn frame(&self) -> String {
        let rows = self.rows();
        let opts = RenderOptions {
            query: &self.query,
            org: &self.org,
            filter_path: &self.filter_path,
            filter_mode: self.filter_mode,
            filter_input: &self.filter_input,
            show_help: self.show_help,
            term_width: self.term_width,
        };
        render_groups(
            &self.groups,
            self.cursor,
            &rows,
            self.term_height,
            self.scroll_offset,
            &opts,
        )
    }
}

// ── Terminal ────────────────────────────────────────────────

/// Raw-mode terminal held for the duration of the loop. Dropping it
/// restores cooked mode and the cursor on every exit path.
pub struct TerminalSession;

impl TerminalSession {
    pub fn start() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw mode")?;
        let session = TerminalSession;
        execute!(io::stdout(), cursor::Hide).context("failed to hide cursor")?;
        Ok(session)
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let mut out = io::stdout();
        let _ = write!(out, "{}", CLEAR_SCREEN);
        let _ = execute!(out, cursor::Show);
    }
}

fn draw(out: &mut impl Write, view: &ViewState) -> Result<()> {
    // raw mode disables output post-processing, so lines need explicit CR
    let frame = view.frame().replace('\n', "\r\n");
    write!(out, "{}{}", CLEAR_SCREEN, frame).context("failed to write frame")?;
    out.flush().context("failed to flush terminal")
}

/// Notice printed instead of opening the UI when there is nothing to pick.
pub fn empty_notice(groups: &[RepoGroup]) -> Option<String> {
    groups
        .is_empty()
        .then(|| "No results found.".yellow().to_string())
}

/// Run the selection loop. Returns the groups on confirm, `None` on quit.
pub fn run_interactive(groups: Vec<RepoGroup>, query: &str, org: &str) -> Result<Option<Vec<RepoGroup>>> {
    if let Some(notice) = empty_notice(&groups) {
        println!("{}", notice);
        return Ok(None);
    }

    let size = terminal::size().unwrap_or(FALLBACK_SIZE);
    let mut view = ViewState::new(groups, query, org, size);
    let session = TerminalSession::start()?;
    let mut out = io::stdout();
    draw(&mut out, &view)?;

    let flow = loop {
        match event::read().context("failed to read terminal event")? {
            Event::Key(key) if key.kind != KeyEventKind::Release => match view.handle_key(&key) {
                Flow::Continue => {}
                done => break done,
            },
            Event::Resize(width, height) => view.resize(width, height),
            _ => continue,
        }
        draw(&mut out, &view)?;
    };
    drop(session);

    debug!(?flow, "interactive session ended");
    Ok((flow == Flow::Confirm).then(|| view.into_groups()))
}
