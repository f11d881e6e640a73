//! Key dispatch for the interactive view. Each mode has its own table, so a
//! key that is not listed in a mode simply has no effect there.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// One user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Up,
    Down,
    Fold,
    Unfold,
    Toggle,
    SelectAll,
    SelectNone,
    EnterFilter,
    ResetFilter,
    ToggleHelp,
    Confirm,
    Quit,
    FilterChar(char),
    FilterBackspace,
    FilterConfirm,
    FilterCancel,
    Ignore,
}

/// Which dispatch table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Filter,
    Help,
}

fn is_ctrl_c(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Plain character without Ctrl/Alt (Shift is allowed for `?` and capitals).
fn plain_char(key: &KeyEvent) -> Option<char> {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            Some(c)
        }
        _ => None,
    }
}

pub fn dispatch(mode: Mode, key: &KeyEvent) -> Command {
    match mode {
        Mode::Normal => normal_command(key),
        Mode::Filter => filter_command(key),
        Mode::Help => help_command(key),
    }
}

pub fn normal_command(key: &KeyEvent) -> Command {
    if is_ctrl_c(key) {
        return Command::Quit;
    }
    match key.code {
        KeyCode::Up => return Command::Up,
        KeyCode::Down => return Command::Down,
        KeyCode::Left => return Command::Fold,
        KeyCode::Right => return Command::Unfold,
        KeyCode::Enter => return Command::Confirm,
        _ => {}
    }
    match plain_char(key) {
        Some('k') => Command::Up,
        Some('j') => Command::Down,
        Some(' ') => Command::Toggle,
        Some('a') => Command::SelectAll,
        Some('n') => Command::SelectNone,
        Some('f') => Command::EnterFilter,
        Some('r') => Command::ResetFilter,
        Some('h') | Some('?') => Command::ToggleHelp,
        Some('q') => Command::Quit,
        _ => Command::Ignore,
    }
}

pub fn filter_command(key: &KeyEvent) -> Command {
    if is_ctrl_c(key) {
        return Command::Quit;
    }
    match key.code {
        KeyCode::Esc => Command::FilterCancel,
        KeyCode::Enter => Command::FilterConfirm,
        KeyCode::Backspace => Command::FilterBackspace,
        _ => match plain_char(key) {
            Some(c) if !c.is_control() => Command::FilterChar(c),
            _ => Command::Ignore,
        },
    }
}

pub fn help_command(key: &KeyEvent) -> Command {
    if is_ctrl_c(key) {
        return Command::Quit;
    }
    match key.code {
        KeyCode::Enter | KeyCode::Esc => return Command::ToggleHelp,
        _ => {}
    }
    match plain_char(key) {
        Some('h') | Some('?') => Command::ToggleHelp,
        Some('q') => Command::Quit,
        _ => Command::Ignore,
    }
}
