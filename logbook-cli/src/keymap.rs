//! Key routing table.
//!
//! Every key press goes through [`route`], which maps it to an [`Action`] for
//! the current [`Mode`]. Keys a mode does not bind map to `None`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// The pager sticks to the bottom; manual scrolling is disabled.
    Follow,
    /// The search prompt has focus.
    SearchInput,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Normal => "NORMAL",
            Self::Follow => "FOLLOW",
            Self::SearchInput => "SEARCH",
        }
    }
}

/// Edits applied to the search prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEdit {
    Insert(char),
    Backspace,
    Delete,
    Left,
    Right,
    Home,
    End,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    ScrollUp,
    ScrollDown,
    HalfPageUp,
    HalfPageDown,
    PageUp,
    PageDown,
    ScrollTop,
    ScrollBottom,
    HalfPageLeft,
    HalfPageRight,

    NextWorkload,
    PrevWorkload,
    NextContainer,
    PrevContainer,

    ToggleFollow,
    StartSearch,
    NextMatch,
    PrevMatch,

    Edit(InputEdit),
    SubmitSearch,
    CancelSearch,

    Quit,
}

pub fn route(mode: Mode, key: &KeyEvent) -> Option<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match mode {
        Mode::Normal => route_normal(key.code, ctrl),
        Mode::Follow => route_follow(key.code, ctrl),
        Mode::SearchInput => route_search(key.code, ctrl),
    }
}

/// Bindings shared by the normal and follow modes.
fn route_common(code: KeyCode, ctrl: bool) -> Option<Action> {
    let action = match (code, ctrl) {
        (KeyCode::Char('n'), true) => Action::NextWorkload,
        (KeyCode::Char('p'), true) => Action::PrevWorkload,
        (KeyCode::Tab, false) => Action::NextContainer,
        (KeyCode::BackTab, _) => Action::PrevContainer,
        (KeyCode::Char('f'), false) => Action::ToggleFollow,
        (KeyCode::Char('q'), false) => Action::Quit,
        _ => return None,
    };
    Some(action)
}

fn route_normal(code: KeyCode, ctrl: bool) -> Option<Action> {
    if let Some(action) = route_common(code, ctrl) {
        return Some(action);
    }

    let action = match (code, ctrl) {
        (KeyCode::Char('j') | KeyCode::Down, false) => Action::ScrollDown,
        (KeyCode::Char('k') | KeyCode::Up, false) => Action::ScrollUp,
        (KeyCode::Char('d'), true) => Action::HalfPageDown,
        (KeyCode::Char('u'), true) => Action::HalfPageUp,
        (KeyCode::Char('f'), true) | (KeyCode::PageDown, _) => Action::PageDown,
        (KeyCode::Char('b'), true) | (KeyCode::PageUp, _) => Action::PageUp,
        (KeyCode::Char('g') | KeyCode::Home, false) => Action::ScrollTop,
        (KeyCode::Char('G') | KeyCode::End, false) => Action::ScrollBottom,
        (KeyCode::Char('h') | KeyCode::Left, false) => Action::HalfPageLeft,
        (KeyCode::Char('l') | KeyCode::Right, false) => Action::HalfPageRight,
        (KeyCode::Char('/'), false) => Action::StartSearch,
        (KeyCode::Char('n'), false) => Action::NextMatch,
        (KeyCode::Char('N'), false) => Action::PrevMatch,
        _ => return None,
    };
    Some(action)
}

fn route_follow(code: KeyCode, ctrl: bool) -> Option<Action> {
    route_common(code, ctrl)
}

fn route_search(code: KeyCode, ctrl: bool) -> Option<Action> {
    let action = match (code, ctrl) {
        (KeyCode::Enter, _) => Action::SubmitSearch,
        (KeyCode::Esc, _) => Action::CancelSearch,
        (KeyCode::Backspace, _) | (KeyCode::Char('h'), true) => Action::Edit(InputEdit::Backspace),
        (KeyCode::Delete, _) | (KeyCode::Char('d'), true) => Action::Edit(InputEdit::Delete),
        (KeyCode::Left, _) | (KeyCode::Char('b'), true) => Action::Edit(InputEdit::Left),
        (KeyCode::Right, _) | (KeyCode::Char('f'), true) => Action::Edit(InputEdit::Right),
        (KeyCode::Home, _) | (KeyCode::Char('a'), true) => Action::Edit(InputEdit::Home),
        (KeyCode::End, _) | (KeyCode::Char('e'), true) => Action::Edit(InputEdit::End),
        (KeyCode::Char(c), false) => Action::Edit(InputEdit::Insert(c)),
        _ => return None,
    };
    Some(action)
}
