//! Keyboard bindings.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use robolog_core::OverlayKind;

/// Something the user asked the viewer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    TogglePlay,
    /// Move the cursor by a number of samples
    Step(isize),
    /// Move the cursor by a percentage of the log
    Jump(i32),
    Home,
    End,
    SwitchFocus,
    SelectPrev,
    SelectNext,
    ToggleCurve,
    NewTab,
    CloseTab,
    PrevTab,
    NextTab,
    RenameTab,
    /// Show or hide the selected signal in the 3D view
    ToggleOverlay(OverlayKind),
    UseAsBasePosition,
    UseAsBaseOrientation,
    OpenPrompt,
    SaveSnapshot,
    Quit,
    // text prompt
    PromptInput(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,
}

/// Cursor jump of PageUp / PageDown, in percent of the log.
pub const PAGE_JUMP: i32 = 10;

/// Maps a key press to an action. `prompt` is true while a text prompt is shown.
pub fn map_key(key: KeyEvent, prompt: bool) -> Option<Action> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if prompt {
        return match key.code {
            KeyCode::Enter => Some(Action::PromptSubmit),
            KeyCode::Esc => Some(Action::PromptCancel),
            KeyCode::Backspace => Some(Action::PromptBackspace),
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::PromptInput(c)),
            _ => None,
        };
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('f') => Some(Action::Step(1)),
            KeyCode::Char('b') => Some(Action::Step(-1)),
            KeyCode::Char('c') => Some(Action::Quit),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Char(' ') => Action::TogglePlay,
        KeyCode::Right => Action::Step(1),
        KeyCode::Left => Action::Step(-1),
        KeyCode::PageUp => Action::Jump(PAGE_JUMP),
        KeyCode::PageDown => Action::Jump(-PAGE_JUMP),
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::Tab | KeyCode::BackTab => Action::SwitchFocus,
        KeyCode::Up => Action::SelectPrev,
        KeyCode::Down => Action::SelectNext,
        KeyCode::Enter => Action::ToggleCurve,
        KeyCode::Char('n') => Action::NewTab,
        KeyCode::Char('x') => Action::CloseTab,
        KeyCode::Char('[') => Action::PrevTab,
        KeyCode::Char(']') => Action::NextTab,
        KeyCode::Char('e') => Action::RenameTab,
        KeyCode::Char('p') => Action::ToggleOverlay(OverlayKind::Point),
        KeyCode::Char('t') => Action::ToggleOverlay(OverlayKind::Trajectory),
        KeyCode::Char('a') => Action::ToggleOverlay(OverlayKind::Arrow),
        KeyCode::Char('b') => Action::UseAsBasePosition,
        KeyCode::Char('r') => Action::UseAsBaseOrientation,
        KeyCode::Char('o') => Action::OpenPrompt,
        KeyCode::Char('s') => Action::SaveSnapshot,
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => return None,
    };
    Some(action)
}

/// One line of key help for the footer.
pub const HELP: &str = "space play/pause  ←/→ step  PgUp/PgDn ±10%  tab focus  enter plot  n/x tab  e rename  [/] switch  p/t/a overlay  b/r base  o open  s save  q quit";
