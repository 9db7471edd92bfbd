use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    Quit,
    TogglePause,
    Step,
    ToggleTrails,
    ToggleLabels,
    SpeedUp,
    SpeedDown,
    PerBodySpeed,
    Grow,
    Shrink,
    TiltUp,
    TiltDown,
    TurnLeft,
    TurnRight,
    ToggleSpin,
    Reset,
}

pub(crate) fn collect_input_nonblocking(max_wait: Duration) -> anyhow::Result<Vec<KeyEvent>> {
    let mut out = Vec::new();
    let timeout = std::cmp::min(Duration::from_millis(1), max_wait);
    while event::poll(timeout)? {
        if let Event::Key(k) = event::read()? {
            if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat {
                out.push(k);
                if out.len() >= 32 {
                    break;
                }
            }
        }
    }
    Ok(out)
}

pub(crate) fn map_key(k: KeyEvent) -> Option<Action> {
    if k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c')) {
        return Some(Action::Quit);
    }
    let action = match k.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char(' ') | KeyCode::Char('p') | KeyCode::Char('P') => Action::TogglePause,
        KeyCode::Char('.') => Action::Step,
        KeyCode::Char('t') | KeyCode::Char('T') => Action::ToggleTrails,
        KeyCode::Char('l') | KeyCode::Char('L') => Action::ToggleLabels,
        KeyCode::Char('+') | KeyCode::Char('=') => Action::SpeedUp,
        KeyCode::Char('-') | KeyCode::Char('_') => Action::SpeedDown,
        KeyCode::Char('0') => Action::PerBodySpeed,
        KeyCode::Char(']') => Action::Grow,
        KeyCode::Char('[') => Action::Shrink,
        KeyCode::Up => Action::TiltUp,
        KeyCode::Down => Action::TiltDown,
        KeyCode::Left => Action::TurnLeft,
        KeyCode::Right => Action::TurnRight,
        KeyCode::Char('c') | KeyCode::Char('C') => Action::ToggleSpin,
        KeyCode::Char('r') | KeyCode::Char('R') => Action::Reset,
        _ => return None,
    };
    Some(action)
}
