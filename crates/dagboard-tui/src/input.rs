//! Input events the app consumes, decoupled from crossterm's key model.

use crossterm::event::{Event as TerminalEvent, KeyCode as TerminalKeyCode, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    #[must_use]
    pub const fn none() -> Self {
        Self {
            shift: false,
            ctrl: false,
            alt: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    #[must_use]
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::none(),
        }
    }

    #[must_use]
    pub const fn ctrl(ch: char) -> Self {
        Self {
            key: Key::Char(ch),
            modifiers: Modifiers {
                shift: false,
                ctrl: true,
                alt: false,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize(ResizeEvent),
}

pub fn map_terminal_event(event: TerminalEvent) -> Option<InputEvent> {
    match event {
        TerminalEvent::Resize(width, height) => Some(InputEvent::Resize(ResizeEvent {
            width: usize::from(width),
            height: usize::from(height),
        })),
        TerminalEvent::Key(key_event) => {
            if !matches!(key_event.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                return None;
            }

            let key = match key_event.code {
                TerminalKeyCode::Char(ch) => Key::Char(ch),
                TerminalKeyCode::Enter => Key::Enter,
                TerminalKeyCode::Esc => Key::Escape,
                TerminalKeyCode::Tab | TerminalKeyCode::BackTab => Key::Tab,
                TerminalKeyCode::Backspace => Key::Backspace,
                TerminalKeyCode::Up => Key::Up,
                TerminalKeyCode::Down => Key::Down,
                TerminalKeyCode::Left => Key::Left,
                TerminalKeyCode::Right => Key::Right,
                _ => return None,
            };

            let mut modifiers = Modifiers {
                shift: key_event.modifiers.contains(KeyModifiers::SHIFT),
                ctrl: key_event.modifiers.contains(KeyModifiers::CONTROL),
                alt: key_event.modifiers.contains(KeyModifiers::ALT),
            };
            if matches!(key_event.code, TerminalKeyCode::BackTab) {
                modifiers.shift = true;
            }

            Some(InputEvent::Key(KeyEvent { key, modifiers }))
        }
        _ => None,
    }
}

pub fn is_interrupt(event: &InputEvent) -> bool {
    matches!(
        event,
        InputEvent::Key(KeyEvent {
            key: Key::Char('c'),
            modifiers: Modifiers { ctrl: true, .. },
        })
    )
}

#[cfg(test)]
mod tests {
    use crossterm::event::{
        Event as TerminalEvent, KeyCode, KeyEvent as TerminalKeyEvent, KeyEventKind,
        KeyModifiers,
    };

    use super::{is_interrupt, map_terminal_event, InputEvent, Key, KeyEvent, ResizeEvent};

    #[test]
    fn maps_press_and_ignores_release() {
        let press = TerminalEvent::Key(TerminalKeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE));
        assert_eq!(
            map_terminal_event(press),
            Some(InputEvent::Key(KeyEvent::plain(Key::Char('j'))))
        );

        let mut release = TerminalKeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE);
        release.kind = KeyEventKind::Release;
        assert_eq!(map_terminal_event(TerminalEvent::Key(release)), None);
    }

    #[test]
    fn maps_backtab_to_shift_tab_and_resize() {
        let back = TerminalEvent::Key(TerminalKeyEvent::new(KeyCode::BackTab, KeyModifiers::NONE));
        let Some(InputEvent::Key(event)) = map_terminal_event(back) else {
            panic!("expected key event");
        };
        assert_eq!(event.key, Key::Tab);
        assert!(event.modifiers.shift);

        assert_eq!(
            map_terminal_event(TerminalEvent::Resize(120, 40)),
            Some(InputEvent::Resize(ResizeEvent {
                width: 120,
                height: 40
            }))
        );
    }

    #[test]
    fn ctrl_c_is_interrupt() {
        let ctrl_c = TerminalEvent::Key(TerminalKeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        let mapped = map_terminal_event(ctrl_c);
        assert!(mapped.is_some_and(|event| is_interrupt(&event)));
        assert!(!is_interrupt(&InputEvent::Key(KeyEvent::plain(Key::Char('c')))));
    }
}
