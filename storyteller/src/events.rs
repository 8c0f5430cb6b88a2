//! Event handling for the reader TUI

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};

use crate::app::{App, Screen};
use crate::ui::Overlay;

/// Result of handling an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
    /// A chat prompt to send to the storyteller.
    SubmitPrompt(String),
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::ScrollUp => {
            app.scroll_up(3);
            EventResult::NeedsRedraw
        }
        MouseEventKind::ScrollDown => {
            app.scroll_down(3);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    if app.has_overlay() {
        return handle_overlay_key(app, key);
    }

    match app.screen {
        Screen::Library => handle_library_key(app, key),
        Screen::Reading => handle_reading_key(app, key),
        Screen::Chat => handle_chat_key(app, key),
    }
}

fn handle_overlay_key(app: &mut App, key: KeyEvent) -> EventResult {
    match app.overlay() {
        Some(Overlay::Help) => match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Enter => {
                app.close_overlay();
                EventResult::NeedsRedraw
            }
            _ => EventResult::Continue,
        },
        Some(Overlay::ConfirmStartOver(_)) => match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                app.confirm_start_over();
                EventResult::NeedsRedraw
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                app.close_overlay();
                EventResult::NeedsRedraw
            }
            _ => EventResult::Continue,
        },
        None => EventResult::Continue,
    }
}

fn handle_library_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char('q') => EventResult::Quit,
        KeyCode::Char('?') | KeyCode::F(1) => {
            app.toggle_help();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.select_next();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.select_previous();
            EventResult::NeedsRedraw
        }
        KeyCode::Enter | KeyCode::Char('o') => {
            app.open_selected();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('s') => {
            app.request_start_over();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('a') => {
            app.open_chat();
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

fn handle_reading_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char(c @ '1'..='9') => {
            let index = c as usize - '1' as usize;
            app.choose(index);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('s') => {
            app.save_progress();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('x') => {
            app.share();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('c') => {
            app.complete();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('r') => {
            app.restart();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.scroll_down(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.scroll_up(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('?') | KeyCode::F(1) => {
            app.toggle_help();
            EventResult::NeedsRedraw
        }
        KeyCode::Esc | KeyCode::Char('b') => {
            app.back_to_library();
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') => EventResult::Quit,
        _ => EventResult::Continue,
    }
}

fn handle_chat_key(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => {
            app.back_to_library();
            EventResult::NeedsRedraw
        }
        KeyCode::Enter => match app.take_prompt() {
            Some(prompt) => EventResult::SubmitPrompt(prompt),
            None => EventResult::Continue,
        },
        KeyCode::Backspace => {
            app.backspace();
            EventResult::NeedsRedraw
        }
        KeyCode::Up => {
            app.scroll_up(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Down => {
            app.scroll_down(1);
            EventResult::NeedsRedraw
        }
        KeyCode::Char(c) => {
            app.push_char(c);
            EventResult::NeedsRedraw
        }
        _ => EventResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Services;
    use storyteller_core::{ProgressStore, StaticFlags};

    fn press(app: &mut App, code: KeyCode) -> EventResult {
        handle_event(app, Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn app() -> App {
        App::new(Services::in_memory(StaticFlags::new()))
    }

    #[test]
    fn test_ctrl_c_quits_everywhere() {
        let mut app = app();
        app.toggle_help();
        let result = handle_event(
            &mut app,
            Event::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
        );
        assert_eq!(result, EventResult::Quit);
    }

    #[test]
    fn test_read_a_story_with_keys() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.screen, Screen::Reading);

        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('c'));

        assert_eq!(app.screen, Screen::Library);
        assert!(app.services.progress.is_completed("story-1"));
    }

    #[test]
    fn test_out_of_range_choice_is_ignored() {
        let mut app = app();
        press(&mut app, KeyCode::Enter);
        let before = app.view();
        press(&mut app, KeyCode::Char('9'));
        assert_eq!(app.view(), before);
    }

    #[test]
    fn test_start_over_confirmation() {
        let services = Services::in_memory(StaticFlags::new());
        services.progress.set_completed("story-1");
        let mut app = App::new(services);

        press(&mut app, KeyCode::Enter);
        assert!(app.has_overlay());
        press(&mut app, KeyCode::Char('n'));
        assert!(!app.has_overlay());
        assert_eq!(app.screen, Screen::Library);

        press(&mut app, KeyCode::Char('s'));
        press(&mut app, KeyCode::Char('y'));
        assert_eq!(app.screen, Screen::Reading);
    }

    #[test]
    fn test_chat_submits_prompt() {
        let mut app = app();
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.screen, Screen::Chat);

        assert_eq!(press(&mut app, KeyCode::Enter), EventResult::Continue);
        for c in "dragons".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(
            press(&mut app, KeyCode::Enter),
            EventResult::SubmitPrompt("dragons".to_string())
        );

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Library);
    }
}
