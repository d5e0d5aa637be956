use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent};

use crate::app::{App, InputMode, View, PRESETS};

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    // Text input modes capture almost everything
    if app.input_mode != InputMode::Normal {
        handle_text_input(app, key);
        return;
    }

    match key.code {
        // Quit
        KeyCode::Char('q') => app.quit(),

        // View switching
        KeyCode::Tab => app.next_view(),
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Char('1') => app.set_view(View::Dashboard),
        KeyCode::Char('2') => app.set_view(View::Log),
        KeyCode::Char('3') => app.set_view(View::Settings),
        KeyCode::Left => app.prev_view(),
        KeyCode::Right => app.next_view(),

        // Connection control
        KeyCode::Char('c') => app.connect(),
        KeyCode::Char('d') => app.disconnect(),

        // Publishing
        KeyCode::Char('p') => app.start_publish_input(),
        KeyCode::F(n) if (1..=PRESETS.len() as u8).contains(&n) => {
            if app.current_view == View::Dashboard {
                app.send_preset(n as usize - 1);
            }
        }

        // Heartbeat
        KeyCode::Char('h') => app.start_heartbeat(),
        KeyCode::Char('H') => app.stop_heartbeat(),

        // Export current window as CSV
        KeyCode::Char('e') => {
            let path = app.default_export_path();
            match app.export_csv(&path) {
                Ok(()) => app.set_status_message(format!("exported to {}", path.display())),
                Err(e) => app.set_status_message(format!("export failed: {}", e)),
            }
        }

        // Clear chart data
        KeyCode::Char('x') => app.clear_chart(),

        // Per-view navigation
        KeyCode::Up | KeyCode::Char('k') => match app.current_view {
            View::Log => app.scroll_log_up(1),
            View::Settings => app.select_prev_field(),
            View::Dashboard => {}
        },
        KeyCode::Down | KeyCode::Char('j') => match app.current_view {
            View::Log => app.scroll_log_down(1),
            View::Settings => app.select_next_field(),
            View::Dashboard => {}
        },
        KeyCode::PageUp => {
            if app.current_view == View::Log {
                app.scroll_log_up(10);
            }
        }
        KeyCode::PageDown => {
            if app.current_view == View::Log {
                app.scroll_log_down(10);
            }
        }

        // Log controls
        KeyCode::Char('a') => {
            if app.current_view == View::Log {
                app.toggle_auto_scroll();
            }
        }
        KeyCode::Char('C') => {
            if app.current_view == View::Log {
                app.clear_log();
            }
        }

        // Settings controls
        KeyCode::Enter => {
            if app.current_view == View::Settings {
                app.start_field_edit();
            }
        }
        KeyCode::Char('s') => {
            if app.current_view == View::Settings {
                app.save_config();
            }
        }
        KeyCode::Char('l') => {
            if app.current_view == View::Settings {
                app.load_config();
            }
        }
        KeyCode::Char('R') => {
            if app.current_view == View::Settings {
                app.reset_config();
            }
        }
        KeyCode::Char('g') => {
            if app.current_view == View::Settings {
                app.randomize_client_id();
            }
        }

        // Help
        KeyCode::Char('?') => app.toggle_help(),

        _ => {}
    }
}

/// Handle key input while a text input is active
fn handle_text_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => match app.input_mode {
            InputMode::Publish => app.commit_publish_input(),
            InputMode::EditField => app.commit_field_edit(),
            InputMode::Normal => {}
        },
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Backspace => app.input_pop(),
        KeyCode::Char(c) => app.input_push(c),
        _ => {}
    }
}
