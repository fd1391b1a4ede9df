use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hacktype::game::Screen as GameScreen;
use ratatui::Frame;

use crate::{ui::command_stats::render_command_stats, App, SortBy};

/// A UI Screen boundary: responsible for rendering and optional key handling
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
    /// Optional per-screen key handling. Returns true if the key was handled.
    fn on_key(&mut self, _key: KeyEvent, _app: &mut App) -> bool {
        false
    }
}

fn is_quit(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)
}

/// Shown until the pack arrives
pub struct LoadingScreen;

impl Screen for LoadingScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        if is_quit(&key) {
            app.should_quit = true;
            return true;
        }
        false
    }
}

pub struct StartScreen;

impl Screen for StartScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Enter | KeyCode::Char(' ') => app.game.start_run(),
            KeyCode::Char('t') => app.game.start_tutorial(),
            KeyCode::Char('a') => {
                app.game.toggle_effects();
                true
            }
            KeyCode::Char('m') => {
                app.game.toggle_music();
                true
            }
            KeyCode::Char('M') => {
                app.game.toggle_mute();
                true
            }
            _ if is_quit(&key) => {
                app.should_quit = true;
                true
            }
            _ => false,
        }
    }
}

/// Typing screen, for both scored runs and the tutorial
pub struct TypingScreen;

impl Screen for TypingScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => app.game.clear_input(),
            KeyCode::Char(_) if ctrl => return false,
            KeyCode::Char(c) => app.game.type_char(c),
            KeyCode::Backspace => app.game.backspace(),
            KeyCode::Tab => {
                app.game.use_hint();
            }
            KeyCode::Esc => match app.game.screen() {
                GameScreen::Tutorial => app.game.skip_tutorial(),
                _ => app.game.abandon_run(),
            },
            _ => return false,
        }
        true
    }
}

pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Enter | KeyCode::Char('r') => {
                app.game.restart();
            }
            KeyCode::Char('b') => app.game.back_to_start(),
            KeyCode::Char('s') => {
                app.stats_view = Default::default();
                app.game.show_command_stats();
            }
            _ if is_quit(&key) => app.should_quit = true,
            _ => return false,
        }
        true
    }
}

pub struct TutorialSummaryScreen;

impl Screen for TutorialSummaryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        match key.code {
            KeyCode::Enter | KeyCode::Char('b') | KeyCode::Esc => app.game.back_to_start(),
            KeyCode::Char('r') => {
                app.game.start_tutorial();
            }
            KeyCode::Char('q') => app.should_quit = true,
            _ => return false,
        }
        true
    }
}

/// Command stats screen - uses dedicated renderer
pub struct CommandStatsScreen;

impl Screen for CommandStatsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_command_stats(app, f);
    }

    fn on_key(&mut self, key: KeyEvent, app: &mut App) -> bool {
        let view = &mut app.stats_view;
        let sort = |view: &mut crate::CommandStatsView, by: SortBy| {
            view.sort_by = by;
            view.scroll_offset = 0;
        };
        match key.code {
            KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => {
                app.game.close_command_stats()
            }
            KeyCode::Char('r') => {
                app.game.close_command_stats();
                app.game.restart();
            }
            KeyCode::Up => view.scroll_offset = view.scroll_offset.saturating_sub(1),
            // Clamped against the table height when rendering.
            KeyCode::Down => view.scroll_offset += 1,
            KeyCode::PageUp => view.scroll_offset = view.scroll_offset.saturating_sub(10),
            KeyCode::PageDown => view.scroll_offset += 10,
            KeyCode::Home => view.scroll_offset = 0,
            KeyCode::Char('1') => sort(view, SortBy::Command),
            KeyCode::Char('2') => sort(view, SortBy::Attempts),
            KeyCode::Char('3') => sort(view, SortBy::AvgTime),
            KeyCode::Char('4') => sort(view, SortBy::ErrorRate),
            KeyCode::Char(' ') => {
                view.sort_ascending = !view.sort_ascending;
                view.scroll_offset = 0;
            }
            _ => return false,
        }
        true
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(screen: GameScreen) -> Box<dyn Screen> {
    match screen {
        GameScreen::Loading => Box::new(LoadingScreen),
        GameScreen::Start => Box::new(StartScreen),
        GameScreen::Play | GameScreen::Tutorial => Box::new(TypingScreen),
        GameScreen::Results => Box::new(ResultsScreen),
        GameScreen::TutorialSummary => Box::new(TutorialSummaryScreen),
        GameScreen::CommandStats => Box::new(CommandStatsScreen),
    }
}
