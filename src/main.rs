mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use hacktype::{
    app_dirs::AppDirs,
    config::{Config, FileConfigStore},
    cues::{CueSink, NullCues, TerminalBell},
    game::{Game, GameSettings},
    history::HistoryDb,
    logging,
    profile::{ProfileStore, ScoreStore},
    runtime::{spawn_pack_loader, CrosstermEventSource, FixedTicker, GameEvent, GameEventSource, Runner, Ticker},
    timer::SystemClock,
    util::format_number,
};
use log::{info, warn};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::File,
    io::{self, stdin, Write},
    path::PathBuf,
};

use crate::ui::screen::current_screen;

/// timed terminal typing challenge built around shell and security commands
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Type real shell and recon commands against the clock. Scores, pack stats and per-command history are kept between sessions."
)]
pub struct Cli {
    /// number of seconds per run (overrides the config file)
    #[clap(short = 's', long)]
    seconds: Option<u64>,

    /// command pack to play
    #[clap(short = 'p', long)]
    pack: Option<String>,

    /// directory holding <pack>.json files, tried before the built-in packs
    #[clap(long)]
    packs_dir: Option<PathBuf>,

    /// start straight into the tutorial
    #[clap(long)]
    tutorial: bool,

    /// disable the terminal bell
    #[clap(long)]
    no_effects: bool,

    /// wipe high scores, pack stats and preferences, then exit
    #[clap(long)]
    reset_profile: bool,

    /// write every recorded run to a CSV file, then exit
    #[clap(long, value_name = "FILE")]
    export_history: Option<PathBuf>,

    /// print the most recent runs, then exit
    #[clap(long)]
    history: bool,
}

impl Cli {
    /// Layer the flags over the loaded config for this session.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(secs) = self.seconds {
            config.run_seconds = secs;
        }
        if let Some(dir) = &self.packs_dir {
            config.packs_dir = Some(dir.clone());
        }
        config
    }

    /// Explicit flag, then the last pack played, then the config.
    fn pack_id(&self, config: &Config, last_pack: Option<String>) -> String {
        self.pack
            .clone()
            .or(last_pack)
            .unwrap_or_else(|| config.pack.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SortBy {
    Command,
    Attempts,
    #[strum(serialize = "Avg Time")]
    AvgTime,
    #[strum(serialize = "Error Rate")]
    ErrorRate,
}

#[derive(Debug)]
pub struct CommandStatsView {
    pub scroll_offset: usize,
    pub sort_by: SortBy,
    pub sort_ascending: bool,
}

impl Default for CommandStatsView {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            sort_by: SortBy::Attempts,
            sort_ascending: false,
        }
    }
}

pub struct App {
    pub game: Game,
    pub stats_view: CommandStatsView,
    pub should_quit: bool,
}

impl App {
    pub fn new(game: Game) -> Self {
        Self {
            game,
            stats_view: CommandStatsView::default(),
            should_quit: false,
        }
    }

    /// Global keys first, then the current screen's bindings.
    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        let mut screen = current_screen(self.game.screen());
        screen.on_key(key, self);
    }

    /// Apply one runtime event. `start_tutorial` is honoured once the pack arrives.
    pub fn on_event(&mut self, event: GameEvent, start_tutorial: bool) {
        match event {
            GameEvent::Key(key) => self.on_key(key),
            GameEvent::Tick => self.game.on_tick(),
            GameEvent::FocusLost => self.game.pause(),
            GameEvent::FocusGained => self.game.resume(),
            GameEvent::PackLoaded(load) => {
                self.game.on_pack_loaded(load);
                if start_tutorial {
                    self.game.start_tutorial();
                }
            }
            GameEvent::Resize => {}
        }
    }
}

fn print_history(history: &HistoryDb) -> Result<(), Box<dyn Error>> {
    let runs = history.recent_runs(20)?;
    if runs.is_empty() {
        println!("no runs recorded yet");
        return Ok(());
    }
    println!(
        "{:<19}  {:<12}  {:>8}  {:>5}  {:>4}  {:>4}  {:>6}",
        "finished", "pack", "score", "cmds", "wpm", "acc", "errors"
    );
    for stored in runs {
        let run = stored.run;
        println!(
            "{:<19}  {:<12}  {:>8}  {:>5}  {:>4}  {:>3}%  {:>6}",
            run.finished_at.format("%Y-%m-%d %H:%M:%S"),
            run.pack_id,
            format_number(run.score),
            run.completed_commands,
            run.wpm,
            run.accuracy,
            run.errors
        );
    }
    println!("{} runs in total", history.run_count()?);
    Ok(())
}

/// One-shot maintenance flags. Returns true when the app should exit.
fn run_maintenance(cli: &Cli) -> Result<bool, Box<dyn Error>> {
    if cli.reset_profile {
        let mut store = ProfileStore::open_default();
        store.reset();
        if let Some(history) = HistoryDb::open_default()? {
            history.clear()?;
        }
        println!("profile and run history cleared");
        return Ok(true);
    }

    if cli.history || cli.export_history.is_some() {
        let Some(history) = HistoryDb::open_default()? else {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::Io, "no state directory for run history")
                .exit();
        };
        if cli.history {
            print_history(&history)?;
        }
        if let Some(path) = &cli.export_history {
            let written = history.export_csv(File::create(path)?)?;
            println!("exported {written} runs to {}", path.display());
        }
        return Ok(true);
    }

    Ok(false)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logging::init(AppDirs::log_path().as_deref());

    if run_maintenance(&cli)? {
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let config = cli.apply(FileConfigStore::new().load_or_init());
    let store = ProfileStore::open_default();
    let pack_id = cli.pack_id(&config, store.last_pack_id());
    info!("starting with pack `{pack_id}`");

    let history = HistoryDb::open_default().unwrap_or_else(|err| {
        warn!("run history disabled: {err}");
        None
    });
    let cues: Box<dyn CueSink> = if cli.no_effects {
        Box::new(NullCues)
    } else {
        Box::new(TerminalBell::stdout())
    };
    let game = Game::new(
        GameSettings::from(&config),
        Box::new(store),
        cues,
        Box::new(SystemClock),
    )
    .with_history(history);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    spawn_pack_loader(events.sender(), pack_id, config.packs_dir.clone());

    let mut app = App::new(game);
    let outcome = start_tui(
        &mut terminal,
        &mut app,
        Runner::new(events, FixedTicker::default()),
        cli.tutorial,
    );

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    io::stdout().flush()?;

    outcome
}

fn start_tui<B: Backend, E: GameEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: Runner<E, T>,
    start_tutorial: bool,
) -> Result<(), Box<dyn Error>> {
    while !app.should_quit {
        terminal.draw(|f| ui(app, f))?;
        app.on_event(runner.step(), start_tutorial);
    }
    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = current_screen(app.game.screen());
    screen.render(app, f);
}
