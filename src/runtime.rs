use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent};

use crate::pack::{load_with_fallback, BuiltinPackSource, DirPackSource, PackLoad, PackSource};

pub const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum GameEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    FocusLost,
    FocusGained,
    PackLoaded(PackLoad),
}

/// Source of terminal events (keyboard, resize, focus, background work)
pub trait GameEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    tx: Sender<GameEvent>,
    rx: Receiver<GameEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        let reader_tx = tx.clone();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                Ok(CtEvent::Key(key)) => Some(GameEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => Some(GameEvent::Resize),
                Ok(CtEvent::FocusLost) => Some(GameEvent::FocusLost),
                Ok(CtEvent::FocusGained) => Some(GameEvent::FocusGained),
                Ok(_) => None,
                Err(_) => break,
            };
            if let Some(ev) = forwarded {
                if reader_tx.send(ev).is_err() {
                    break;
                }
            }
        });

        Self { tx, rx }
    }

    /// Sender for background work that reports back into the event loop.
    pub fn sender(&self) -> Sender<GameEvent> {
        self.tx.clone()
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(TICK_INTERVAL)
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<GameEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: GameEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: GameEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> GameEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => GameEvent::Tick,
        }
    }
}

/// Load a pack off the UI thread and post the result as `PackLoaded`.
pub fn spawn_pack_loader(
    tx: Sender<GameEvent>,
    pack_id: String,
    packs_dir: Option<PathBuf>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        let dir_source = packs_dir.map(DirPackSource::new);
        let mut sources: Vec<&dyn PackSource> = Vec::with_capacity(2);
        if let Some(dir) = &dir_source {
            sources.push(dir);
        }
        sources.push(&BuiltinPackSource);

        let load = load_with_fallback(&sources, &pack_id);
        // The receiver is gone if the app quit while loading.
        let _ = tx.send(GameEvent::PackLoaded(load));
    })
}
