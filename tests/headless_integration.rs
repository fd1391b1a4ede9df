use std::sync::mpsc;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use hacktype::{
    cues::{Cue, RecordingCues},
    game::{Game, GameSettings, Screen},
    pack::{load_with_fallback, BuiltinPackSource, PackLoad, PackSource},
    profile::ProfileStore,
    runtime::{spawn_pack_loader, FixedTicker, GameEvent, Runner, TestEventSource},
    timer::ManualClock,
};

fn key(c: char) -> GameEvent {
    GameEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn apply(game: &mut Game, event: GameEvent) {
    match event {
        GameEvent::Key(key) => match key.code {
            KeyCode::Char(c) => game.type_char(c),
            KeyCode::Backspace => game.backspace(),
            _ => {}
        },
        GameEvent::Tick => game.on_tick(),
        GameEvent::FocusLost => game.pause(),
        GameEvent::FocusGained => game.resume(),
        GameEvent::PackLoaded(load) => game.on_pack_loaded(load),
        GameEvent::Resize => {}
    }
}

fn builtin(pack_id: &str) -> PackLoad {
    let sources: [&dyn PackSource; 1] = [&BuiltinPackSource];
    load_with_fallback(&sources, pack_id)
}

// Drives a whole scored run through Runner/TestEventSource without a TTY.
#[test]
fn headless_run_records_score_after_timer_expires() {
    let clock = ManualClock::new();
    let cues = RecordingCues::new();
    let mut game = Game::new(
        GameSettings::default(),
        Box::new(ProfileStore::in_memory()),
        Box::new(cues.clone()),
        Box::new(clock.clone()),
    )
    .with_seed(42);

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    tx.send(GameEvent::PackLoaded(builtin("beginner"))).unwrap();
    apply(&mut game, runner.step());
    assert_eq!(game.screen(), Screen::Start);
    assert!(!game.pack_fell_back());
    assert!(game.start_run());

    for _ in 0..3 {
        // the shortest variant never completes early on another one
        let command = game
            .current_command()
            .unwrap()
            .candidates()
            .iter()
            .min_by_key(|c| c.chars().count())
            .unwrap()
            .clone();
        for c in command.chars() {
            tx.send(key(c)).unwrap();
        }
        for _ in 0..command.chars().count() {
            clock.advance(Duration::from_millis(100));
            apply(&mut game, runner.step());
        }
    }
    assert_eq!(game.stats().unwrap().completed_commands, 3);
    assert_eq!(game.stats().unwrap().errors, 0);
    assert_eq!(cues.count(Cue::Correct), 3);

    clock.advance_secs(60.0);
    // empty channel: the runner times out into a tick
    apply(&mut game, runner.step());

    assert_eq!(game.screen(), Screen::Results);
    let result = game.last_result().unwrap();
    assert_eq!(result.completed_commands, 3);
    assert_eq!(result.accuracy, 100);
    assert!(result.score.total > 0);
    assert!(result.new_high_score);
    assert_eq!(game.high_score(), result.score.total);
}

#[test]
fn headless_focus_loss_pauses_the_clock() {
    let clock = ManualClock::new();
    let mut game = Game::new(
        GameSettings::default(),
        Box::new(ProfileStore::in_memory()),
        Box::new(RecordingCues::new()),
        Box::new(clock.clone()),
    );
    game.on_pack_loaded(builtin("beginner"));
    assert!(game.start_run());

    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    clock.advance_secs(10.0);
    tx.send(GameEvent::FocusLost).unwrap();
    apply(&mut game, runner.step());
    assert!(game.is_paused());

    clock.advance_secs(120.0);
    apply(&mut game, runner.step());
    assert_eq!(game.screen(), Screen::Play);
    assert!((game.remaining_seconds() - 50.0).abs() < 1e-6);

    tx.send(GameEvent::FocusGained).unwrap();
    apply(&mut game, runner.step());
    assert!(!game.is_paused());
}

#[test]
fn headless_tutorial_runs_four_steps() {
    let clock = ManualClock::new();
    let cues = RecordingCues::new();
    let mut game = Game::new(
        GameSettings::default(),
        Box::new(ProfileStore::in_memory()),
        Box::new(cues.clone()),
        Box::new(clock.clone()),
    );
    game.on_pack_loaded(builtin("beginner"));
    assert!(!game.tutorial_completed());
    assert!(game.start_tutorial());

    while game.screen() == Screen::Tutorial {
        let command = game.current_command().unwrap().command.clone();
        clock.advance_secs(2.0);
        for c in command.chars() {
            game.type_char(c);
        }
    }

    assert_eq!(game.screen(), Screen::TutorialSummary);
    let result = game.tutorial_result().unwrap();
    assert_eq!((result.completed_steps, result.total_steps), (4, 4));
    assert!(game.tutorial_completed());
    assert_eq!(cues.count(Cue::LevelUp), 1);
}

#[test]
fn background_loader_falls_back_for_unknown_pack() {
    let (tx, rx) = mpsc::channel();
    let runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );
    spawn_pack_loader(tx, "no-such-pack".to_string(), None)
        .join()
        .unwrap();

    let mut loaded = None;
    for _ in 0..100 {
        if let GameEvent::PackLoaded(load) = runner.step() {
            loaded = Some(load);
            break;
        }
    }
    let load = loaded.expect("loader should report back");
    assert!(load.fell_back);
    assert_eq!(load.pack.pack_id, "no-such-pack");
    assert!(!load.pack.is_empty());
}

#[test]
fn background_loader_prefers_packs_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("custom.json"),
        r#"{"title": "Custom", "commands": [{"id": "c1", "command": "whoami"}]}"#,
    )
    .unwrap();

    let (tx, rx) = mpsc::channel();
    spawn_pack_loader(tx, "custom".to_string(), Some(dir.path().to_path_buf()))
        .join()
        .unwrap();

    match rx.recv().unwrap() {
        GameEvent::PackLoaded(load) => {
            assert!(!load.fell_back);
            assert_eq!(load.pack.title, "Custom");
            assert_eq!(load.pack.commands[0].command, "whoami");
        }
        other => panic!("unexpected event {other:?}"),
    }
}
