use std::fs::{self, OpenOptions};
use std::path::Path;

use env_logger::{Builder, Env, Target};

/// Environment variable holding the log filter, e.g. `HACKTYPE_LOG=debug`.
pub const LOG_ENV: &str = "HACKTYPE_LOG";

/// Route `log` output to `path`, since stderr is hidden behind the TUI.
///
/// Without a path, or when the file cannot be opened, logging is disabled.
/// Calling this more than once is harmless.
pub fn init(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };

    let _ = Builder::from_env(Env::default().filter_or(LOG_ENV, "warn"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init();
}
