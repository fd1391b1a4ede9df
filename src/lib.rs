// Library surface for the binary, headless integration tests and reuse.
// Terminal rendering stays in the binary.
pub mod app_dirs;
pub mod config;
pub mod cues;
pub mod error;
pub mod game;
pub mod history;
pub mod logging;
pub mod pack;
pub mod profile;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod timer;
pub mod typing;
pub mod util;

pub use error::{Error, Result};
