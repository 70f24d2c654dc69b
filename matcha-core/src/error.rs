//! Error types for the runtime and its collaborators

use std::any::Any;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Errors raised by a [`Screen`](crate::screen::Screen) implementation.
#[derive(Debug, Error)]
pub enum ScreenError {
    /// The terminal could not be read from or written to.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The terminal could not be acquired at all.
    #[error("screen unavailable: {0}")]
    Unavailable(String),
    /// Mouse reporting is not supported by this terminal.
    ///
    /// Recoverable: the runtime keeps running without pointer events.
    #[error("no mouse support")]
    NoMouseSupport,
}

impl ScreenError {
    /// Whether the condition only disables a capability instead of the screen.
    pub fn is_capability_absent(&self) -> bool {
        matches!(self, ScreenError::NoMouseSupport)
    }
}

/// Errors raised while resolving styles and colors.
///
/// These are authoring errors: callers should surface them immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    /// A color string could not be parsed.
    #[error("malformed color `{0}`")]
    MalformedColor(String),
    /// A palette index was outside the palette.
    #[error("color index {index} out of range (max {max})")]
    ColorOutOfRange { index: u16, max: u16 },
}

/// Top-level error returned by [`App::run`](crate::runtime::App::run).
#[derive(Debug, Error)]
pub enum Error {
    /// The screen failed to initialize or to paint a frame.
    #[error(transparent)]
    Screen(#[from] ScreenError),
    /// The runtime configuration is not usable.
    #[error("invalid runtime config: {0}")]
    InvalidConfig(String),
    /// The runtime configuration could not be parsed.
    #[error("failed to parse runtime config: {0}")]
    Config(#[from] serde_json::Error),
    /// A component panicked while rendering (usually a hook order violation).
    #[error("render pass panicked: {0}")]
    RenderPanicked(String),
    /// One of the runtime tasks terminated abnormally.
    #[error("runtime task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Lock a registry mutex, recovering the data if a previous holder panicked.
///
/// Registries only hold plain maps, so a poisoned guard is still consistent.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Best-effort extraction of a panic payload message.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
