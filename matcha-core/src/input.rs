//! Terminal input polling

use std::time::Duration;

use crossterm::event::{self, MouseEventKind};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PollerConfig;
use crate::event::EventKind;

/// Raw event from crossterm before processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawEvent {
    Key(crossterm::event::KeyEvent),
    Mouse(crossterm::event::MouseEvent),
    Resize(u16, u16),
    Paste(String),
    FocusGained,
    FocusLost,
    /// The terminal could not be read
    Error(String),
}

impl From<event::Event> for RawEvent {
    fn from(evt: event::Event) -> Self {
        match evt {
            event::Event::Key(key) => RawEvent::Key(key),
            event::Event::Mouse(mouse) => RawEvent::Mouse(mouse),
            event::Event::Resize(w, h) => RawEvent::Resize(w, h),
            event::Event::Paste(text) => RawEvent::Paste(text),
            event::Event::FocusGained => RawEvent::FocusGained,
            event::Event::FocusLost => RawEvent::FocusLost,
        }
    }
}

/// Spawn the event polling task with cancellation support
///
/// Polls crossterm every `config.loop_sleep`, reading at most
/// `config.max_batch` events per cycle, and sends them through `tx`. When
/// `tx` is full the newest event is dropped. The task stops when
/// `cancel_token` fires or the receiver is dropped.
pub fn spawn_event_poller(
    tx: mpsc::Sender<RawEvent>,
    config: PollerConfig,
    cancel_token: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("event poller cancelled, draining buffer");
                    while event::poll(Duration::ZERO).unwrap_or(false) {
                        let _ = event::read();
                    }
                    break;
                }
                _ = tokio::time::sleep(config.loop_sleep) => {
                    let mut events_processed = 0;
                    while events_processed < config.max_batch
                        && event::poll(config.poll_timeout).unwrap_or(false)
                    {
                        events_processed += 1;
                        let raw = match event::read() {
                            Ok(evt) => RawEvent::from(evt),
                            Err(err) => {
                                warn!(error = %err, "failed to read terminal event");
                                RawEvent::Error(err.to_string())
                            }
                        };
                        if !forward(&tx, raw) {
                            debug!("event channel closed, stopping poller");
                            return;
                        }
                    }
                }
            }
        }
    })
}

/// Queue `raw` without waiting. Returns `false` once the receiver is gone.
fn forward(tx: &mpsc::Sender<RawEvent>, raw: RawEvent) -> bool {
    match tx.try_send(raw) {
        Ok(()) => true,
        Err(TrySendError::Full(dropped)) => {
            warn!(event = ?dropped, "event queue full; dropping newest event");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Process a raw event into an EventKind
pub fn process_raw_event(raw: RawEvent) -> EventKind {
    match raw {
        RawEvent::Key(key) => EventKind::Key(key),
        RawEvent::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollDown => EventKind::Scroll {
                column: mouse.column,
                row: mouse.row,
                delta: 1,
            },
            MouseEventKind::ScrollUp => EventKind::Scroll {
                column: mouse.column,
                row: mouse.row,
                delta: -1,
            },
            _ => EventKind::Mouse(mouse),
        },
        RawEvent::Resize(w, h) => EventKind::Resize(w, h),
        RawEvent::Paste(text) => EventKind::Paste(text),
        RawEvent::FocusGained => EventKind::FocusGained,
        RawEvent::FocusLost => EventKind::FocusLost,
        RawEvent::Error(message) => EventKind::Error(message),
    }
}
