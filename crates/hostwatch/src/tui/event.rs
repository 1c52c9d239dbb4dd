//! Event handling for TUI.
//!
//! A separate thread polls the terminal for input and emits timer ticks.
//! The poller shares the same channel to deliver fetch results.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind, MouseEvent};

use hostwatch_core::source::Update;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// Timer tick: refresh cycles, time-ago timers.
    Tick,
    /// Keyboard input.
    Key(KeyEvent),
    /// Mouse input (drag reordering).
    Mouse(MouseEvent),
    /// Terminal resize.
    Resize(u16, u16),
    /// A background fetch finished.
    Fetched(Update),
}

impl From<Update> for Event {
    fn from(update: Update) -> Self {
        Event::Fetched(update)
    }
}

/// Event handler that polls for terminal events in a separate thread.
pub struct EventHandler {
    rx: Receiver<Event>,
    tx: Sender<Event>,
}

impl EventHandler {
    /// Creates a new event handler with the specified tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::channel();
        let event_tx = tx.clone();

        thread::spawn(move || {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    if let Ok(evt) = event::read() {
                        let event = match evt {
                            CrosstermEvent::Key(key) if key.kind != KeyEventKind::Release => {
                                Event::Key(key)
                            }
                            CrosstermEvent::Mouse(mouse) => Event::Mouse(mouse),
                            CrosstermEvent::Resize(w, h) => Event::Resize(w, h),
                            _ => continue,
                        };
                        if event_tx.send(event).is_err() {
                            break;
                        }
                    }
                } else if event_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Sender for producers outside the input thread.
    pub fn sender(&self) -> Sender<Event> {
        self.tx.clone()
    }

    /// Receives the next event, blocking until one is available.
    pub fn next(&self) -> Result<Event, mpsc::RecvError> {
        self.rx.recv()
    }
}
