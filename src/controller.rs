use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{error, trace};

use crate::config::DashConfig;
use crate::datasource::DataSource;
use crate::domain::{DashError, Effect, Message};
use crate::model::Model;

/// Turns terminal events and finished fetches into messages for the model.
pub struct Controller {
    event_poll_time: u64,
    source: DataSource,
    runtime: Handle,
    loaded_tx: Sender<Message>,
    loaded_rx: Receiver<Message>,
}

impl Controller {
    pub fn new(cfg: &DashConfig, runtime: Handle) -> Self {
        let (loaded_tx, loaded_rx) = mpsc::channel();
        Self {
            event_poll_time: cfg.event_poll_time,
            source: DataSource::new(cfg.endpoint_url.clone()),
            runtime,
            loaded_tx,
            loaded_rx,
        }
    }

    /// Runs an effect requested by the model. Fetches resolve in the background and come
    /// back through `handle_event` as `Message::Loaded`.
    pub fn dispatch(&self, effect: Effect) {
        match effect {
            Effect::Fetch(token) => {
                trace!("Fetching {} for {:?}", self.source.endpoint_url(), token);
                let source = self.source.clone();
                let tx = self.loaded_tx.clone();
                self.runtime.spawn(async move {
                    let state = source.load().await;
                    // The receiver is gone once the ui shut down
                    if tx.send(Message::Loaded { token, state }).is_err() {
                        trace!("Dropping result of {:?}, ui has exited", token);
                    }
                });
            }
        }
    }

    pub fn try_loaded(&self) -> Option<Message> {
        match self.loaded_rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                error!("Fetch result channel disconnected");
                None
            }
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DashError> {
        if let Some(message) = self.try_loaded() {
            return Ok(Some(message));
        }
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                // Crossterm also emits release and repeat events on Windows
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        return Ok(Some(Message::RawKey(key)));
                    }
                    return Ok(self.handle_key(key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Down | KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Up | KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Left | KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right | KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Home | KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End | KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Esc | KeyCode::Char('x'), _) => Some(Message::Exit),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('e'), _) => Some(Message::Export),
            (KeyCode::Char('s'), _) => Some(Message::SortAscending),
            (KeyCode::Char('S'), _) => Some(Message::SortDescending),
            (KeyCode::Char('u'), _) => Some(Message::ClearSort),
            (KeyCode::Char('c'), _) => Some(Message::CopyCell),
            (KeyCode::Char('o'), _) => Some(Message::ReopenDetail),
            (KeyCode::Char('m'), _) => Some(Message::ToggleDrawer),
            (KeyCode::Tab, _) => Some(Message::NextView),
            (KeyCode::Char('r'), _) => Some(Message::Reload),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
