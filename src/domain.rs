use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

use crate::datasource::LoadState;

pub const HELP_TEXT: &str = "\
Navigation
  Up/k, Down/j        Move row selection
  Left/h, Right/l     Move column selection
  PageUp, PageDown    Move a page
  g, G                First / last row

Inventory
  /                   Search (live, case-insensitive)
  Enter               Show record details
  o                   Reopen last record details
  Esc, x              Close details / popup
  s, S                Sort column ascending / descending
  u                   Clear sort
  c                   Copy cell or detail value
  e                   Export dataset to users_data.xlsx
  r                   Reload data

Layout
  m                   Toggle navigation drawer
  Tab                 Switch view
  ?                   This help
  q                   Quit";

#[derive(Debug, Error)]
pub enum DashError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("failed to set up logging: {0}")]
    Logging(String),
}

/// Identifies one mount of the inventory view. Results carrying an older token are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ActivationToken(pub u64);

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Enter,
    Exit,
    Search,
    Export,
    SortAscending,
    SortDescending,
    ClearSort,
    CopyCell,
    ReopenDetail,
    ToggleDrawer,
    NextView,
    Reload,
    Help,
    Resize(usize, usize),
    RawKey(KeyEvent),
    Loaded {
        token: ActivationToken,
        state: LoadState,
    },
}

/// Work the model asks the event loop to perform outside the UI thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Fetch(ActivationToken),
}
