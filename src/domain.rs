use std::fmt;
use std::io::Error;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

use crate::engine::SortKey;

pub const NAME_FIELD: &str = "airline_name";
pub const LINK_FIELD: &str = "url";

// Priority order of the fields shown in the collapsed card preview
pub const IMPORTANT_FIELDS: [&str; 6] = [
    "baggage",
    "dress_code",
    "listing",
    "boarding",
    "check_in",
    "visa",
];

pub const PREVIEW_FIELD_COUNT: usize = 3;
pub const PREVIEW_WIDTH: usize = 80;

pub const HELP_TEXT: &str = "\
Navigation
  j / Down        next airline
  k / Up          previous airline
  PgDown / PgUp   jump 10 airlines
  g / Home        first airline
  G / End         last airline
  Enter / Space   expand or collapse the selected card
  y               copy the reference link of the selected card

Search and sort
  /               edit the search term (Enter to keep, Esc to clear)
  x               clear the search term
  s               cycle sort order
  1 / 2 / 3       sort by name A-Z / name Z-A / most information

Filter panel
  f               open or close the field filter panel
  Enter / Space   toggle the field under the cursor
  a               select all fields
  c               clear all fields

  ?               show this help
  Esc             close popup or panel
  q               quit";

#[derive(Debug)]
pub enum DirectoryError {
    IoError(Error),
    PolarsError(PolarsError),
    LoadingFailed(String),
    MissingColumn(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::IoError(e) => write!(f, "io error: {e}"),
            DirectoryError::PolarsError(e) => write!(f, "could not read dataset: {e}"),
            DirectoryError::LoadingFailed(reason) => write!(f, "loading failed: {reason}"),
            DirectoryError::MissingColumn(name) => {
                write!(f, "dataset has no \"{name}\" column")
            }
            DirectoryError::FileNotFound => write!(f, "file not found"),
            DirectoryError::PermissionDenied => write!(f, "permission denied"),
            DirectoryError::UnknownFileType => write!(f, "unknown file type"),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<Error> for DirectoryError {
    fn from(err: Error) -> Self {
        DirectoryError::IoError(err)
    }
}

impl From<PolarsError> for DirectoryError {
    fn from(err: PolarsError) -> Self {
        DirectoryError::PolarsError(err)
    }
}

#[derive(Debug, Clone, Setters)]
pub struct DirectoryConfig {
    pub event_poll_time: u64,
    #[setters(into)]
    pub name_field: String,
    #[setters(into)]
    pub link_field: String,
    pub important_fields: Vec<String>,
    pub preview_fields: usize,
    pub preview_width: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            name_field: NAME_FIELD.to_string(),
            link_field: LINK_FIELD.to_string(),
            important_fields: IMPORTANT_FIELDS.iter().map(|f| f.to_string()).collect(),
            preview_fields: PREVIEW_FIELD_COUNT,
            preview_width: PREVIEW_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Toggle,
    Search,
    ClearSearch,
    CycleSort,
    SortBy(SortKey),
    ToggleFilterPanel,
    SelectAllFields,
    ClearAllFields,
    CopyLink,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
