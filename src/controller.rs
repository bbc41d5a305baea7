use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crate::domain::{DirectoryConfig, DirectoryError, Message};
use crate::engine::SortKey;
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &DirectoryConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, DirectoryError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(self.map_event(event::read()?, model.raw_keyevents()));
        }
        Ok(None)
    }

    fn map_event(&self, event: Event, raw: bool) -> Option<Message> {
        match event {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if raw {
                    Some(Message::RawKey(key))
                } else {
                    self.handle_key(key)
                }
            }
            Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
            _ => None,
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('j') | KeyCode::Down, _) => Some(Message::MoveDown),
            (KeyCode::Char('k') | KeyCode::Up, _) => Some(Message::MoveUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::Char('g') | KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::Char('G') | KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Enter | KeyCode::Char(' '), _) => Some(Message::Toggle),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('x'), _) => Some(Message::ClearSearch),
            (KeyCode::Char('s'), _) => Some(Message::CycleSort),
            (KeyCode::Char('1'), _) => Some(Message::SortBy(SortKey::NameAscending)),
            (KeyCode::Char('2'), _) => Some(Message::SortBy(SortKey::NameDescending)),
            (KeyCode::Char('3'), _) => Some(Message::SortBy(SortKey::FieldCountDescending)),
            (KeyCode::Char('f'), _) => Some(Message::ToggleFilterPanel),
            (KeyCode::Char('a'), _) => Some(Message::SelectAllFields),
            (KeyCode::Char('c'), _) => Some(Message::ClearAllFields),
            (KeyCode::Char('y'), _) => Some(Message::CopyLink),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
