use std::time::Duration;
use tracing::trace;

use crate::domain::{AppConfig, AppError, Message};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &AppConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, AppError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    return Ok(self.handle_key(model, key));
                }
                Event::Resize(width, height) => {
                    return Ok(Some(Message::Resize(width as usize, height as usize)));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    pub fn handle_key(&self, model: &Model, key: KeyEvent) -> Option<Message> {
        let message = if model.raw_keyevents() {
            Some(Message::RawKey(key))
        } else if model.awaiting_confirmation() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Some(Message::Confirm),
                KeyCode::Char('n') | KeyCode::Esc => Some(Message::Exit),
                _ => None,
            }
        } else {
            Self::map_key(key)
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }

    fn map_key(key: KeyEvent) -> Option<Message> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Left, _) | (KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Right, _) | (KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home, _) => Some(Message::MoveBeginning),
            (KeyCode::End, _) => Some(Message::MoveEnd),
            (KeyCode::Tab, _) => Some(Message::NextTab),
            (KeyCode::Enter, _) | (KeyCode::Char(' '), _) => Some(Message::ToggleRow),
            (KeyCode::Char('a'), _) => Some(Message::ToggleAll),
            (KeyCode::Char('c'), _) => Some(Message::SelectFilterColumn),
            (KeyCode::Char('/'), _) => Some(Message::Filter),
            (KeyCode::Char('e'), _) => Some(Message::SelectMailColumn),
            (KeyCode::Char('y'), _) => Some(Message::CopyCell),
            (KeyCode::Char('Y'), _) => Some(Message::CopyMessage),
            (KeyCode::Char('s'), _) => Some(Message::EditSubject),
            (KeyCode::Char(':'), _) => Some(Message::EnterCommand),
            (KeyCode::Char('i'), _) => Some(Message::EditTemplate),
            (KeyCode::Char('['), _) => Some(Message::InsertColumn),
            (KeyCode::Char('g'), _) => Some(Message::GotoPreview),
            (KeyCode::Char('S'), _) => Some(Message::SendAll),
            (KeyCode::Char('x'), _) => Some(Message::ExportAll),
            (KeyCode::Char('X'), _) => Some(Message::ExportPreview),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn key_mapping() {
        assert_eq!(Controller::map_key(key(KeyCode::Char('q'))), Some(Message::Quit));
        assert_eq!(Controller::map_key(key(KeyCode::Char('j'))), Some(Message::MoveDown));
        assert_eq!(Controller::map_key(key(KeyCode::Char(' '))), Some(Message::ToggleRow));
        assert_eq!(
            Controller::map_key(KeyEvent::new(KeyCode::Char('S'), KeyModifiers::SHIFT)),
            Some(Message::SendAll)
        );
        assert_eq!(
            Controller::map_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Message::Quit)
        );
        assert_eq!(Controller::map_key(key(KeyCode::Char('i'))), Some(Message::EditTemplate));
        assert_eq!(Controller::map_key(key(KeyCode::Char('['))), Some(Message::InsertColumn));
        assert_eq!(Controller::map_key(key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn command_input_gets_raw_keys() {
        let controller = Controller::new(&AppConfig::default());
        let mut model = Model::new(&AppConfig::default(), 80, 24);
        model.update(Some(Message::EnterCommand));
        assert_eq!(
            controller.handle_key(&model, key(KeyCode::Char('q'))),
            Some(Message::RawKey(key(KeyCode::Char('q'))))
        );
    }

    #[test]
    fn template_editing_gets_raw_keys() {
        let controller = Controller::new(&AppConfig::default());
        let mut model = Model::new(&AppConfig::default(), 80, 24);
        model.update(Some(Message::EditTemplate));
        assert_eq!(
            controller.handle_key(&model, key(KeyCode::Esc)),
            Some(Message::RawKey(key(KeyCode::Esc)))
        );
        model.update(Some(Message::RawKey(key(KeyCode::Esc))));
        assert_eq!(controller.handle_key(&model, key(KeyCode::Char('i'))), Some(Message::EditTemplate));
    }
}
