use crossterm::event::KeyCode;
use serde::{Deserialize, Serialize};

use crate::config::key::{Key, KeyBinding};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalKeybindings {
    pub quit: KeyBinding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationKeybindings {
    pub up: KeyBinding,
    pub down: KeyBinding,
    pub left: KeyBinding,
    pub right: KeyBinding,
    pub page_up: KeyBinding,
    pub page_down: KeyBinding,
    pub home: KeyBinding,
    pub end: KeyBinding,
    pub select: KeyBinding,
    pub next_focus: KeyBinding,
    pub prev_focus: KeyBinding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterKeybindings {
    pub confirm: KeyBinding,
    pub cancel: KeyBinding,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct KeybindingsConfig {
    pub global: GlobalKeybindings,
    pub navigation: NavigationKeybindings,
    pub filter: FilterKeybindings,
}

impl Default for GlobalKeybindings {
    fn default() -> Self {
        Self {
            quit: KeyBinding::multiple(vec![
                Key::new(KeyCode::Char('q')),
                Key::with_ctrl(KeyCode::Char('c')),
            ]),
        }
    }
}

impl Default for NavigationKeybindings {
    fn default() -> Self {
        Self {
            up: KeyBinding::multiple(vec![Key::new(KeyCode::Char('k')), Key::new(KeyCode::Up)]),
            down: KeyBinding::multiple(vec![Key::new(KeyCode::Char('j')), Key::new(KeyCode::Down)]),
            left: KeyBinding::multiple(vec![Key::new(KeyCode::Char('h')), Key::new(KeyCode::Left)]),
            right: KeyBinding::multiple(vec![
                Key::new(KeyCode::Char('l')),
                Key::new(KeyCode::Right),
            ]),
            page_up: Key::new(KeyCode::PageUp).into(),
            page_down: Key::new(KeyCode::PageDown).into(),
            home: KeyBinding::multiple(vec![Key::new(KeyCode::Char('g')), Key::new(KeyCode::Home)]),
            end: KeyBinding::multiple(vec![Key::new(KeyCode::Char('G')), Key::new(KeyCode::End)]),
            select: Key::new(KeyCode::Enter).into(),
            next_focus: Key::new(KeyCode::Tab).into(),
            prev_focus: Key::new(KeyCode::BackTab).into(),
        }
    }
}

impl Default for FilterKeybindings {
    fn default() -> Self {
        Self {
            confirm: Key::new(KeyCode::Enter).into(),
            cancel: Key::new(KeyCode::Esc).into(),
        }
    }
}
