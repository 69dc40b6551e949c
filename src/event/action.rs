use std::fmt;

use crossterm::event::KeyEvent;
use serde_json::Value;

use crate::config::Key;
use crate::view::ComponentType;

/// First code available to view-specific actions.
pub const CUSTOM_ACTION_BASE: u16 = 1000;

/// Semantic action triggered by a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Focus,
    Toggle,
    Navigate,
    Filter,
    Document,
    Edit,
    Clear,
    Delete,
    Move,
    /// View-specific action; the code is always at least [`CUSTOM_ACTION_BASE`].
    Custom(u16),
}

impl ActionType {
    /// A view-specific action. Codes below [`CUSTOM_ACTION_BASE`] are reserved.
    pub const fn custom(code: u16) -> Option<Self> {
        if code >= CUSTOM_ACTION_BASE {
            Some(Self::Custom(code))
        } else {
            None
        }
    }

    pub const fn code(self) -> u16 {
        match self {
            Self::Focus => 0,
            Self::Toggle => 1,
            Self::Navigate => 2,
            Self::Filter => 3,
            Self::Document => 4,
            Self::Edit => 5,
            Self::Clear => 6,
            Self::Delete => 7,
            Self::Move => 8,
            Self::Custom(code) => code,
        }
    }

    pub const fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            0 => Self::Focus,
            1 => Self::Toggle,
            2 => Self::Navigate,
            3 => Self::Filter,
            4 => Self::Document,
            5 => Self::Edit,
            6 => Self::Clear,
            7 => Self::Delete,
            8 => Self::Move,
            code => return Self::custom(code),
        })
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Focus => f.write_str("focus"),
            Self::Toggle => f.write_str("toggle"),
            Self::Navigate => f.write_str("navigate"),
            Self::Filter => f.write_str("filter"),
            Self::Document => f.write_str("document"),
            Self::Edit => f.write_str("edit"),
            Self::Clear => f.write_str("clear"),
            Self::Delete => f.write_str("delete"),
            Self::Move => f.write_str("move"),
            Self::Custom(code) => write!(f, "custom({code})"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Action payload. Its shape depends on the action and is not validated here.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ActionData {
    #[default]
    None,
    Index(usize),
    Cell { row: usize, col: usize },
    Text(String),
    Direction(Direction),
    Component(ComponentType),
    /// Schema-less payload for integrations.
    Extra(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyAction {
    pub kind: ActionType,
    pub data: ActionData,
}

impl KeyAction {
    pub const fn new(kind: ActionType, data: ActionData) -> Self {
        Self { kind, data }
    }

    pub const fn bare(kind: ActionType) -> Self {
        Self::new(kind, ActionData::None)
    }
}

/// Binds a key to an action, either globally or for one component.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMapping {
    pub key: Key,
    /// `None` means the mapping applies everywhere.
    pub component: Option<ComponentType>,
    pub action: KeyAction,
}

impl KeyMapping {
    pub const fn global(key: Key, action: KeyAction) -> Self {
        Self {
            key,
            component: None,
            action,
        }
    }

    pub const fn scoped(key: Key, component: ComponentType, action: KeyAction) -> Self {
        Self {
            key,
            component: Some(component),
            action,
        }
    }
}

/// Ordered key mappings. Component-scoped mappings shadow global ones.
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    mappings: Vec<KeyMapping>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, mapping: KeyMapping) -> &mut Self {
        self.mappings.push(mapping);
        self
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// The action bound to `event` for `component`.
    pub fn resolve(
        &self,
        event: &KeyEvent,
        component: Option<ComponentType>,
    ) -> Option<&KeyAction> {
        let matching = |scope: Option<ComponentType>| {
            self.mappings
                .iter()
                .find(|m| m.component == scope && m.key.matches(event))
                .map(|m| &m.action)
        };

        component.and_then(|c| matching(Some(c))).or_else(|| matching(None))
    }
}

impl FromIterator<KeyMapping> for KeyMap {
    fn from_iter<I: IntoIterator<Item = KeyMapping>>(iter: I) -> Self {
        Self {
            mappings: iter.into_iter().collect(),
        }
    }
}
