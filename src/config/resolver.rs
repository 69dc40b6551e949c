use std::sync::Arc;

use crossterm::event::KeyEvent;

use crate::config::actions::{FilterAction, GlobalAction, NavAction};
use crate::config::key::KeyBinding;
use crate::config::keybindings::KeybindingsConfig;

/// Answers whether a key event triggers a configured action.
pub struct KeyResolver {
    pub keybindings: Arc<KeybindingsConfig>,
}

impl KeyResolver {
    pub const fn new(keybindings: Arc<KeybindingsConfig>) -> Self {
        Self { keybindings }
    }

    // Global actions
    pub fn matches_global(&self, event: &KeyEvent, action: GlobalAction) -> bool {
        self.global_binding(action).matches(event)
    }

    pub fn display_global(&self, action: GlobalAction) -> String {
        self.global_binding(action).display()
    }

    fn global_binding(&self, action: GlobalAction) -> &KeyBinding {
        let kb = &self.keybindings.global;
        match action {
            GlobalAction::Quit => &kb.quit,
        }
    }

    // Navigation actions
    pub fn matches_nav(&self, event: &KeyEvent, action: NavAction) -> bool {
        self.nav_binding(action).matches(event)
    }

    pub fn display_nav(&self, action: NavAction) -> String {
        self.nav_binding(action).display()
    }

    fn nav_binding(&self, action: NavAction) -> &KeyBinding {
        let kb = &self.keybindings.navigation;
        match action {
            NavAction::Up => &kb.up,
            NavAction::Down => &kb.down,
            NavAction::Left => &kb.left,
            NavAction::Right => &kb.right,
            NavAction::PageUp => &kb.page_up,
            NavAction::PageDown => &kb.page_down,
            NavAction::Home => &kb.home,
            NavAction::End => &kb.end,
            NavAction::Select => &kb.select,
            NavAction::NextFocus => &kb.next_focus,
            NavAction::PrevFocus => &kb.prev_focus,
        }
    }

    // Filter prompt actions
    pub fn matches_filter(&self, event: &KeyEvent, action: FilterAction) -> bool {
        self.filter_binding(action).matches(event)
    }

    pub fn display_filter(&self, action: FilterAction) -> String {
        self.filter_binding(action).display()
    }

    fn filter_binding(&self, action: FilterAction) -> &KeyBinding {
        let kb = &self.keybindings.filter;
        match action {
            FilterAction::Confirm => &kb.confirm,
            FilterAction::Cancel => &kb.cancel,
        }
    }
}

impl Default for KeyResolver {
    fn default() -> Self {
        Self::new(Arc::new(KeybindingsConfig::default()))
    }
}
