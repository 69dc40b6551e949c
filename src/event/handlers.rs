//! Stock handlers for common view primitives.
//!
//! Each handler shares its model with the host through `Rc<RefCell<_>>`, so
//! the host can render whatever the handler last wrote.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info};

use crate::config::{FilterAction, GlobalAction, KeyResolver, NavAction};
use crate::error::ErrorFactory;
use crate::event::action::{ActionData, ActionType, KeyAction, KeyMap};
use crate::event::context::EventContext;
use crate::event::handler::{ComponentHandler, GlobalShortcutHandler, HandlerBase};
use crate::view::{FocusId, View};

/// Rows skipped by page up/down.
pub const PAGE_SIZE: usize = 10;

const LIST_ACTIONS: [NavAction; 7] = [
    NavAction::Up,
    NavAction::Down,
    NavAction::PageUp,
    NavAction::PageDown,
    NavAction::Home,
    NavAction::End,
    NavAction::Select,
];

const TABLE_ACTIONS: [NavAction; 5] = [
    NavAction::Up,
    NavAction::Down,
    NavAction::Left,
    NavAction::Right,
    NavAction::Select,
];

fn first_match(keys: &KeyResolver, key: &KeyEvent, actions: &[NavAction]) -> Option<NavAction> {
    actions.iter().copied().find(|action| keys.matches_nav(key, *action))
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListSelection {
    pub len: usize,
    pub selected: usize,
}

impl ListSelection {
    pub const fn new(len: usize) -> Self {
        Self { len, selected: 0 }
    }

    /// Replace the item count, keeping the selection in range.
    pub fn set_len(&mut self, len: usize) {
        self.len = len;
        self.select(self.selected);
    }

    pub fn select(&mut self, index: usize) {
        self.selected = index.min(self.len.saturating_sub(1));
    }

    fn apply(&mut self, action: NavAction) {
        match action {
            NavAction::Up => self.select(self.selected.saturating_sub(1)),
            NavAction::Down => self.select(self.selected.saturating_add(1)),
            NavAction::PageUp => self.select(self.selected.saturating_sub(PAGE_SIZE)),
            NavAction::PageDown => self.select(self.selected.saturating_add(PAGE_SIZE)),
            NavAction::Home => self.select(0),
            NavAction::End => self.select(usize::MAX),
            _ => {}
        }
    }
}

/// Moves a list selection. The selection is clamped and never wraps.
pub struct ListNavigationHandler {
    base: HandlerBase,
    keys: Arc<KeyResolver>,
    model: Rc<RefCell<ListSelection>>,
}

impl ListNavigationHandler {
    pub const fn new(
        base: HandlerBase,
        keys: Arc<KeyResolver>,
        model: Rc<RefCell<ListSelection>>,
    ) -> Self {
        Self { base, keys, model }
    }
}

impl ComponentHandler for ListNavigationHandler {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn can_handle(&self, event: &Event, focus: Option<FocusId>) -> bool {
        self.base.matches(focus) && matches!(event, Event::Key(_))
    }

    fn handle_event(&mut self, event: Event, ctx: &mut EventContext) -> Option<Event> {
        let Event::Key(key) = &event else {
            return Some(event);
        };
        let Some(action) = first_match(&self.keys, key, &LIST_ACTIONS) else {
            return Some(event);
        };

        let mut list = self.model.borrow_mut();
        if action == NavAction::Select {
            ctx.set_action(KeyAction::new(ActionType::Toggle, ActionData::Index(list.selected)));
        } else {
            list.apply(action);
            ctx.set_action(KeyAction::new(ActionType::Navigate, ActionData::Index(list.selected)));
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CellCursor {
    pub rows: usize,
    pub cols: usize,
    pub row: usize,
    pub col: usize,
}

impl CellCursor {
    pub const fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            row: 0,
            col: 0,
        }
    }

    fn apply(&mut self, action: NavAction) {
        let last_row = self.rows.saturating_sub(1);
        let last_col = self.cols.saturating_sub(1);
        match action {
            NavAction::Up => self.row = self.row.saturating_sub(1),
            NavAction::Down => self.row = (self.row + 1).min(last_row),
            NavAction::Left => self.col = self.col.saturating_sub(1),
            NavAction::Right => self.col = (self.col + 1).min(last_col),
            _ => {}
        }
    }
}

/// Moves a cell cursor through a table.
pub struct TableCellHandler {
    base: HandlerBase,
    keys: Arc<KeyResolver>,
    model: Rc<RefCell<CellCursor>>,
}

impl TableCellHandler {
    pub const fn new(
        base: HandlerBase,
        keys: Arc<KeyResolver>,
        model: Rc<RefCell<CellCursor>>,
    ) -> Self {
        Self { base, keys, model }
    }
}

impl ComponentHandler for TableCellHandler {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn can_handle(&self, event: &Event, focus: Option<FocusId>) -> bool {
        self.base.matches(focus) && matches!(event, Event::Key(_))
    }

    fn handle_event(&mut self, event: Event, ctx: &mut EventContext) -> Option<Event> {
        let Event::Key(key) = &event else {
            return Some(event);
        };
        let Some(action) = first_match(&self.keys, key, &TABLE_ACTIONS) else {
            return Some(event);
        };

        let mut cursor = self.model.borrow_mut();
        cursor.apply(action);
        let cell = ActionData::Cell {
            row: cursor.row,
            col: cursor.col,
        };
        let kind = if action == NavAction::Select {
            ActionType::Document
        } else {
            ActionType::Navigate
        };
        ctx.set_action(KeyAction::new(kind, cell));
        None
    }
}

// ---------------------------------------------------------------------------
// Filter prompt
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPrompt {
    /// Text being typed.
    pub input: String,
    /// Last confirmed filter. `None` shows everything.
    pub applied: Option<String>,
}

impl FilterPrompt {
    /// Case-insensitive match against the applied filter.
    pub fn accepts(&self, text: &str) -> bool {
        self.applied
            .as_ref()
            .is_none_or(|filter| text.to_lowercase().contains(&filter.to_lowercase()))
    }
}

/// Text entry for a filter prompt.
///
/// Printable characters are claimed so that letters bound elsewhere (such
/// as the quit key) can be typed. Focus keys always propagate.
pub struct FilterPromptHandler {
    base: HandlerBase,
    keys: Arc<KeyResolver>,
    model: Rc<RefCell<FilterPrompt>>,
    max_length: usize,
    errors: ErrorFactory,
}

impl FilterPromptHandler {
    pub const fn new(
        base: HandlerBase,
        keys: Arc<KeyResolver>,
        model: Rc<RefCell<FilterPrompt>>,
        max_length: usize,
        errors: ErrorFactory,
    ) -> Self {
        Self {
            base,
            keys,
            model,
            max_length,
            errors,
        }
    }

    fn confirm(&self, ctx: &mut EventContext) {
        let mut prompt = self.model.borrow_mut();
        let length = prompt.input.chars().count();
        if length > self.max_length {
            let err = self.errors.wrap_validation(
                "filter",
                prompt.input.clone(),
                format!("longer than {} characters", self.max_length),
            );
            ctx.fail(err);
            return;
        }

        let text = prompt.input.trim().to_string();
        prompt.applied = (!text.is_empty()).then(|| text.clone());
        ctx.set_action(KeyAction::new(ActionType::Filter, ActionData::Text(text)));
    }

    fn cancel(&self, ctx: &mut EventContext) {
        let mut prompt = self.model.borrow_mut();
        prompt.input.clear();
        prompt.applied = None;
        ctx.set_action(KeyAction::bare(ActionType::Clear));
        ctx.cancel();
    }
}

impl ComponentHandler for FilterPromptHandler {
    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn can_handle(&self, event: &Event, focus: Option<FocusId>) -> bool {
        self.base.matches(focus) && matches!(event, Event::Key(_))
    }

    fn handle_event(&mut self, event: Event, ctx: &mut EventContext) -> Option<Event> {
        let Event::Key(key) = &event else {
            return Some(event);
        };

        if self.keys.matches_nav(key, NavAction::NextFocus)
            || self.keys.matches_nav(key, NavAction::PrevFocus)
        {
            return Some(event);
        }
        if self.keys.matches_filter(key, FilterAction::Confirm) {
            self.confirm(ctx);
            return None;
        }
        if self.keys.matches_filter(key, FilterAction::Cancel) {
            self.cancel(ctx);
            return None;
        }

        let (code, modifiers) = (key.code, key.modifiers);
        match code {
            KeyCode::Backspace => {
                self.model.borrow_mut().input.pop();
                ctx.set_action(KeyAction::bare(ActionType::Edit));
                None
            }
            KeyCode::Char(c)
                if !modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.model.borrow_mut().input.push(c);
                ctx.set_action(KeyAction::new(ActionType::Edit, ActionData::Text(c.to_string())));
                None
            }
            _ => Some(event),
        }
    }
}

// ---------------------------------------------------------------------------
// Global shortcuts
// ---------------------------------------------------------------------------

type ActionSink = Box<dyn FnMut(&KeyAction, Option<FocusId>)>;

/// Quit plus an optional table of view-wide actions.
pub struct DefaultGlobalShortcuts {
    keys: Arc<KeyResolver>,
    keymap: KeyMap,
    on_action: Option<ActionSink>,
}

impl DefaultGlobalShortcuts {
    pub fn new(keys: Arc<KeyResolver>) -> Self {
        Self {
            keys,
            keymap: KeyMap::new(),
            on_action: None,
        }
    }

    /// Resolve extra keys through `keymap` and pass the resulting actions to `on_action`.
    #[must_use]
    pub fn with_keymap(
        mut self,
        keymap: KeyMap,
        on_action: impl FnMut(&KeyAction, Option<FocusId>) + 'static,
    ) -> Self {
        self.keymap = keymap;
        self.on_action = Some(Box::new(on_action));
        self
    }
}

impl GlobalShortcutHandler for DefaultGlobalShortcuts {
    fn handle_global_shortcut(
        &mut self,
        event: Event,
        focus: Option<FocusId>,
        view: &dyn View,
    ) -> Option<Event> {
        let Event::Key(key) = &event else {
            return Some(event);
        };

        if self.keys.matches_global(key, GlobalAction::Quit) {
            info!(view = view.name(), "Quit requested");
            view.manager().stop();
            return None;
        }

        let component = focus.and_then(|focus| view.resolver().component_type(focus));
        let Some(action) = self.keymap.resolve(key, component) else {
            return Some(event);
        };
        debug!(view = view.name(), action = %action.kind, ?component, "Global action");
        if let Some(on_action) = self.on_action.as_mut() {
            on_action(action, focus);
        }
        None
    }
}
