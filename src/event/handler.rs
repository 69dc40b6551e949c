//! Handler capabilities.
//!
//! A component handler is bound to one [`ComponentType`] through a
//! [`HandlerBase`]. The base answers "is the focused primitive mine?", and
//! concrete handlers add their own predicates on top of it.

use std::rc::Rc;

use crossterm::event::Event;

use crate::event::context::EventContext;
use crate::view::{ComponentResolver, ComponentType, FocusId, View};

/// Binds a handler to one component type.
#[derive(Clone)]
pub struct HandlerBase {
    component_type: ComponentType,
    resolver: Rc<dyn ComponentResolver>,
}

impl HandlerBase {
    pub fn new(component_type: ComponentType, resolver: Rc<dyn ComponentResolver>) -> Self {
        Self {
            component_type,
            resolver,
        }
    }

    pub const fn component_type(&self) -> ComponentType {
        self.component_type
    }

    /// True only when `focus` resolves to exactly this handler's type.
    pub fn matches(&self, focus: Option<FocusId>) -> bool {
        focus
            .and_then(|focus| self.resolver.component_type(focus))
            .is_some_and(|resolved| resolved == self.component_type)
    }
}

/// Per-component input handling.
///
/// `handle_event` consumes the event by returning `None`. Returning the
/// event hands it back to the dispatcher's fallback chain.
pub trait ComponentHandler {
    fn base(&self) -> &HandlerBase;

    fn component_type(&self) -> ComponentType {
        self.base().component_type()
    }

    /// Overrides must keep requiring `self.base().matches(focus)`.
    fn can_handle(&self, event: &Event, focus: Option<FocusId>) -> bool {
        _ = event;
        self.base().matches(focus)
    }

    fn handle_event(&mut self, event: Event, ctx: &mut EventContext) -> Option<Event>;
}

/// Application-wide shortcuts, consulted after the component handler.
pub trait GlobalShortcutHandler {
    fn handle_global_shortcut(
        &mut self,
        event: Event,
        focus: Option<FocusId>,
        view: &dyn View,
    ) -> Option<Event>;
}
