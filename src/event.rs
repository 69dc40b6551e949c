//! Input dispatch.
//!
//! [`EventDispatcher`] takes raw terminal events and routes them to the
//! handler registered for the focused component, then to global shortcuts,
//! then to focus navigation. Stock handlers live in [`handlers`].

mod action;
mod context;
mod dispatcher;
mod handler;
pub mod handlers;

pub use action::{
    ActionData, ActionType, CUSTOM_ACTION_BASE, Direction, KeyAction, KeyMap, KeyMapping,
};
pub use context::{EventContext, EventMetrics, EventOutcome, EventRecord};
pub use dispatcher::EventDispatcher;
pub use handler::{ComponentHandler, GlobalShortcutHandler, HandlerBase};
