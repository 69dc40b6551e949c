//! Collaborator contracts between the dispatch core and the hosting view.
//!
//! The core never owns widgets. It only knows focus identities, the logical
//! component category each identity belongs to, and a manager that can move
//! focus or stop the application.

use std::fmt;
use std::rc::Rc;

/// Logical UI region used to route input.
///
/// The set of valid values is defined by each view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ComponentType(pub u32);

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// Identity of a focusable primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusId(pub u32);

impl fmt::Display for FocusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "focus#{}", self.0)
    }
}

/// Maps focus targets to component categories and exposes the focus order.
pub trait ComponentResolver {
    /// The component category of `focus`, if it belongs to this view.
    fn component_type(&self, focus: FocusId) -> Option<ComponentType>;

    /// Explicit focus order for Tab navigation. Empty means "not provided".
    fn navigation_order(&self) -> Vec<FocusId> {
        Vec::new()
    }

    /// All known components in registration order. Empty slots are `None`.
    fn components(&self) -> Vec<Option<FocusId>>;
}

/// Process-level controls owned by the hosting application.
pub trait Manager {
    fn set_focus(&self, target: FocusId);

    /// Request application shutdown.
    fn stop(&self);
}

/// A screen hosting focusable components.
pub trait View {
    fn name(&self) -> &str;

    fn resolver(&self) -> Rc<dyn ComponentResolver>;

    fn manager(&self) -> Rc<dyn Manager>;
}
