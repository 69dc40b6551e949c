//! A three-pane sample view: a service list, an instance table and a filter prompt.

use std::cell::Cell;
use std::rc::Rc;

use lazyview::view::{ComponentResolver, ComponentType, FocusId, Manager, View};
use tracing::debug;

pub const SERVICE_LIST: ComponentType = ComponentType(1);
pub const INSTANCE_TABLE: ComponentType = ComponentType(2);
pub const FILTER_PROMPT: ComponentType = ComponentType(3);

pub const SERVICES_FOCUS: FocusId = FocusId(1);
pub const INSTANCES_FOCUS: FocusId = FocusId(2);
pub const FILTER_FOCUS: FocusId = FocusId(3);

pub const SERVICES: &[&str] = &[
    "compute",
    "storage",
    "secrets",
    "queues",
    "dns",
    "functions",
    "registry",
    "monitoring",
];

pub const INSTANCE_HEADER: [&str; 3] = ["Name", "Zone", "Status"];

pub const INSTANCES: &[[&str; 3]] = &[
    ["api-gateway-1", "eu-west-1a", "running"],
    ["api-gateway-2", "eu-west-1b", "running"],
    ["batch-worker", "us-east-1c", "stopped"],
    ["cache-primary", "eu-west-1a", "running"],
    ["cache-replica", "eu-west-1b", "degraded"],
    ["ingest", "ap-south-1a", "running"],
    ["reporting", "us-east-1a", "stopped"],
];

#[derive(Default)]
pub struct DemoResolver;

impl ComponentResolver for DemoResolver {
    fn component_type(&self, focus: FocusId) -> Option<ComponentType> {
        match focus {
            SERVICES_FOCUS => Some(SERVICE_LIST),
            INSTANCES_FOCUS => Some(INSTANCE_TABLE),
            FILTER_FOCUS => Some(FILTER_PROMPT),
            _ => None,
        }
    }

    fn components(&self) -> Vec<Option<FocusId>> {
        vec![Some(SERVICES_FOCUS), Some(INSTANCES_FOCUS), Some(FILTER_FOCUS)]
    }
}

/// Current focus and the quit flag.
pub struct DemoManager {
    focus: Cell<FocusId>,
    stopped: Cell<bool>,
}

impl DemoManager {
    pub const fn new(focus: FocusId) -> Self {
        Self {
            focus: Cell::new(focus),
            stopped: Cell::new(false),
        }
    }

    pub fn focus(&self) -> FocusId {
        self.focus.get()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl Manager for DemoManager {
    fn set_focus(&self, target: FocusId) {
        debug!(from = %self.focus.get(), to = %target, "Focus changed");
        self.focus.set(target);
    }

    fn stop(&self) {
        self.stopped.set(true);
    }
}

pub struct DemoView {
    resolver: Rc<DemoResolver>,
    manager: Rc<DemoManager>,
}

impl DemoView {
    pub fn new(manager: Rc<DemoManager>) -> Self {
        Self {
            resolver: Rc::new(DemoResolver),
            manager,
        }
    }
}

impl View for DemoView {
    fn name(&self) -> &str {
        "demo"
    }

    fn resolver(&self) -> Rc<dyn ComponentResolver> {
        self.resolver.clone()
    }

    fn manager(&self) -> Rc<dyn Manager> {
        self.manager.clone()
    }
}
