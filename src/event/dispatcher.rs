//! Routes input to the focused component.
//!
//! Dispatch order is fixed:
//!
//! 1. the handler registered for the focused component's type,
//! 2. the global shortcut handler,
//! 3. built-in focus navigation (next/previous focus keys),
//! 4. propagation back to the host.
//!
//! Any stage returning `None` ends the dispatch.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use crossterm::event::Event;
use tracing::{debug, warn};

use crate::config::{EventConfig, KeyResolver, NavAction};
use crate::error::ErrorHandler;
use crate::event::context::{EventContext, EventMetrics, EventOutcome};
use crate::event::handler::{ComponentHandler, GlobalShortcutHandler};
use crate::view::{ComponentResolver, ComponentType, FocusId, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusStep {
    Next,
    Previous,
}

pub struct EventDispatcher {
    view: Rc<dyn View>,
    resolver: Rc<dyn ComponentResolver>,
    handlers: HashMap<ComponentType, Box<dyn ComponentHandler>>,
    global: Option<Box<dyn GlobalShortcutHandler>>,
    keys: Arc<KeyResolver>,
    errors: Option<Rc<ErrorHandler>>,
    config: EventConfig,
    metrics: EventMetrics,
    session_id: String,
    sequence: u64,
}

impl EventDispatcher {
    pub fn new(view: Rc<dyn View>, keys: Arc<KeyResolver>, config: EventConfig) -> Self {
        let resolver = view.resolver();
        Self {
            view,
            resolver,
            handlers: HashMap::new(),
            global: None,
            keys,
            errors: None,
            config,
            metrics: EventMetrics::new(config.max_history),
            session_id: uuid::Uuid::new_v4().to_string(),
            sequence: 0,
        }
    }

    /// Register a handler for its component type, replacing any previous one.
    pub fn register_handler<H: ComponentHandler + 'static>(&mut self, handler: H) {
        let component = handler.component_type();
        if self.handlers.insert(component, Box::new(handler)).is_some() {
            debug!(view = self.view.name(), %component, "Replaced component handler");
        }
    }

    pub fn set_global_handler<G: GlobalShortcutHandler + 'static>(&mut self, handler: G) {
        self.global = Some(Box::new(handler));
    }

    #[must_use]
    pub fn with_global_handler<G: GlobalShortcutHandler + 'static>(mut self, handler: G) -> Self {
        self.set_global_handler(handler);
        self
    }

    /// Forward errors reported by handlers to `errors`.
    #[must_use]
    pub fn with_error_handler(mut self, errors: Rc<ErrorHandler>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn has_handler(&self, component: ComponentType) -> bool {
        self.handlers.contains_key(&component)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub const fn metrics(&self) -> &EventMetrics {
        &self.metrics
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Dispatch one input event.
    ///
    /// Returns `None` when the event was consumed, or the event itself when
    /// the host should handle it.
    pub fn process_event(&mut self, event: Event, current_focus: Option<FocusId>) -> Option<Event> {
        let started = Instant::now();
        self.sequence += 1;
        let mut ctx =
            EventContext::new(event.clone(), current_focus, &self.session_id, self.sequence);

        let result = self.dispatch(event, current_focus, &mut ctx);

        ctx.duration = started.elapsed();
        self.finish(ctx);
        result
    }

    fn dispatch(
        &mut self,
        mut event: Event,
        focus: Option<FocusId>,
        ctx: &mut EventContext,
    ) -> Option<Event> {
        let component = focus.and_then(|focus| self.resolver.component_type(focus));
        ctx.component = component;

        if let Some(handler) = component.and_then(|c| self.handlers.get_mut(&c))
            && handler.can_handle(&event, focus)
        {
            match handler.handle_event(event, ctx) {
                None => {
                    if ctx.outcome == EventOutcome::Unhandled {
                        ctx.outcome = EventOutcome::Handled;
                    }
                    return None;
                }
                Some(returned) => {
                    if ctx.outcome == EventOutcome::Unhandled {
                        ctx.outcome = EventOutcome::Propagated;
                    }
                    event = returned;
                }
            }
        }

        if let Some(global) = self.global.as_mut() {
            match global.handle_global_shortcut(event, focus, self.view.as_ref()) {
                None => {
                    mark_consumed(ctx);
                    return None;
                }
                Some(returned) => event = returned,
            }
        }

        if let Some(step) = self.focus_step(&event) {
            self.move_focus(focus, step);
            mark_consumed(ctx);
            return None;
        }

        Some(event)
    }

    fn focus_step(&self, event: &Event) -> Option<FocusStep> {
        let Event::Key(key) = event else {
            return None;
        };
        if self.keys.matches_nav(key, NavAction::NextFocus) {
            Some(FocusStep::Next)
        } else if self.keys.matches_nav(key, NavAction::PrevFocus) {
            Some(FocusStep::Previous)
        } else {
            None
        }
    }

    /// Explicit order from the resolver, else all components in registration order.
    fn navigation_order(&self) -> Vec<FocusId> {
        let order = self.resolver.navigation_order();
        if !order.is_empty() {
            return order;
        }
        self.resolver.components().into_iter().flatten().collect()
    }

    fn move_focus(&self, current: Option<FocusId>, step: FocusStep) {
        let order = self.navigation_order();
        let Some(target) = next_focus(&order, current, step) else {
            debug!(view = self.view.name(), "No focusable components");
            return;
        };
        debug!(view = self.view.name(), ?current, %target, ?step, "Moving focus");
        self.view.manager().set_focus(target);
    }

    fn finish(&mut self, mut ctx: EventContext) {
        debug!(
            view = self.view.name(),
            trace_id = %ctx.trace_id,
            component = ?ctx.component,
            action = ?ctx.action.as_ref().map(|a| a.kind),
            outcome = %ctx.outcome,
            duration_us = ctx.duration.as_micros(),
            "Dispatched event"
        );

        if self.config.enable_metrics {
            self.metrics.record(ctx.record());
        }

        if let Some(error) = ctx.error.take() {
            match &self.errors {
                Some(errors) => errors.handle_error(Some(error.into())),
                None => warn!(trace_id = %ctx.trace_id, %error, "Handler reported an error"),
            }
        }
    }
}

const fn mark_consumed(ctx: &mut EventContext) {
    if matches!(ctx.outcome, EventOutcome::Unhandled | EventOutcome::Propagated) {
        ctx.outcome = EventOutcome::Handled;
    }
}

/// Focus target after one step, wrapping in both directions.
///
/// A focus not present in `order` counts as index -1: stepping forward lands
/// on the first entry and stepping back on the last.
fn next_focus(order: &[FocusId], current: Option<FocusId>, step: FocusStep) -> Option<FocusId> {
    let len = order.len();
    if len == 0 {
        return None;
    }
    let index = current.and_then(|current| order.iter().position(|f| *f == current));
    let target = match (index, step) {
        (None, FocusStep::Next) => 0,
        (None, FocusStep::Previous) => len - 1,
        (Some(i), FocusStep::Next) => (i + 1) % len,
        (Some(i), FocusStep::Previous) => (i + len - 1) % len,
    };
    Some(order[target])
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;
    use crate::config::ErrorConfig;
    use crate::error::{ErrorCode, ErrorCounters};
    use crate::event::handler::HandlerBase;
    use crate::view::Manager;

    const A: ComponentType = ComponentType(1);
    const B: ComponentType = ComponentType(2);

    #[derive(Default)]
    struct TestResolver {
        types: HashMap<FocusId, ComponentType>,
        order: Vec<FocusId>,
        components: Vec<Option<FocusId>>,
    }

    impl ComponentResolver for TestResolver {
        fn component_type(&self, focus: FocusId) -> Option<ComponentType> {
            self.types.get(&focus).copied()
        }

        fn navigation_order(&self) -> Vec<FocusId> {
            self.order.clone()
        }

        fn components(&self) -> Vec<Option<FocusId>> {
            self.components.clone()
        }
    }

    #[derive(Default)]
    struct TestManager {
        focused: RefCell<Vec<FocusId>>,
        stopped: Cell<bool>,
    }

    impl Manager for TestManager {
        fn set_focus(&self, target: FocusId) {
            self.focused.borrow_mut().push(target);
        }

        fn stop(&self) {
            self.stopped.set(true);
        }
    }

    struct TestView {
        resolver: Rc<TestResolver>,
        manager: Rc<TestManager>,
    }

    impl View for TestView {
        fn name(&self) -> &str {
            "test"
        }

        fn resolver(&self) -> Rc<dyn ComponentResolver> {
            self.resolver.clone()
        }

        fn manager(&self) -> Rc<dyn Manager> {
            self.manager.clone()
        }
    }

    /// Consumes every event when `claims` is set, otherwise hands it back.
    struct Recorder {
        base: HandlerBase,
        claims: bool,
        calls: Rc<Cell<u32>>,
    }

    impl ComponentHandler for Recorder {
        fn base(&self) -> &HandlerBase {
            &self.base
        }

        fn handle_event(&mut self, event: Event, _ctx: &mut EventContext) -> Option<Event> {
            self.calls.set(self.calls.get() + 1);
            if self.claims { None } else { Some(event) }
        }
    }

    struct GlobalRecorder {
        claims: bool,
        calls: Rc<Cell<u32>>,
    }

    impl GlobalShortcutHandler for GlobalRecorder {
        fn handle_global_shortcut(
            &mut self,
            event: Event,
            _focus: Option<FocusId>,
            _view: &dyn View,
        ) -> Option<Event> {
            self.calls.set(self.calls.get() + 1);
            if self.claims { None } else { Some(event) }
        }
    }

    struct Fixture {
        dispatcher: EventDispatcher,
        resolver: Rc<TestResolver>,
        manager: Rc<TestManager>,
    }

    fn fixture(resolver: TestResolver) -> Fixture {
        let resolver = Rc::new(resolver);
        let manager = Rc::new(TestManager::default());
        let view = Rc::new(TestView {
            resolver: Rc::clone(&resolver),
            manager: Rc::clone(&manager),
        });
        let dispatcher =
            EventDispatcher::new(view, Arc::new(KeyResolver::default()), EventConfig::default());
        Fixture {
            dispatcher,
            resolver,
            manager,
        }
    }

    fn two_components() -> TestResolver {
        TestResolver {
            types: HashMap::from([(FocusId(1), A), (FocusId(2), B)]),
            components: vec![Some(FocusId(1)), Some(FocusId(2))],
            ..TestResolver::default()
        }
    }

    fn recorder(f: &Fixture, component: ComponentType, claims: bool) -> (Recorder, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let resolver: Rc<dyn ComponentResolver> = f.resolver.clone();
        let handler = Recorder {
            base: HandlerBase::new(component, resolver),
            claims,
            calls: Rc::clone(&calls),
        };
        (handler, calls)
    }

    fn global(f: &mut Fixture, claims: bool) -> Rc<Cell<u32>> {
        let calls = Rc::new(Cell::new(0));
        f.dispatcher.set_global_handler(GlobalRecorder {
            claims,
            calls: Rc::clone(&calls),
        });
        calls
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn back_tab() -> Event {
        Event::Key(KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT))
    }

    #[test]
    fn test_component_handler_wins() {
        let mut f = fixture(two_components());
        let (a, a_calls) = recorder(&f, A, true);
        let (b, b_calls) = recorder(&f, B, true);
        f.dispatcher.register_handler(a);
        f.dispatcher.register_handler(b);
        let global_calls = global(&mut f, true);

        let result = f.dispatcher.process_event(key(KeyCode::Tab), Some(FocusId(1)));

        assert!(result.is_none());
        assert_eq!(a_calls.get(), 1);
        assert_eq!(b_calls.get(), 0);
        assert_eq!(global_calls.get(), 0);
        assert!(f.manager.focused.borrow().is_empty());
        assert_eq!(f.dispatcher.metrics().last().unwrap().outcome, EventOutcome::Handled);
    }

    #[test]
    fn test_returned_event_reaches_global_handler() {
        let mut f = fixture(two_components());
        let (a, a_calls) = recorder(&f, A, false);
        f.dispatcher.register_handler(a);
        let global_calls = global(&mut f, true);

        let result = f.dispatcher.process_event(key(KeyCode::Char('q')), Some(FocusId(1)));

        assert!(result.is_none());
        assert_eq!(a_calls.get(), 1);
        assert_eq!(global_calls.get(), 1);
    }

    #[test]
    fn test_global_handler_beats_navigation() {
        let mut f = fixture(two_components());
        let global_calls = global(&mut f, true);

        assert!(f.dispatcher.process_event(key(KeyCode::Tab), Some(FocusId(1))).is_none());

        assert_eq!(global_calls.get(), 1);
        assert!(f.manager.focused.borrow().is_empty());
    }

    #[test]
    fn test_handler_for_other_type_is_not_called() {
        let mut f = fixture(two_components());
        let (b, b_calls) = recorder(&f, B, true);
        f.dispatcher.register_handler(b);

        let event = key(KeyCode::Char('x'));
        let result = f.dispatcher.process_event(event.clone(), Some(FocusId(1)));

        assert_eq!(result, Some(event));
        assert_eq!(b_calls.get(), 0);
        assert_eq!(f.dispatcher.metrics().last().unwrap().outcome, EventOutcome::Unhandled);
    }

    #[test]
    fn test_unclaimed_event_passes_through() {
        let mut f = fixture(two_components());
        let (a, _) = recorder(&f, A, false);
        f.dispatcher.register_handler(a);
        let global_calls = global(&mut f, false);

        let event = key(KeyCode::Char('z'));
        let result = f.dispatcher.process_event(event.clone(), Some(FocusId(1)));

        assert_eq!(result, Some(event));
        assert_eq!(global_calls.get(), 1);
        assert_eq!(f.dispatcher.metrics().last().unwrap().outcome, EventOutcome::Propagated);
    }

    #[test]
    fn test_tab_without_match_lands_on_first() {
        let mut f = fixture(two_components());
        assert!(f.dispatcher.process_event(key(KeyCode::Tab), Some(FocusId(99))).is_none());
        assert!(f.dispatcher.process_event(key(KeyCode::Tab), None).is_none());
        assert_eq!(*f.manager.focused.borrow(), vec![FocusId(1), FocusId(1)]);
    }

    #[test]
    fn test_back_tab_without_match_lands_on_last() {
        let mut f = fixture(two_components());
        assert!(f.dispatcher.process_event(back_tab(), None).is_none());
        assert_eq!(*f.manager.focused.borrow(), vec![FocusId(2)]);
    }

    #[test]
    fn test_navigation_wraps_both_ways() {
        let order: Vec<FocusId> = (10..15).map(FocusId).collect();
        for (i, current) in order.iter().enumerate() {
            let next = next_focus(&order, Some(*current), FocusStep::Next).unwrap();
            let prev = next_focus(&order, Some(*current), FocusStep::Previous).unwrap();
            assert_eq!(next, order[(i + 1) % order.len()]);
            assert_eq!(prev, order[(i + order.len() - 1) % order.len()]);
        }
    }

    #[test]
    fn test_explicit_order_preferred() {
        let mut f = fixture(TestResolver {
            order: vec![FocusId(2), FocusId(1)],
            ..two_components()
        });
        f.dispatcher.process_event(key(KeyCode::Tab), Some(FocusId(2)));
        assert_eq!(*f.manager.focused.borrow(), vec![FocusId(1)]);
    }

    #[test]
    fn test_component_fallback_skips_empty_slots() {
        let mut f = fixture(TestResolver {
            components: vec![None, Some(FocusId(1)), None, Some(FocusId(2))],
            ..two_components()
        });
        f.dispatcher.process_event(key(KeyCode::Tab), Some(FocusId(1)));
        f.dispatcher.process_event(back_tab(), Some(FocusId(1)));
        assert_eq!(*f.manager.focused.borrow(), vec![FocusId(2), FocusId(2)]);
    }

    #[test]
    fn test_tab_with_nothing_to_focus_is_consumed() {
        let mut f = fixture(TestResolver::default());

        assert!(f.dispatcher.process_event(key(KeyCode::Tab), None).is_none());
        assert!(f.dispatcher.process_event(back_tab(), None).is_none());

        assert!(f.manager.focused.borrow().is_empty());
        assert!(!f.manager.stopped.get());
    }

    #[test]
    fn test_non_key_events_propagate() {
        let mut f = fixture(two_components());
        let event = Event::Resize(80, 24);
        assert_eq!(f.dispatcher.process_event(event.clone(), None), Some(event));
        assert!(f.manager.focused.borrow().is_empty());
    }

    #[test]
    fn test_register_replaces_existing_handler() {
        let mut f = fixture(two_components());
        let (first, first_calls) = recorder(&f, A, true);
        let (second, second_calls) = recorder(&f, A, true);
        f.dispatcher.register_handler(first);
        f.dispatcher.register_handler(second);

        f.dispatcher.process_event(key(KeyCode::Enter), Some(FocusId(1)));

        assert_eq!(f.dispatcher.handler_count(), 1);
        assert!(f.dispatcher.has_handler(A));
        assert_eq!(first_calls.get(), 0);
        assert_eq!(second_calls.get(), 1);
    }

    struct Failing {
        base: HandlerBase,
        errors: Rc<ErrorHandler>,
    }

    impl ComponentHandler for Failing {
        fn base(&self) -> &HandlerBase {
            &self.base
        }

        fn handle_event(&mut self, _event: Event, ctx: &mut EventContext) -> Option<Event> {
            ctx.fail(self.errors.factory().new_error(ErrorCode::UserInputError, "bad key", None));
            None
        }
    }

    #[test]
    fn test_handler_errors_reach_error_pipeline() {
        let counters = Rc::new(ErrorCounters::default());
        let config = ErrorConfig {
            capture_stack: false,
            enable_metrics: true,
            ..ErrorConfig::default()
        };
        let errors = Rc::new(ErrorHandler::new("test", config).with_metrics(Rc::clone(&counters)));

        let f = fixture(two_components());
        let resolver: Rc<dyn ComponentResolver> = f.resolver.clone();
        let mut dispatcher = f.dispatcher.with_error_handler(Rc::clone(&errors));
        dispatcher.register_handler(Failing {
            base: HandlerBase::new(A, resolver),
            errors,
        });

        assert!(dispatcher.process_event(key(KeyCode::Char('x')), Some(FocusId(1))).is_none());

        assert_eq!(counters.count(ErrorCode::UserInputError), 1);
        assert_eq!(dispatcher.metrics().last().unwrap().outcome, EventOutcome::Error);
    }

    #[test]
    fn test_metrics_track_components_and_keys() {
        let mut f = fixture(two_components());
        let (a, _) = recorder(&f, A, true);
        f.dispatcher.register_handler(a);

        f.dispatcher.process_event(key(KeyCode::Char('j')), Some(FocusId(1)));
        f.dispatcher.process_event(key(KeyCode::Char('j')), Some(FocusId(1)));
        f.dispatcher.process_event(key(KeyCode::Tab), Some(FocusId(2)));

        let metrics = f.dispatcher.metrics();
        assert_eq!(metrics.total, 3);
        assert_eq!(metrics.by_component[&A], 2);
        assert_eq!(metrics.by_component[&B], 1);
        assert_eq!(metrics.by_key["j"], 2);
        assert_eq!(metrics.history_len(), 3);

        let traces: Vec<_> = metrics.history().map(|r| r.trace_id.clone()).collect();
        assert!(traces.iter().all(|t| t.starts_with(f.dispatcher.session_id())));
    }
}
