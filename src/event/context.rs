use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::Event;
use serde_json::Value;

use crate::config::Key;
use crate::error::ViewError;
use crate::event::action::{ActionType, KeyAction};
use crate::view::{ComponentType, FocusId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventOutcome {
    Handled,
    Unhandled,
    Propagated,
    Cancelled,
    Error,
}

impl fmt::Display for EventOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Handled => "handled",
            Self::Unhandled => "unhandled",
            Self::Propagated => "propagated",
            Self::Cancelled => "cancelled",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Everything known about one dispatch. Built fresh for every event.
#[derive(Debug)]
pub struct EventContext {
    pub event: Event,
    pub focus: Option<FocusId>,
    pub component: Option<ComponentType>,
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    pub session_id: String,
    pub metadata: BTreeMap<String, Value>,
    pub action: Option<KeyAction>,
    pub outcome: EventOutcome,
    pub duration: Duration,
    pub error: Option<ViewError>,
}

impl EventContext {
    pub fn new(event: Event, focus: Option<FocusId>, session_id: &str, sequence: u64) -> Self {
        Self {
            event,
            focus,
            component: None,
            timestamp: Utc::now(),
            trace_id: format!("{session_id}-{sequence}"),
            session_id: session_id.to_string(),
            metadata: BTreeMap::new(),
            action: None,
            outcome: EventOutcome::Unhandled,
            duration: Duration::ZERO,
            error: None,
        }
    }

    /// Record the action a handler resolved the event to.
    pub fn set_action(&mut self, action: KeyAction) {
        self.action = Some(action);
    }

    /// Mark the event as cancelling the current interaction.
    pub const fn cancel(&mut self) {
        self.outcome = EventOutcome::Cancelled;
    }

    /// Attach a failure. The dispatch ends with [`EventOutcome::Error`].
    pub fn fail(&mut self, error: ViewError) {
        self.error = Some(error);
        self.outcome = EventOutcome::Error;
    }

    /// The literal key of a key event, as it would be written in the config.
    pub fn key_literal(&self) -> Option<String> {
        match &self.event {
            Event::Key(key) => Some(Key::from_event(key).display()),
            _ => None,
        }
    }

    pub fn record(&self) -> EventRecord {
        EventRecord {
            timestamp: self.timestamp,
            trace_id: self.trace_id.clone(),
            component: self.component,
            action: self.action.as_ref().map(|a| a.kind),
            key: self.key_literal(),
            outcome: self.outcome,
            duration: self.duration,
        }
    }
}

/// Summary of a finished dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    pub trace_id: String,
    pub component: Option<ComponentType>,
    pub action: Option<ActionType>,
    pub key: Option<String>,
    pub outcome: EventOutcome,
    pub duration: Duration,
}

/// Aggregate dispatch counters plus a bounded history.
#[derive(Debug, Clone, Default)]
pub struct EventMetrics {
    pub total: u64,
    pub by_component: HashMap<ComponentType, u64>,
    pub by_action: HashMap<ActionType, u64>,
    pub by_key: HashMap<String, u64>,
    pub by_outcome: HashMap<EventOutcome, u64>,
    history: VecDeque<EventRecord>,
    max_history: usize,
}

impl EventMetrics {
    pub fn new(max_history: usize) -> Self {
        Self {
            max_history,
            ..Self::default()
        }
    }

    pub fn record(&mut self, record: EventRecord) {
        self.total += 1;
        if let Some(component) = record.component {
            *self.by_component.entry(component).or_default() += 1;
        }
        if let Some(action) = record.action {
            *self.by_action.entry(action).or_default() += 1;
        }
        if let Some(key) = &record.key {
            *self.by_key.entry(key.clone()).or_default() += 1;
        }
        *self.by_outcome.entry(record.outcome).or_default() += 1;

        if self.max_history == 0 {
            return;
        }
        while self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    /// Oldest first.
    pub fn history(&self) -> impl Iterator<Item = &EventRecord> {
        self.history.iter()
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.history.back()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }
}
