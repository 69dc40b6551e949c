use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use color_eyre::Result;
use crossterm::event::{Event as CrosstermEvent, KeyCode};
use lazyview::config::{AppConfig, FilterAction, GlobalAction, Key, KeyResolver, NavAction};
use lazyview::error::{
    ErrorCode, ErrorCounters, ErrorFactory, ErrorHandler, Failure, RecoveryDispatcher, ViewError,
};
use lazyview::event::handlers::{
    CellCursor, DefaultGlobalShortcuts, FilterPrompt, FilterPromptHandler, ListNavigationHandler,
    ListSelection, TableCellHandler,
};
use lazyview::event::{
    ActionType, CUSTOM_ACTION_BASE, EventDispatcher, HandlerBase, KeyAction, KeyMap, KeyMapping,
};
use lazyview::view::{FocusId, Manager, View};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, List, ListItem, ListState, Paragraph, Row, Table, TableState,
};
use tracing::debug;

use crate::demo::{
    DemoManager, DemoView, FILTER_FOCUS, FILTER_PROMPT, INSTANCE_HEADER, INSTANCE_TABLE,
    INSTANCES, INSTANCES_FOCUS, SERVICE_LIST, SERVICES, SERVICES_FOCUS,
};
use crate::tui::{Event, Tui};

const FRAME_RATE: f64 = 30.0;
const TICK_RATE: f64 = 4.0;

const REFRESH: ActionType = ActionType::Custom(CUSTOM_ACTION_BASE);

/// Message shown in the status bar until the next key press.
type StatusLine = Rc<RefCell<Option<String>>>;

pub struct App {
    dispatcher: EventDispatcher,
    manager: Rc<DemoManager>,
    keys: Arc<KeyResolver>,
    errors: Rc<ErrorHandler>,
    error_counts: Rc<ErrorCounters>,
    services: Rc<RefCell<ListSelection>>,
    instances: Rc<RefCell<CellCursor>>,
    filter: Rc<RefCell<FilterPrompt>>,
    status: StatusLine,
}

impl App {
    pub fn new(config: &AppConfig) -> Self {
        let keys = Arc::new(KeyResolver::new(Arc::new(config.keybindings.clone())));
        let manager = Rc::new(DemoManager::new(SERVICES_FOCUS));
        let view: Rc<dyn View> = Rc::new(DemoView::new(Rc::clone(&manager)));
        let status = StatusLine::default();

        let factory = ErrorFactory::new(view.name(), config.errors);
        let error_counts = Rc::new(ErrorCounters::default());
        let errors = Rc::new(
            ErrorHandler::with_factory(factory.clone())
                .with_metrics(Rc::clone(&error_counts))
                .with_recovery(status_recovery(&status)),
        );

        let services = Rc::new(RefCell::new(ListSelection::new(SERVICES.len())));
        let instances = Rc::new(RefCell::new(CellCursor::new(
            INSTANCES.len(),
            INSTANCE_HEADER.len(),
        )));
        let filter = Rc::new(RefCell::new(FilterPrompt::default()));

        let shortcuts = DefaultGlobalShortcuts::new(Arc::clone(&keys))
            .with_keymap(global_keymap(), refresh_action(&errors, &status));

        let resolver = view.resolver();
        let mut dispatcher = EventDispatcher::new(view, Arc::clone(&keys), config.events)
            .with_error_handler(Rc::clone(&errors))
            .with_global_handler(shortcuts);
        dispatcher.register_handler(ListNavigationHandler::new(
            HandlerBase::new(SERVICE_LIST, Rc::clone(&resolver)),
            Arc::clone(&keys),
            Rc::clone(&services),
        ));
        dispatcher.register_handler(TableCellHandler::new(
            HandlerBase::new(INSTANCE_TABLE, Rc::clone(&resolver)),
            Arc::clone(&keys),
            Rc::clone(&instances),
        ));
        dispatcher.register_handler(FilterPromptHandler::new(
            HandlerBase::new(FILTER_PROMPT, resolver),
            Arc::clone(&keys),
            Rc::clone(&filter),
            config.events.max_filter_length,
            factory,
        ));

        Self {
            dispatcher,
            manager,
            keys,
            errors,
            error_counts,
            services,
            instances,
            filter,
            status,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new(FRAME_RATE, TICK_RATE)?;
        tui.enter()?;

        while !self.manager.is_stopped() {
            let Some(event) = tui.next_event().await else {
                break;
            };

            match event {
                Event::Quit => self.manager.stop(),
                Event::Render => self.render(&mut tui)?,
                Event::Error(message) => {
                    self.errors.handle_error(Some(Failure::other(message)));
                }
                Event::Input(input) => self.handle_input(&mut tui, input)?,
                Event::Tick => {}
            }
        }

        tui.exit()?;
        Ok(())
    }

    fn handle_input(&mut self, tui: &mut Tui, input: CrosstermEvent) -> Result<()> {
        match self.dispatch(input) {
            Some(CrosstermEvent::Resize(width, height)) => {
                tui.resize(Rect::new(0, 0, width, height))?;
                self.render(tui)?;
            }
            Some(event) => debug!(?event, "Unhandled input"),
            None => {}
        }
        Ok(())
    }

    /// Route one input through the dispatcher and refresh derived state.
    fn dispatch(&mut self, input: CrosstermEvent) -> Option<CrosstermEvent> {
        if matches!(input, CrosstermEvent::Key(_)) {
            self.status.borrow_mut().take();
        }
        let unhandled = self.dispatcher.process_event(input, Some(self.manager.focus()));
        self.sync_instances();
        unhandled
    }

    /// Keep the table cursor inside the filtered rows.
    fn sync_instances(&self) {
        let visible = self.visible_instances().count();
        let mut cursor = self.instances.borrow_mut();
        cursor.rows = visible;
        cursor.row = cursor.row.min(visible.saturating_sub(1));
    }

    fn visible_instances(&self) -> impl Iterator<Item = &'static [&'static str; 3]> {
        let filter = self.filter.borrow().clone();
        INSTANCES.iter().filter(move |row| filter.accepts(row[0]))
    }

    fn render(&self, tui: &mut Tui) -> Result<()> {
        tui.draw(|frame| self.draw(frame))?;
        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        let [main, filter_area, status_area] = Layout::vertical([
            Constraint::Min(5),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .areas(frame.area());
        let [services_area, instances_area] =
            Layout::horizontal([Constraint::Percentage(30), Constraint::Percentage(70)])
                .areas(main);

        self.draw_services(frame, services_area);
        self.draw_instances(frame, instances_area);
        self.draw_filter(frame, filter_area);
        self.draw_status(frame, status_area);
    }

    fn pane(&self, title: &str, focus: FocusId) -> Block<'static> {
        let color = if self.manager.focus() == focus {
            Color::Cyan
        } else {
            Color::DarkGray
        };
        Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(color))
            .title(format!(" {title} "))
    }

    fn draw_services(&self, frame: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = SERVICES.iter().map(|name| ListItem::new(*name)).collect();
        let list = List::new(items)
            .block(self.pane("Services", SERVICES_FOCUS))
            .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .highlight_symbol("▶ ");

        let mut state = ListState::default().with_selected(Some(self.services.borrow().selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_instances(&self, frame: &mut Frame, area: Rect) {
        let rows: Vec<Row> = self
            .visible_instances()
            .map(|row| Row::new(row.iter().copied()))
            .collect();
        let widths = [
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ];
        let table = Table::new(rows, widths)
            .header(Row::new(INSTANCE_HEADER).style(Style::default().add_modifier(Modifier::BOLD)))
            .block(self.pane("Instances", INSTANCES_FOCUS))
            .row_highlight_style(Style::default().bg(Color::DarkGray))
            .cell_highlight_style(Style::default().fg(Color::Black).bg(Color::Cyan));

        let cursor = *self.instances.borrow();
        let mut state = TableState::default()
            .with_selected(Some(cursor.row))
            .with_selected_column(Some(cursor.col));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_filter(&self, frame: &mut Frame, area: Rect) {
        let prompt = self.filter.borrow();
        let mut spans = vec![Span::raw(prompt.input.clone())];
        if self.manager.focus() == FILTER_FOCUS {
            spans.push(Span::styled(" ", Style::default().bg(Color::White)));
        } else if prompt.input.is_empty() {
            spans.push(Span::styled("type to filter", Style::default().fg(Color::DarkGray)));
        }
        if let Some(applied) = &prompt.applied {
            spans.push(Span::styled(
                format!("  [showing: {applied}]"),
                Style::default().fg(Color::Yellow),
            ));
        }

        let title = format!(
            "Filter ({} apply, {} clear)",
            self.keys.display_filter(FilterAction::Confirm),
            self.keys.display_filter(FilterAction::Cancel),
        );
        let paragraph = Paragraph::new(Line::from(spans)).block(self.pane(&title, FILTER_FOCUS));
        frame.render_widget(paragraph, area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered()
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [message_area, counters_area] =
            Layout::horizontal([Constraint::Min(20), Constraint::Length(36)]).areas(inner);

        let message = self.status.borrow().clone().map_or_else(
            || {
                Line::from(format!(
                    "{} next pane  {} previous pane  {} quit",
                    self.keys.display_nav(NavAction::NextFocus),
                    self.keys.display_nav(NavAction::PrevFocus),
                    self.keys.display_global(GlobalAction::Quit),
                ))
                .style(Style::default().fg(Color::DarkGray))
            },
            |message| Line::from(message).style(Style::default().fg(Color::Yellow)),
        );
        frame.render_widget(Paragraph::new(message), message_area);

        let metrics = self.dispatcher.metrics();
        let last = metrics
            .last()
            .map_or_else(String::new, |record| record.outcome.to_string());
        let counters = format!(
            "{last} | events {} | errors {}",
            metrics.total,
            self.error_counts.total()
        );
        frame.render_widget(Paragraph::new(counters).right_aligned(), counters_area);
    }
}

fn global_keymap() -> KeyMap {
    [KeyMapping::global(Key::new(KeyCode::Char('r')), KeyAction::bare(REFRESH))]
        .into_iter()
        .collect()
}

/// Show the sanitized message of recoverable input errors.
fn status_recovery(status: &StatusLine) -> RecoveryDispatcher {
    let mut recovery = RecoveryDispatcher::new();
    let status = Rc::clone(status);
    recovery.register(ErrorCode::ValidationFailure, move |err: &ViewError| {
        *status.borrow_mut() = Some(err.user_message.clone());
    });
    recovery
}

/// Every second refresh times out, to show the retry policy in the status bar.
fn refresh_action(
    errors: &Rc<ErrorHandler>,
    status: &StatusLine,
) -> impl FnMut(&KeyAction, Option<FocusId>) + 'static {
    let errors = Rc::clone(errors);
    let status = Rc::clone(status);
    let refreshes = Cell::new(0_u32);
    move |action: &KeyAction, _focus: Option<FocusId>| {
        if action.kind != REFRESH {
            return;
        }
        refreshes.set(refreshes.get() + 1);
        if refreshes.get() % 2 == 1 {
            *status.borrow_mut() = Some("Refreshed".to_string());
            return;
        }

        let cause = "deadline exceeded while listing instances".into();
        let err = errors.report(errors.factory().wrap_network("refresh", cause));
        let message = match err.retry_policy() {
            (true, delay) => format!("{} Retrying in {}s.", err.user_message, delay.as_secs()),
            (false, _) => err.user_message,
        };
        *status.borrow_mut() = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyEvent, KeyModifiers};
    use lazyview::config::ErrorConfig;
    use lazyview::event::EventOutcome;

    use super::*;

    fn app() -> App {
        let config = AppConfig {
            errors: ErrorConfig {
                capture_stack: false,
                enable_metrics: true,
                ..ErrorConfig::default()
            },
            ..AppConfig::default()
        };
        App::new(&config)
    }

    fn press(app: &mut App, code: KeyCode) -> Option<CrosstermEvent> {
        app.dispatch(CrosstermEvent::Key(KeyEvent::new(code, KeyModifiers::NONE)))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert!(press(app, KeyCode::Char(c)).is_none());
        }
    }

    #[test]
    fn test_tab_cycles_panes() {
        let mut app = app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.manager.focus(), INSTANCES_FOCUS);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.manager.focus(), FILTER_FOCUS);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.manager.focus(), SERVICES_FOCUS);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.manager.focus(), FILTER_FOCUS);
    }

    #[test]
    fn test_filter_narrows_table() {
        let mut app = app();
        app.instances.borrow_mut().row = 6;
        press(&mut app, KeyCode::BackTab);
        type_text(&mut app, "cache");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.visible_instances().count(), 2);
        assert_eq!(app.instances.borrow().rows, 2);
        assert_eq!(app.instances.borrow().row, 1);
        assert!(!app.manager.is_stopped());
    }

    #[test]
    fn test_quit_key_stops_outside_filter() {
        let mut app = app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.manager.is_stopped());
    }

    #[test]
    fn test_long_filter_shows_user_message() {
        let config = AppConfig {
            errors: ErrorConfig {
                capture_stack: false,
                enable_metrics: true,
                ..ErrorConfig::default()
            },
            events: lazyview::config::EventConfig {
                max_filter_length: 2,
                ..lazyview::config::EventConfig::default()
            },
            ..AppConfig::default()
        };
        let mut app = App::new(&config);
        press(&mut app, KeyCode::BackTab);
        type_text(&mut app, "abc");
        press(&mut app, KeyCode::Enter);

        assert_eq!(
            app.status.borrow().as_deref(),
            Some(ErrorCode::ValidationFailure.user_message())
        );
        assert_eq!(app.error_counts.count(ErrorCode::ValidationFailure), 1);
        assert_eq!(
            app.dispatcher.metrics().last().map(|r| r.outcome),
            Some(EventOutcome::Error)
        );
    }

    #[test]
    fn test_second_refresh_reports_retry() {
        let mut app = app();
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.status.borrow().as_deref(), Some("Refreshed"));

        press(&mut app, KeyCode::Char('r'));
        let status = app.status.borrow().clone().unwrap();
        assert!(status.starts_with(ErrorCode::Timeout.user_message()));
        assert!(status.ends_with("Retrying in 2s."));
        assert_eq!(app.error_counts.count(ErrorCode::Timeout), 1);
    }

    #[test]
    fn test_resize_is_left_to_the_host() {
        let mut app = app();
        let resize = CrosstermEvent::Resize(100, 40);
        assert_eq!(app.dispatch(resize.clone()), Some(resize));
    }
}
