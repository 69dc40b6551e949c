pub mod actions;
pub mod key;
pub mod keybindings;
pub mod loader;
pub mod resolver;

pub use actions::*;
pub use key::{Key, KeyBinding};
pub use keybindings::KeybindingsConfig;
pub use loader::{config_dir, config_path, load, load_from};
pub use resolver::KeyResolver;
use serde::{Deserialize, Serialize};

/// Settings for error classification and the handling pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorConfig {
    /// Attach a call-stack snapshot to every new error.
    pub capture_stack: bool,
    pub max_stack_depth: usize,
    /// Include context metadata in error log records.
    pub log_metadata: bool,
    pub enable_metrics: bool,
    pub enable_recovery: bool,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            capture_stack: true,
            max_stack_depth: 10,
            log_metadata: true,
            enable_metrics: false,
            enable_recovery: true,
        }
    }
}

/// Settings for event dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub enable_metrics: bool,
    /// Number of finished dispatches kept for inspection.
    pub max_history: usize,
    pub max_filter_length: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            max_history: 100,
            max_filter_length: 64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub errors: ErrorConfig,
    #[serde(default)]
    pub events: EventConfig,
    #[serde(default)]
    pub keybindings: KeybindingsConfig,
}

#[cfg(test)]
mod tests {
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.errors, ErrorConfig::default());
        assert_eq!(config.events, EventConfig::default());
    }

    #[test]
    fn test_partial_sections_override_only_given_fields() {
        let config: AppConfig = toml::from_str(
            r#"
            [errors]
            capture_stack = false

            [events]
            max_history = 5

            [keybindings.navigation]
            next_focus = "ctrl+n"
            "#,
        )
        .unwrap();

        assert!(!config.errors.capture_stack);
        assert_eq!(config.errors.max_stack_depth, 10);
        assert_eq!(config.events.max_history, 5);

        let resolver = KeyResolver::new(std::sync::Arc::new(config.keybindings));
        let ctrl_n = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert!(resolver.matches_nav(&ctrl_n, NavAction::NextFocus));
        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        assert!(resolver.matches_nav(&down, NavAction::Down));
    }
}
