//! UI visibility projection
//!
//! Derived, non-authoritative view state computed from the session flags
//! and configuration messages. Nothing here feeds back into transitions.

use serde::{Deserialize, Serialize};

/// Tabs the preview panel can show
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tab {
    /// Conversation with the agent
    #[default]
    Preview,
    /// Agent execution tracer
    Tracer,
}

/// Tab-related view state owned by the UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabState {
    /// Tracer tab has been enabled by configuration
    pub tracer_enabled: bool,
    /// Currently selected tab
    pub active_tab: Tab,
}

impl TabState {
    /// Apply a tracer configuration value
    ///
    /// Disabling the tracer while it is active falls back to the preview tab.
    pub fn set_tracer_enabled(&mut self, enabled: bool) {
        self.tracer_enabled = enabled;
        if !enabled && self.active_tab == Tab::Tracer {
            self.active_tab = Tab::Preview;
        }
    }

    /// Select a tab; the tracer tab is only selectable when enabled
    pub fn select(&mut self, tab: Tab) {
        self.active_tab = match tab {
            Tab::Tracer if !self.tracer_enabled => Tab::Preview,
            other => other,
        };
    }

    /// Tabs that exist right now
    pub fn available_tabs(&self) -> Vec<Tab> {
        if self.tracer_enabled {
            vec![Tab::Preview, Tab::Tracer]
        } else {
            vec![Tab::Preview]
        }
    }
}

/// Snapshot of everything the UI renders from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    /// Agent the user or host wants active
    pub desired_agent_id: String,
    /// Agent confirmed to back an active session
    pub displayed_agent_id: String,
    /// Host's view of whether a session is live
    pub session_active: bool,
    /// A session end and/or start is in flight
    pub transitioning: bool,
    /// Tab view state
    pub tabs: TabState,
    /// Last host-reported error, cleared on the next successful start
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl UiState {
    /// Some agent is previewable
    pub fn has_agent(&self) -> bool {
        !self.desired_agent_id.is_empty() || !self.displayed_agent_id.is_empty()
    }

    /// Whether the tab bar is rendered at all
    ///
    /// Hidden when no agent is previewable and while transitioning.
    pub fn show_tab_bar(&self) -> bool {
        self.has_agent() && !self.transitioning
    }

    /// Whether the tracer tab is shown in the bar
    pub fn show_tracer_tab(&self) -> bool {
        self.show_tab_bar() && self.tabs.tracer_enabled
    }

    /// Tab currently rendered
    pub fn active_tab(&self) -> Tab {
        self.tabs.active_tab
    }
}

/// Interpret an opaque configuration value as a boolean toggle
pub fn config_flag(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(desired: &str, displayed: &str, transitioning: bool) -> UiState {
        UiState {
            desired_agent_id: desired.to_string(),
            displayed_agent_id: displayed.to_string(),
            transitioning,
            ..Default::default()
        }
    }

    #[test]
    fn test_tab_bar_hidden_without_agent() {
        assert!(!state_with("", "", false).show_tab_bar());
        assert!(state_with("a1", "", false).show_tab_bar());
        assert!(state_with("", "a1", false).show_tab_bar());
    }

    #[test]
    fn test_transitioning_hides_tab_bar() {
        assert!(!state_with("a1", "a1", true).show_tab_bar());
    }

    #[test]
    fn test_tracer_tab_requires_config() {
        let mut state = state_with("a1", "a1", false);
        assert!(!state.show_tracer_tab());
        state.tabs.set_tracer_enabled(true);
        assert!(state.show_tracer_tab());
        assert_eq!(state.tabs.available_tabs(), vec![Tab::Preview, Tab::Tracer]);
    }

    #[test]
    fn test_disabling_tracer_falls_back_to_preview() {
        let mut tabs = TabState::default();
        tabs.set_tracer_enabled(true);
        tabs.select(Tab::Tracer);
        assert_eq!(tabs.active_tab, Tab::Tracer);

        tabs.set_tracer_enabled(false);
        assert_eq!(tabs.active_tab, Tab::Preview);
        assert_eq!(tabs.available_tabs(), vec![Tab::Preview]);
    }

    #[test]
    fn test_select_disabled_tracer_stays_on_preview() {
        let mut tabs = TabState::default();
        tabs.select(Tab::Tracer);
        assert_eq!(tabs.active_tab, Tab::Preview);
    }

    #[test]
    fn test_config_flag() {
        assert!(config_flag(&serde_json::json!(true)));
        assert!(config_flag(&serde_json::json!("TRUE")));
        assert!(!config_flag(&serde_json::json!(false)));
        assert!(!config_flag(&serde_json::json!(1)));
        assert!(!config_flag(&serde_json::Value::Null));
    }

    #[test]
    fn test_ui_state_serialization() {
        let json = serde_json::to_string(&state_with("a1", "", true)).unwrap();
        assert!(json.contains("\"desiredAgentId\":\"a1\""));
        assert!(json.contains("\"activeTab\":\"preview\""));
        assert!(!json.contains("lastError"));
    }
}
