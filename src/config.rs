//! Controller configuration

use crate::error::{Result, SessionError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default configuration section that toggles the tracer tab
pub const DEFAULT_TRACER_SECTION: &str = "salesforce.agentforceDX.showAgentTracer";

/// Configuration for a `SessionController`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerConfig {
    /// Configuration section whose boolean value enables the tracer tab
    pub tracer_section: String,

    /// Deadline for a lifecycle reply after a start/end request
    ///
    /// `None` waits forever; the host owns timeout policy in that case.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifecycle_timeout_secs: Option<u64>,

    /// Ask the host for the tracer section when the controller starts
    pub request_configuration_on_start: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tracer_section: DEFAULT_TRACER_SECTION.to_string(),
            lifecycle_timeout_secs: None,
            request_configuration_on_start: true,
        }
    }
}

impl ControllerConfig {
    /// Parse and validate a configuration from JSON
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| SessionError::Config(format!("Invalid controller config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Set the lifecycle timeout
    pub fn with_lifecycle_timeout(mut self, secs: u64) -> Self {
        self.lifecycle_timeout_secs = Some(secs);
        self
    }

    /// Check invariants that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.tracer_section.trim().is_empty() {
            return Err(SessionError::Config(
                "tracerSection must not be empty".to_string(),
            ));
        }
        if self.lifecycle_timeout_secs == Some(0) {
            return Err(SessionError::Config(
                "lifecycleTimeoutSecs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Lifecycle timeout as a `Duration`
    pub fn lifecycle_timeout(&self) -> Option<Duration> {
        self.lifecycle_timeout_secs.map(Duration::from_secs)
    }
}
