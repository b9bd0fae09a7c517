//! Free-tier usage gate

use crate::api::{ApiErrorKind, ChatBackend};

/// Remaining free uses plus whether the free tier is in use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageState {
    pub remaining: u32,
    pub is_free_tier_selected: bool,
}

impl UsageState {
    pub fn new(remaining: u32, is_free_tier_selected: bool) -> Self {
        Self {
            remaining,
            is_free_tier_selected,
        }
    }
}

/// Whether a send may go out with the given usage
pub fn is_send_allowed(usage: &UsageState) -> bool {
    !usage.is_free_tier_selected || usage.remaining > 0
}

/// Enablement of the send control for the current composer text
pub fn send_control_enabled(text: &str, usage: &UsageState) -> bool {
    !text.trim().is_empty() && is_send_allowed(usage)
}

pub fn remaining_label(remaining: u32) -> String {
    format!("{remaining} free uses remaining today.")
}

pub const LOGIN_REQUIRED_LABEL: &str = "Login to see usage";
pub const USAGE_ERROR_LABEL: &str = "Error loading usage";

/// Owns the usage counter and the label describing it
#[derive(Debug, Clone, Default)]
pub struct UsageGate {
    state: UsageState,
    label: String,
}

impl UsageGate {
    pub fn new(is_free_tier_selected: bool) -> Self {
        Self {
            state: UsageState::new(0, is_free_tier_selected),
            label: String::new(),
        }
    }

    pub fn state(&self) -> UsageState {
        self.state
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_free_tier(&mut self, selected: bool) {
        self.state.is_free_tier_selected = selected;
    }

    pub fn is_send_allowed(&self) -> bool {
        is_send_allowed(&self.state)
    }

    /// Re-read the counter from the backend.
    ///
    /// Failures only change the label; the last known count is kept.
    pub async fn refresh(&mut self, backend: &dyn ChatBackend) -> u32 {
        match backend.fetch_usage().await {
            Ok(remaining) => {
                self.state.remaining = remaining;
                self.label = remaining_label(remaining);
            }
            Err(err) => {
                tracing::warn!(error = %err, "usage refresh failed");
                self.label = match err.kind {
                    ApiErrorKind::Status(_) => LOGIN_REQUIRED_LABEL,
                    _ => USAGE_ERROR_LABEL,
                }
                .to_string();
            }
        }
        self.state.remaining
    }
}
