//! Hook types for event handling

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Hook Types
// ============================================================================

/// Hook event types the CLI can call back into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookEvent {
    /// Before a tool is used
    PreToolUse,
    /// After a tool is used
    PostToolUse,
    /// When user submits a prompt
    UserPromptSubmit,
    /// When conversation stops
    Stop,
    /// When a subagent stops
    SubagentStop,
    /// Before compacting the conversation
    PreCompact,
}

impl HookEvent {
    /// Name used as the key of the `initialize` hook configuration
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreToolUse => "PreToolUse",
            Self::PostToolUse => "PostToolUse",
            Self::UserPromptSubmit => "UserPromptSubmit",
            Self::Stop => "Stop",
            Self::SubagentStop => "SubagentStop",
            Self::PreCompact => "PreCompact",
        }
    }
}

impl std::fmt::Display for HookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Hook Output and Decision Types
// ============================================================================

/// Hook decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookDecision {
    /// Block the action
    Block,
}

/// Hook output, returned to the CLI as the `hook_callback` response body
///
/// Keys without a typed field go in `extra` and are sent as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HookOutput {
    /// Decision to block or allow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<HookDecision>,
    /// System message to add
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemMessage")]
    pub system_message: Option<String>,
    /// Hook-specific output data
    #[serde(skip_serializing_if = "Option::is_none", rename = "hookSpecificOutput")]
    pub hook_specific_output: Option<serde_json::Value>,
    /// Any other top-level keys, such as `continue` or `stopReason`
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl HookOutput {
    /// Output that blocks the action with a message shown to Claude
    pub fn block(message: impl Into<String>) -> Self {
        Self {
            decision: Some(HookDecision::Block),
            system_message: Some(message.into()),
            ..Self::default()
        }
    }

    /// Add a top-level key to the output
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Context for hook callbacks
///
/// `session_id` and `cwd` are filled from the CLI's `system/init` message once
/// it has been seen on the stream.
#[derive(Clone, Default)]
pub struct HookContext {
    /// Session ID from the system init message
    pub session_id: Option<String>,
    /// Current working directory from the system init message
    pub cwd: Option<String>,
    /// Cancelled when the session closes
    pub cancellation_token: Option<CancellationToken>,
}

impl std::fmt::Debug for HookContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookContext")
            .field("session_id", &self.session_id)
            .field("cwd", &self.cwd)
            .field(
                "cancellation_token",
                &self.cancellation_token.as_ref().map(|_| "<token>"),
            )
            .finish()
    }
}

impl HookContext {
    /// Create a new `HookContext` with session information
    #[must_use]
    pub fn new(
        session_id: Option<String>,
        cwd: Option<String>,
        cancellation_token: Option<CancellationToken>,
    ) -> Self {
        Self {
            session_id,
            cwd,
            cancellation_token,
        }
    }

    /// Check if cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Hook matcher configuration
#[derive(Clone)]
pub struct HookMatcher {
    /// Matcher pattern (e.g., tool name like "Bash" or pattern like "Write|Edit");
    /// `None` matches everything
    pub matcher: Option<String>,
    /// Callbacks invoked when the matcher fires
    pub hooks: Vec<Arc<dyn crate::callbacks::HookCallback>>,
    /// Timeout for each hook in this matcher (default: 60 seconds)
    ///
    /// A hook that runs past it is abandoned and answers with an empty
    /// `HookOutput`.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for HookMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookMatcher")
            .field("matcher", &self.matcher)
            .field("hooks", &format!("[{} callbacks]", self.hooks.len()))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_event_names_match_serde() {
        for event in [
            HookEvent::PreToolUse,
            HookEvent::PostToolUse,
            HookEvent::UserPromptSubmit,
            HookEvent::Stop,
            HookEvent::SubagentStop,
            HookEvent::PreCompact,
        ] {
            assert_eq!(
                serde_json::to_value(event).unwrap(),
                serde_json::json!(event.as_str())
            );
        }
    }

    #[test]
    fn test_hook_output_wire_names() {
        let output = HookOutput::block("no rm -rf");
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["decision"], "block");
        assert_eq!(json["systemMessage"], "no rm -rf");
        assert!(json.get("hookSpecificOutput").is_none());

        let empty = serde_json::to_value(HookOutput::default()).unwrap();
        assert_eq!(empty, serde_json::json!({}));
    }

    #[test]
    fn test_hook_output_keeps_untyped_keys() {
        let output = HookOutput::block("stop here")
            .with_field("continue", serde_json::json!(false))
            .with_field("stopReason", serde_json::json!("budget exhausted"));
        assert_eq!(
            serde_json::to_value(&output).unwrap(),
            serde_json::json!({
                "decision": "block",
                "systemMessage": "stop here",
                "continue": false,
                "stopReason": "budget exhausted"
            })
        );

        let parsed: HookOutput =
            serde_json::from_value(serde_json::json!({"suppressOutput": true})).unwrap();
        assert!(parsed.decision.is_none());
        assert_eq!(parsed.extra["suppressOutput"], true);
    }
}
