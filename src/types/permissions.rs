//! Permission types for tool execution control

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Permission Types
// ============================================================================

/// Permission modes for tool execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionMode {
    /// Default mode - CLI prompts for dangerous tools
    Default,
    /// Auto-accept file edits
    AcceptEdits,
    /// Plan mode
    Plan,
    /// Allow all tools (use with caution)
    BypassPermissions,
}

impl PermissionMode {
    /// Wire name of the mode, as passed to `--permission-mode`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::Plan => "plan",
            Self::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Permission update destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionUpdateDestination {
    /// Save to user settings
    UserSettings,
    /// Save to project settings
    ProjectSettings,
    /// Save to local settings
    LocalSettings,
    /// Save to session only (temporary)
    Session,
}

/// Permission behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionBehavior {
    /// Allow the action
    Allow,
    /// Deny the action
    Deny,
    /// Ask the user
    Ask,
}

/// Permission rule value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRuleValue {
    /// Name of the tool
    pub tool_name: String,
    /// Optional rule content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_content: Option<String>,
}

/// Permission update suggested by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PermissionUpdate {
    /// Add permission rules
    AddRules {
        /// Rules to add
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PermissionRuleValue>>,
        /// Behavior the rules grant
        #[serde(default, skip_serializing_if = "Option::is_none")]
        behavior: Option<PermissionBehavior>,
        /// Where to save the rules
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Replace existing permission rules
    ReplaceRules {
        /// New rules
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PermissionRuleValue>>,
        /// Behavior the rules grant
        #[serde(default, skip_serializing_if = "Option::is_none")]
        behavior: Option<PermissionBehavior>,
        /// Where to save the rules
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Remove permission rules
    RemoveRules {
        /// Rules to remove
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rules: Option<Vec<PermissionRuleValue>>,
        /// Behavior the rules granted
        #[serde(default, skip_serializing_if = "Option::is_none")]
        behavior: Option<PermissionBehavior>,
        /// Where to remove from
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Set permission mode
    SetMode {
        /// New permission mode
        mode: PermissionMode,
        /// Where to save the mode
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Add directories to allowed list
    AddDirectories {
        /// Directories to add
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directories: Option<Vec<String>>,
        /// Where to save
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
    /// Remove directories from allowed list
    RemoveDirectories {
        /// Directories to remove
        #[serde(default, skip_serializing_if = "Option::is_none")]
        directories: Option<Vec<String>>,
        /// Where to remove from
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<PermissionUpdateDestination>,
    },
}

/// Context for tool permission callbacks
///
/// Carries what the CLI forwarded alongside a `can_use_tool` request, plus a
/// cancellation token that fires when the session shuts down.
#[derive(Clone, Default)]
pub struct ToolPermissionContext {
    /// Permission suggestions from CLI
    pub suggestions: Vec<PermissionUpdate>,
    /// Path that triggered the permission check, if any
    pub blocked_path: Option<String>,
    /// Cancelled when the session closes
    pub cancellation_token: Option<CancellationToken>,
}

impl std::fmt::Debug for ToolPermissionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolPermissionContext")
            .field("suggestions", &self.suggestions)
            .field("blocked_path", &self.blocked_path)
            .field(
                "cancellation_token",
                &self.cancellation_token.as_ref().map(|_| "<token>"),
            )
            .finish()
    }
}

impl ToolPermissionContext {
    /// Create a new `ToolPermissionContext` with suggestions
    #[must_use]
    pub fn new(suggestions: Vec<PermissionUpdate>) -> Self {
        Self {
            suggestions,
            ..Self::default()
        }
    }

    /// Create a new `ToolPermissionContext` with suggestions and cancellation token
    #[must_use]
    pub fn with_cancellation(
        suggestions: Vec<PermissionUpdate>,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            suggestions,
            blocked_path: None,
            cancellation_token: Some(cancellation_token),
        }
    }

    /// Attach the path the CLI reported as blocked
    #[must_use]
    pub fn blocked_path(mut self, path: Option<String>) -> Self {
        self.blocked_path = path;
        self
    }

    /// Check if cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}

/// Permission result for allowing tool use
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionResultAllow {
    /// Replacement input for the tool; must be a JSON object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<serde_json::Value>,
    /// Permission updates to apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_permissions: Option<Vec<PermissionUpdate>>,
}

/// Permission result for denying tool use
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionResultDeny {
    /// Reason for denying
    pub message: String,
    /// Whether to interrupt the conversation
    #[serde(default)]
    pub interrupt: bool,
}

/// Outcome of a permission callback
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PermissionResult {
    /// Allow the tool use
    Allow(PermissionResultAllow),
    /// Deny the tool use
    Deny(PermissionResultDeny),
}

impl PermissionResult {
    /// Allow the call with its original input
    #[must_use]
    pub fn allow() -> Self {
        Self::Allow(PermissionResultAllow::default())
    }

    /// Allow the call, replacing its input
    #[must_use]
    pub fn allow_with_input(input: serde_json::Value) -> Self {
        Self::Allow(PermissionResultAllow {
            updated_input: Some(input),
            updated_permissions: None,
        })
    }

    /// Deny the call with a human-readable reason
    pub fn deny(message: impl Into<String>) -> Self {
        Self::Deny(PermissionResultDeny {
            message: message.into(),
            interrupt: false,
        })
    }
}

/// Type alias for a shared permission callback using the trait-based approach.
pub type CanUseToolCallback = Arc<dyn crate::callbacks::PermissionCallback>;
