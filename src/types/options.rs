//! Session configuration options

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use typed_builder::TypedBuilder;

use super::hooks::{HookEvent, HookMatcher};
use super::identifiers::{SessionId, ToolName};
use super::mcp::McpServers;
use super::permissions::{CanUseToolCallback, PermissionMode};

// ============================================================================
// System Prompt Types
// ============================================================================

/// Preset system prompt, optionally extended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemPromptPreset {
    /// Always "preset"
    #[serde(rename = "type")]
    pub prompt_type: String,
    /// Preset name
    pub preset: String,
    /// Text appended to the preset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub append: Option<String>,
}

impl SystemPromptPreset {
    /// The stock Claude Code prompt, optionally with extra instructions
    #[must_use]
    pub fn claude_code(append: Option<String>) -> Self {
        Self {
            prompt_type: "preset".to_string(),
            preset: "claude_code".to_string(),
            append,
        }
    }
}

/// System prompt configuration
#[derive(Debug, Clone)]
pub enum SystemPrompt {
    /// Replace the system prompt entirely
    String(String),
    /// Use a preset, optionally appending text
    Preset(SystemPromptPreset),
}

impl From<String> for SystemPrompt {
    fn from(s: String) -> Self {
        SystemPrompt::String(s)
    }
}

impl From<&str> for SystemPrompt {
    fn from(s: &str) -> Self {
        SystemPrompt::String(s.to_string())
    }
}

impl From<SystemPromptPreset> for SystemPrompt {
    fn from(preset: SystemPromptPreset) -> Self {
        SystemPrompt::Preset(preset)
    }
}

// ============================================================================
// Claude Agent Options
// ============================================================================

/// Configuration for a session or one-shot query
///
/// Plain data: nothing here performs I/O. Use the builder:
///
/// ```
/// use claude_code_sdk::ClaudeAgentOptions;
/// use claude_code_sdk::types::PermissionMode;
///
/// let options = ClaudeAgentOptions::builder()
///     .model("claude-sonnet-4-5")
///     .max_turns(3)
///     .permission_mode(PermissionMode::AcceptEdits)
///     .build();
/// assert_eq!(options.max_turns, Some(3));
/// ```
#[derive(Clone, Default, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for ClaudeAgentOptions"),
    builder_type(doc = "Builder for ClaudeAgentOptions", vis = "pub"),
    build_method(doc = "Build the ClaudeAgentOptions")
)]
pub struct ClaudeAgentOptions {
    /// Tools Claude may use without asking
    #[builder(default, setter(into))]
    pub allowed_tools: Vec<ToolName>,

    /// Tools Claude may never use
    #[builder(default, setter(into))]
    pub disallowed_tools: Vec<ToolName>,

    /// System prompt override or preset
    #[builder(default, setter(strip_option, into))]
    pub system_prompt: Option<SystemPrompt>,

    /// MCP servers, external or in-process
    #[builder(default)]
    pub mcp_servers: McpServers,

    /// Initial permission mode
    #[builder(default, setter(strip_option))]
    pub permission_mode: Option<PermissionMode>,

    /// Continue the most recent conversation
    #[builder(default)]
    pub continue_conversation: bool,

    /// Resume a specific session
    #[builder(default, setter(strip_option, into))]
    pub resume: Option<SessionId>,

    /// Maximum number of agent turns
    #[builder(default, setter(strip_option))]
    pub max_turns: Option<u32>,

    /// Model to use
    #[builder(default, setter(strip_option, into))]
    pub model: Option<String>,

    /// MCP tool the CLI asks for permission decisions (`stdio` routes them
    /// through `can_use_tool`)
    #[builder(default, setter(strip_option, into))]
    pub permission_prompt_tool_name: Option<String>,

    /// Working directory of the CLI process
    #[builder(default, setter(strip_option, into))]
    pub cwd: Option<PathBuf>,

    /// Settings file passed with `--settings`
    #[builder(default, setter(strip_option, into))]
    pub settings: Option<PathBuf>,

    /// Extra directories the CLI may access
    #[builder(default, setter(into))]
    pub add_dirs: Vec<PathBuf>,

    /// Extra environment variables for the CLI process
    #[builder(default)]
    pub env: HashMap<String, String>,

    /// Extra CLI flags (`None` value for boolean flags); only allow-listed
    /// flags are forwarded
    #[builder(default)]
    pub extra_args: HashMap<String, Option<String>>,

    /// Maximum bytes buffered while assembling one JSON message (default 1 MiB)
    #[builder(default, setter(strip_option))]
    pub max_buffer_size: Option<usize>,

    /// Explicit path to the `claude` executable
    #[builder(default, setter(strip_option, into))]
    pub cli_path: Option<PathBuf>,

    /// Run the CLI as this user, given as a name or a numeric uid (Unix only)
    #[builder(default, setter(strip_option, into))]
    pub user: Option<String>,

    /// Permission callback consulted for every `can_use_tool` request
    #[builder(default, setter(strip_option))]
    pub can_use_tool: Option<CanUseToolCallback>,

    /// Hook callbacks per event
    #[builder(default, setter(strip_option))]
    pub hooks: Option<HashMap<HookEvent, Vec<HookMatcher>>>,
}

#[allow(clippy::missing_fields_in_debug)]
impl std::fmt::Debug for ClaudeAgentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeAgentOptions")
            .field("allowed_tools", &self.allowed_tools)
            .field("disallowed_tools", &self.disallowed_tools)
            .field("system_prompt", &self.system_prompt)
            .field("mcp_servers", &self.mcp_servers)
            .field("permission_mode", &self.permission_mode)
            .field("continue_conversation", &self.continue_conversation)
            .field("resume", &self.resume)
            .field("max_turns", &self.max_turns)
            .field("model", &self.model)
            .field(
                "permission_prompt_tool_name",
                &self.permission_prompt_tool_name,
            )
            .field("cwd", &self.cwd)
            .field("settings", &self.settings)
            .field("add_dirs", &self.add_dirs)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("extra_args", &self.extra_args)
            .field("max_buffer_size", &self.max_buffer_size)
            .field("cli_path", &self.cli_path)
            .field("user", &self.user)
            .field(
                "can_use_tool",
                &self.can_use_tool.as_ref().map(|_| "<callback>"),
            )
            .field(
                "hooks",
                &self
                    .hooks
                    .as_ref()
                    .map(|h| format!("[{} hook types]", h.len())),
            )
            .finish()
    }
}
