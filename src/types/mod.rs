//! Type definitions for the Claude Code SDK
//!
//! Plain data shared across the crate: identifiers, messages, session options,
//! hook and permission types, MCP server configuration, and prompt input.

pub mod hooks;
pub mod identifiers;
pub mod mcp;
pub mod messages;
pub mod options;
pub mod permissions;
pub mod prompt;

pub use hooks::{HookContext, HookDecision, HookEvent, HookMatcher, HookOutput};
pub use identifiers::{SessionId, ToolName};
pub use mcp::{
    McpHttpServerConfig, McpServerConfig, McpServers, McpSseServerConfig, McpStdioServerConfig,
    SdkMcpServerConfig,
};
pub use messages::{
    AssistantMessageContent, ContentBlock, ContentValue, Message, UserContent, UserMessageContent,
};
pub use options::{ClaudeAgentOptions, ClaudeAgentOptionsBuilder, SystemPrompt, SystemPromptPreset};
pub use permissions::{
    CanUseToolCallback, PermissionBehavior, PermissionMode, PermissionResult,
    PermissionResultAllow, PermissionResultDeny, PermissionRuleValue, PermissionUpdate,
    PermissionUpdateDestination, ToolPermissionContext,
};
pub use prompt::{InputStream, Prompt, user_message};
