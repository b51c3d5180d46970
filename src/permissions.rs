//! Permission callbacks and their wire contract
//!
//! When a [`PermissionCallback`](crate::callbacks::PermissionCallback) is
//! configured, the CLI routes every tool permission decision through the
//! control channel (`--permission-prompt-tool stdio`). That only works in
//! streaming mode, where stdin stays open for the answer.

use serde_json::{Value, json};
use std::sync::Arc;

use crate::callbacks::FnPermissionCallback;
use crate::error::{ClaudeError, Result};
use crate::types::{
    CanUseToolCallback, ClaudeAgentOptions, PermissionResult, ToolPermissionContext,
};

/// Permission-prompt tool name that routes decisions over the control channel
pub const STDIO_PERMISSION_PROMPT_TOOL: &str = "stdio";

/// Helpers for wiring permission callbacks into a session
pub struct PermissionManager;

impl PermissionManager {
    /// Create a permission callback from a closure
    ///
    /// # Example
    ///
    /// ```no_run
    /// use claude_code_sdk::permissions::PermissionManager;
    /// use claude_code_sdk::types::PermissionResult;
    ///
    /// let callback = PermissionManager::callback(|tool_name, input, _ctx| async move {
    ///     if tool_name == "Bash" && input["command"].as_str() == Some("rm -rf /") {
    ///         return Ok(PermissionResult::deny("blocked"));
    ///     }
    ///     Ok(PermissionResult::allow())
    /// });
    /// ```
    pub fn callback<F, Fut>(f: F) -> CanUseToolCallback
    where
        F: Fn(String, Value, ToolPermissionContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<PermissionResult>> + Send + 'static,
    {
        Arc::new(FnPermissionCallback::new(f))
    }

    /// Validate a permission callback against the prompt mode and route
    /// permission prompts to it
    ///
    /// No-op when no callback is configured.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the prompt is a plain string, or if
    /// `permission_prompt_tool_name` is already set.
    pub fn prepare_options(options: &mut ClaudeAgentOptions, streaming: bool) -> Result<()> {
        if options.can_use_tool.is_none() {
            return Ok(());
        }
        if !streaming {
            return Err(ClaudeError::invalid_config(
                "can_use_tool callback requires streaming mode. \
                 Please provide prompt as an AsyncIterable instead of a string.",
            ));
        }
        if options.permission_prompt_tool_name.is_some() {
            return Err(ClaudeError::invalid_config(
                "can_use_tool callback cannot be used with permission_prompt_tool_name. \
                 Please use one or the other.",
            ));
        }
        options.permission_prompt_tool_name = Some(STDIO_PERMISSION_PROMPT_TOOL.to_string());
        Ok(())
    }

    /// Encode a callback result as the `can_use_tool` response body
    ///
    /// `Allow` becomes `{allow: true, input?}` and `Deny` becomes
    /// `{allow: false, reason}`.
    ///
    /// # Errors
    ///
    /// Returns `ControlProtocol` if a replacement input is not a JSON object.
    pub fn to_response(result: PermissionResult) -> Result<Value> {
        match result {
            PermissionResult::Allow(allow) => match allow.updated_input {
                None => Ok(json!({ "allow": true })),
                Some(input @ Value::Object(_)) => Ok(json!({ "allow": true, "input": input })),
                Some(other) => Err(ClaudeError::control_protocol(format!(
                    "Permission callback returned a non-object replacement input: {other}"
                ))),
            },
            PermissionResult::Deny(deny) => Ok(json!({ "allow": false, "reason": deny.message })),
        }
    }
}
