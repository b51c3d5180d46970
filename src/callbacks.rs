//! Callbacks the CLI invokes over the control channel
//!
//! A [`PermissionCallback`] answers `can_use_tool` requests and a
//! [`HookCallback`] answers `hook_callback` requests. The engine holds them as
//! `Arc<dyn ..>` and calls each one from its own task, so an implementation
//! may take as long as it likes without stalling the session.
//!
//! Closures are adapted by [`FnHookCallback`] and [`FnPermissionCallback`];
//! [`crate::HookRegistry::callback`] and [`crate::PermissionManager::callback`]
//! wrap them into the shared form the options expect.

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{HookContext, HookOutput, PermissionResult, ToolPermissionContext};

/// Handler for one registered hook
///
/// ```no_run
/// use async_trait::async_trait;
/// use claude_code_sdk::callbacks::HookCallback;
/// use claude_code_sdk::types::{HookContext, HookOutput};
/// use claude_code_sdk::Result;
///
/// /// Refuses any Bash command that mentions `rm -rf`
/// struct NoRecursiveDelete;
///
/// #[async_trait]
/// impl HookCallback for NoRecursiveDelete {
///     async fn call(
///         &self,
///         input: serde_json::Value,
///         _tool_use_id: Option<String>,
///         _context: HookContext,
///     ) -> Result<HookOutput> {
///         let command = input["tool_input"]["command"].as_str().unwrap_or_default();
///         if command.contains("rm -rf") {
///             return Ok(HookOutput::block("recursive delete refused"));
///         }
///         Ok(HookOutput::default())
///     }
/// }
/// ```
#[async_trait]
pub trait HookCallback: Send + Sync {
    /// Handle one hook invocation
    ///
    /// `input` is the hook input exactly as the CLI sent it; `tool_use_id` is
    /// set for tool-related events. The returned output goes back to the CLI
    /// as the response body. An error becomes an error response.
    async fn call(
        &self,
        input: Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput>;
}

/// Decides whether a tool may run
///
/// ```no_run
/// use async_trait::async_trait;
/// use claude_code_sdk::callbacks::PermissionCallback;
/// use claude_code_sdk::types::{PermissionResult, ToolPermissionContext};
/// use claude_code_sdk::Result;
///
/// struct ReadOnly;
///
/// #[async_trait]
/// impl PermissionCallback for ReadOnly {
///     async fn call(
///         &self,
///         tool_name: String,
///         _input: serde_json::Value,
///         _context: ToolPermissionContext,
///     ) -> Result<PermissionResult> {
///         match tool_name.as_str() {
///             "Read" | "Glob" | "Grep" => Ok(PermissionResult::allow()),
///             _ => Ok(PermissionResult::deny(format!("{tool_name} is read-only here"))),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait PermissionCallback: Send + Sync {
    /// Answer one `can_use_tool` request
    ///
    /// An `Allow` may carry replacement input, which must be a JSON object.
    async fn call(
        &self,
        tool_name: String,
        input: Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult>;
}

#[async_trait]
impl<T: HookCallback + ?Sized> HookCallback for Arc<T> {
    async fn call(
        &self,
        input: Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput> {
        (**self).call(input, tool_use_id, context).await
    }
}

#[async_trait]
impl<T: PermissionCallback + ?Sized> PermissionCallback for Arc<T> {
    async fn call(
        &self,
        tool_name: String,
        input: Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult> {
        (**self).call(tool_name, input, context).await
    }
}

/// [`HookCallback`] backed by an async closure
pub struct FnHookCallback<F> {
    func: F,
}

impl<F> FnHookCallback<F> {
    /// Wrap `func`
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(Value, Option<String>, HookContext) -> Fut + Send + Sync,
        Fut: Future<Output = Result<HookOutput>> + Send + 'static,
    {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> HookCallback for FnHookCallback<F>
where
    F: Fn(Value, Option<String>, HookContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HookOutput>> + Send + 'static,
{
    async fn call(
        &self,
        input: Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput> {
        (self.func)(input, tool_use_id, context).await
    }
}

/// [`PermissionCallback`] backed by an async closure
pub struct FnPermissionCallback<F> {
    func: F,
}

impl<F> FnPermissionCallback<F> {
    /// Wrap `func`
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(String, Value, ToolPermissionContext) -> Fut + Send + Sync,
        Fut: Future<Output = Result<PermissionResult>> + Send + 'static,
    {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> PermissionCallback for FnPermissionCallback<F>
where
    F: Fn(String, Value, ToolPermissionContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<PermissionResult>> + Send + 'static,
{
    async fn call(
        &self,
        tool_name: String,
        input: Value,
        context: ToolPermissionContext,
    ) -> Result<PermissionResult> {
        (self.func)(tool_name, input, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    struct DenyAll;

    #[async_trait]
    impl PermissionCallback for DenyAll {
        async fn call(
            &self,
            tool_name: String,
            _input: Value,
            _context: ToolPermissionContext,
        ) -> Result<PermissionResult> {
            Ok(PermissionResult::deny(format!("Denied: {tool_name}")))
        }
    }

    #[tokio::test]
    async fn test_shared_permission_callback() {
        let shared: Arc<dyn PermissionCallback> = Arc::new(DenyAll);
        let result = shared
            .call("Bash".to_string(), json!({"command": "ls"}), ToolPermissionContext::default())
            .await
            .unwrap();
        match result {
            PermissionResult::Deny(deny) => assert_eq!(deny.message, "Denied: Bash"),
            PermissionResult::Allow(_) => panic!("expected deny"),
        }
    }

    #[tokio::test]
    async fn test_fn_hook_callback_sees_cancellation() {
        let callback = FnHookCallback::new(|_input, _tool_use_id, ctx| async move {
            if ctx.is_cancelled() {
                return Ok(HookOutput::block("cancelled"));
            }
            Ok(HookOutput::default())
        });

        let token = CancellationToken::new();
        token.cancel();
        let output = callback
            .call(json!({}), None, HookContext::new(None, None, Some(token)))
            .await
            .unwrap();
        assert_eq!(output.system_message.as_deref(), Some("cancelled"));
    }

    #[tokio::test]
    async fn test_fn_permission_callback_rewrites_input() {
        let callback =
            FnPermissionCallback::new(|_tool, input, ctx| async move {
                let path = ctx.blocked_path.unwrap_or_default();
                Ok(PermissionResult::allow_with_input(
                    json!({"path": path, "original": input}),
                ))
            });

        let result = callback
            .call(
                "Write".to_string(),
                json!({"file_path": "/etc/hosts"}),
                ToolPermissionContext::new(vec![]).blocked_path(Some("/etc".to_string())),
            )
            .await
            .unwrap();
        let PermissionResult::Allow(allow) = result else {
            panic!("expected allow");
        };
        let input = allow.updated_input.unwrap();
        assert_eq!(input["path"], "/etc");
        assert_eq!(input["original"]["file_path"], "/etc/hosts");
    }
}
