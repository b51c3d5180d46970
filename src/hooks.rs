//! Hook registration and invocation
//!
//! Hooks are declared per event as [`HookMatcher`]s. When a session
//! initializes, every hook callback is given a generated ID (`hook_0`,
//! `hook_1`, ...) and only the IDs are sent to the CLI, grouped under their
//! matcher pattern. The CLI does the matching; when a hook fires it sends a
//! `hook_callback` control request naming the ID, which is resolved through the
//! [`HookRegistry`].
//!
//! # Example
//!
//! ```no_run
//! use claude_code_sdk::hooks::{HookMatcherBuilder, HookRegistry};
//! use claude_code_sdk::types::{HookEvent, HookOutput};
//! use claude_code_sdk::ClaudeAgentOptions;
//! use std::collections::HashMap;
//!
//! let guard = HookRegistry::callback(|input, _tool_use_id, _ctx| async move {
//!     let command = input["tool_input"]["command"].as_str().unwrap_or_default();
//!     if command.contains("rm -rf") {
//!         return Ok(HookOutput::block("Refusing to run rm -rf"));
//!     }
//!     Ok(HookOutput::default())
//! });
//!
//! let mut hooks = HashMap::new();
//! hooks.insert(
//!     HookEvent::PreToolUse,
//!     vec![HookMatcherBuilder::new(Some("Bash")).add_hook(guard).build()],
//! );
//! let options = ClaudeAgentOptions::builder().hooks(hooks).build();
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use crate::callbacks::{FnHookCallback, HookCallback};
use crate::error::Result;
use crate::types::{HookContext, HookEvent, HookMatcher, HookOutput};

/// A hook callback together with the timeout of the matcher it came from
#[derive(Clone)]
pub struct RegisteredHook {
    callback: Arc<dyn HookCallback>,
    timeout: Duration,
}

impl RegisteredHook {
    /// Run the callback, falling back to an empty output if it times out
    ///
    /// # Errors
    ///
    /// Propagates errors returned by the callback itself.
    pub async fn invoke(
        &self,
        input: Value,
        tool_use_id: Option<String>,
        context: HookContext,
    ) -> Result<HookOutput> {
        match tokio::time::timeout(self.timeout, self.callback.call(input, tool_use_id, context))
            .await
        {
            Ok(result) => result,
            Err(_elapsed) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Hook callback timed out, answering with empty output"
                );
                Ok(HookOutput::default())
            }
        }
    }
}

impl std::fmt::Debug for RegisteredHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredHook")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Maps generated callback IDs to hook callbacks for one session
#[derive(Debug, Default)]
pub struct HookRegistry {
    entries: HashMap<String, RegisteredHook>,
    next_id: usize,
}

impl HookRegistry {
    /// Default timeout for hook callbacks (60 seconds)
    pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(60);

    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every hook and build the `hooks` field of `initialize`
    ///
    /// Events are visited in name order so IDs are stable for a given
    /// configuration. Returns `None` when there is nothing to register.
    pub fn register(&mut self, hooks: &HashMap<HookEvent, Vec<HookMatcher>>) -> Option<Value> {
        let mut events: Vec<_> = hooks.iter().collect();
        events.sort_by_key(|(event, _)| event.as_str());

        let mut config = serde_json::Map::new();
        for (event, matchers) in events {
            if matchers.is_empty() {
                continue;
            }
            let mut entries = Vec::with_capacity(matchers.len());
            for matcher in matchers {
                let mut ids = Vec::with_capacity(matcher.hooks.len());
                for hook in &matcher.hooks {
                    ids.push(self.insert(Arc::clone(hook), matcher.timeout));
                }
                entries.push(json!({ "matcher": matcher.matcher, "hookCallbackIds": ids }));
            }
            config.insert(event.as_str().to_string(), Value::Array(entries));
        }

        (!config.is_empty()).then_some(Value::Object(config))
    }

    fn insert(&mut self, callback: Arc<dyn HookCallback>, timeout: Option<Duration>) -> String {
        let id = format!("hook_{}", self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id.clone(),
            RegisteredHook {
                callback,
                timeout: timeout.unwrap_or(Self::DEFAULT_HOOK_TIMEOUT),
            },
        );
        id
    }

    /// Look up a hook by callback ID
    #[must_use]
    pub fn get(&self, callback_id: &str) -> Option<RegisteredHook> {
        self.entries.get(callback_id).cloned()
    }

    /// Number of registered callbacks
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no callbacks are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Create a hook callback from a closure
    ///
    /// # Example
    ///
    /// ```no_run
    /// use claude_code_sdk::hooks::HookRegistry;
    /// use claude_code_sdk::types::HookOutput;
    ///
    /// let hook = HookRegistry::callback(|_input, tool_use_id, ctx| async move {
    ///     if ctx.is_cancelled() {
    ///         return Ok(HookOutput::default());
    ///     }
    ///     println!("hook fired for {tool_use_id:?} in {:?}", ctx.session_id);
    ///     Ok(HookOutput::default())
    /// });
    /// ```
    pub fn callback<F, Fut>(f: F) -> Arc<dyn HookCallback>
    where
        F: Fn(Value, Option<String>, HookContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<HookOutput>> + Send + 'static,
    {
        Arc::new(FnHookCallback::new(f))
    }
}

/// Builder for creating hook matchers
pub struct HookMatcherBuilder {
    matcher: Option<String>,
    hooks: Vec<Arc<dyn HookCallback>>,
    timeout: Option<Duration>,
}

impl HookMatcherBuilder {
    /// Create a new hook matcher builder
    ///
    /// # Arguments
    /// * `pattern` - Matcher pattern (None for all, or specific tool name/pattern)
    pub fn new(pattern: Option<impl Into<String>>) -> Self {
        Self {
            matcher: pattern.map(Into::into),
            hooks: Vec::new(),
            timeout: None,
        }
    }

    /// Add a hook callback
    #[must_use]
    pub fn add_hook(mut self, hook: Arc<dyn HookCallback>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Set timeout for each hook in this matcher (default 60 seconds)
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the hook matcher
    #[must_use]
    pub fn build(self) -> HookMatcher {
        HookMatcher {
            matcher: self.matcher,
            hooks: self.hooks,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HookDecision;

    fn noop() -> Arc<dyn HookCallback> {
        HookRegistry::callback(|_input, _id, _ctx| async { Ok(HookOutput::default()) })
    }

    #[test]
    fn test_register_builds_initialize_config() {
        let mut hooks = HashMap::new();
        hooks.insert(
            HookEvent::PreToolUse,
            vec![
                HookMatcherBuilder::new(Some("Bash"))
                    .add_hook(noop())
                    .add_hook(noop())
                    .build(),
                HookMatcherBuilder::new(None::<String>).add_hook(noop()).build(),
            ],
        );
        hooks.insert(
            HookEvent::PostToolUse,
            vec![HookMatcherBuilder::new(Some("Write|Edit")).add_hook(noop()).build()],
        );

        let mut registry = HookRegistry::new();
        let config = registry.register(&hooks).unwrap();

        assert_eq!(registry.len(), 4);
        // PostToolUse sorts before PreToolUse
        assert_eq!(
            config["PostToolUse"],
            json!([{"matcher": "Write|Edit", "hookCallbackIds": ["hook_0"]}])
        );
        assert_eq!(
            config["PreToolUse"],
            json!([
                {"matcher": "Bash", "hookCallbackIds": ["hook_1", "hook_2"]},
                {"matcher": null, "hookCallbackIds": ["hook_3"]}
            ])
        );
        assert!(registry.get("hook_3").is_some());
        assert!(registry.get("hook_4").is_none());
    }

    #[test]
    fn test_register_empty_returns_none() {
        let mut registry = HookRegistry::new();
        assert!(registry.register(&HashMap::new()).is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_returns_callback_output() {
        let hook = HookRegistry::callback(|input, tool_use_id, _ctx| async move {
            assert_eq!(input["tool_name"], "Bash");
            assert_eq!(tool_use_id.as_deref(), Some("toolu_1"));
            Ok(HookOutput::block("nope"))
        });
        let mut hooks = HashMap::new();
        hooks.insert(
            HookEvent::PreToolUse,
            vec![HookMatcherBuilder::new(Some("Bash")).add_hook(hook).build()],
        );
        let mut registry = HookRegistry::new();
        registry.register(&hooks);

        let output = registry
            .get("hook_0")
            .unwrap()
            .invoke(
                json!({"tool_name": "Bash"}),
                Some("toolu_1".to_string()),
                HookContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(output.decision, Some(HookDecision::Block));
    }
}
