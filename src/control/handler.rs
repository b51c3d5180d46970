//! The control-protocol engine
//!
//! One [`ProtocolHandler`] per session. It owns the transport and runs:
//!
//! - a single reader task that routes every line (responses resolve pending
//!   requests, requests are dispatched, content goes to a bounded queue),
//! - one task per inbound control request, so a slow callback never holds up
//!   the reader,
//! - at most one input streamer writing caller messages to stdin.
//!
//! All tasks live on a [`TaskTracker`] and observe one [`CancellationToken`];
//! [`ProtocolHandler::close`] cancels them, waits for them, then closes the
//! transport.

use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Mutex, RwLock, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

use super::protocol::{
    ControlResponse, HookCallbackRequest, InboundRequest, Incoming, McpMessageRequest,
    OutboundRequest, PermissionRequest,
};
use crate::error::{ClaudeError, Result};
use crate::hooks::HookRegistry;
use crate::mcp::{JsonRpcResponse, McpError, SdkMcpServer};
use crate::permissions::PermissionManager;
use crate::transport::Transport;
use crate::types::{
    CanUseToolCallback, ClaudeAgentOptions, HookContext, HookEvent, HookMatcher, InputStream,
    PermissionMode, PermissionUpdate, ToolPermissionContext,
};

/// Default ceiling for an outbound control request (60 seconds)
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(60);

/// Capacity of the content queue between the reader and the caller
pub const CONTENT_QUEUE_CAPACITY: usize = 100;

/// Engine configuration
#[derive(TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for ProtocolConfig"),
    builder_type(doc = "Builder for ProtocolConfig", vis = "pub"),
    build_method(doc = "Build the ProtocolConfig")
)]
pub struct ProtocolConfig {
    /// Whether stdin stays open for control traffic
    #[builder(default = true)]
    pub streaming: bool,

    /// Permission callback for `can_use_tool`
    #[builder(default, setter(strip_option))]
    pub can_use_tool: Option<CanUseToolCallback>,

    /// Hooks registered at `initialize`
    #[builder(default)]
    pub hooks: HashMap<HookEvent, Vec<HookMatcher>>,

    /// In-process MCP servers by configured name
    #[builder(default)]
    pub sdk_mcp_servers: HashMap<String, Arc<SdkMcpServer>>,

    /// Ceiling for outbound control requests
    #[builder(default = DEFAULT_CONTROL_TIMEOUT)]
    pub control_timeout: Duration,
}

impl ProtocolConfig {
    /// Engine configuration for a session described by `options`
    #[must_use]
    pub fn from_options(options: &ClaudeAgentOptions, streaming: bool) -> Self {
        Self {
            streaming,
            can_use_tool: options.can_use_tool.clone(),
            hooks: options.hooks.clone().unwrap_or_default(),
            sdk_mcp_servers: options.mcp_servers.sdk_servers(),
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for ProtocolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolConfig")
            .field("streaming", &self.streaming)
            .field("can_use_tool", &self.can_use_tool.as_ref().map(|_| "<callback>"))
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("sdk_mcp_servers", &self.sdk_mcp_servers.keys().collect::<Vec<_>>())
            .field("control_timeout", &self.control_timeout)
            .finish()
    }
}

/// Item of the content queue
#[derive(Debug)]
enum ContentEvent {
    Message(Value),
    Error(ClaudeError),
    End,
}

type PendingMap = HashMap<String, oneshot::Sender<Result<Value>>>;

/// Session details announced by the CLI in `system/init`
#[derive(Debug, Default)]
struct SessionDetails {
    session_id: Option<String>,
    cwd: Option<String>,
}

/// State shared between the handler and its tasks
struct Shared {
    transport: Mutex<Box<dyn Transport>>,
    pending: Mutex<PendingMap>,
    reader_done: AtomicBool,
    hooks: RwLock<HookRegistry>,
    sdk_mcp_servers: HashMap<String, Arc<SdkMcpServer>>,
    can_use_tool: Option<CanUseToolCallback>,
    session: std::sync::Mutex<SessionDetails>,
    token: CancellationToken,
}

/// Bidirectional control-protocol engine for one session
pub struct ProtocolHandler {
    shared: Arc<Shared>,
    streaming: bool,
    control_timeout: Duration,
    hook_config: HashMap<HookEvent, Vec<HookMatcher>>,
    request_counter: AtomicU64,
    tasks: TaskTracker,
    content_tx: Option<mpsc::Sender<ContentEvent>>,
    content_rx: Mutex<mpsc::Receiver<ContentEvent>>,
    started: bool,
    closed: bool,
    init_result: Option<Value>,
}

impl ProtocolHandler {
    /// Wrap a connected transport
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, config: ProtocolConfig) -> Self {
        let (content_tx, content_rx) = mpsc::channel(CONTENT_QUEUE_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                transport: Mutex::new(transport),
                pending: Mutex::new(HashMap::new()),
                reader_done: AtomicBool::new(false),
                hooks: RwLock::new(HookRegistry::new()),
                sdk_mcp_servers: config.sdk_mcp_servers,
                can_use_tool: config.can_use_tool,
                session: std::sync::Mutex::new(SessionDetails::default()),
                token: CancellationToken::new(),
            }),
            streaming: config.streaming,
            control_timeout: config.control_timeout,
            hook_config: config.hooks,
            request_counter: AtomicU64::new(0),
            tasks: TaskTracker::new(),
            content_tx: Some(content_tx),
            content_rx: Mutex::new(content_rx),
            started: false,
            closed: false,
            init_result: None,
        }
    }

    /// Whether control traffic is possible
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Start the reader task; later calls do nothing
    pub async fn start(&mut self) {
        if self.started || self.closed {
            return;
        }
        let Some(content_tx) = self.content_tx.take() else {
            return;
        };
        self.started = true;

        let rx = self.shared.transport.lock().await.read_messages();
        let shared = Arc::clone(&self.shared);
        let tasks = self.tasks.clone();
        self.tasks.spawn(read_loop(shared, rx, content_tx, tasks));
    }

    /// Perform the `initialize` handshake
    ///
    /// Registers every configured hook under a generated `hook_<n>` ID and
    /// sends the IDs with the request. Returns the CLI's response, or `None`
    /// without any I/O when the session is not streaming.
    ///
    /// # Errors
    ///
    /// Returns `Connection` if the CLI does not answer in time, or the error
    /// the CLI reported.
    pub async fn initialize(&mut self) -> Result<Option<Value>> {
        if !self.streaming {
            return Ok(None);
        }

        let hooks = self.shared.hooks.write().await.register(&self.hook_config);
        let response = self
            .send_control_request(OutboundRequest::Initialize { hooks })
            .await
            .map_err(|e| match e {
                ClaudeError::ControlTimeout { .. } => {
                    ClaudeError::connection(format!("Failed to initialize session: {e}"))
                }
                other => other,
            })?;

        debug!(hooks = self.shared.hooks.read().await.len(), "Control protocol initialized");
        self.init_result = Some(response.clone());
        Ok(Some(response))
    }

    /// Response of the last successful `initialize`
    #[must_use]
    pub fn initialization_result(&self) -> Option<&Value> {
        self.init_result.as_ref()
    }

    /// Send a control request and wait for its response
    ///
    /// Returns the nested `response` object (`{}` when absent).
    ///
    /// # Errors
    ///
    /// - `ControlProtocol` when the session is not streaming
    /// - `ControlTimeout` when no response arrives in time
    /// - `ControlRequestFailed` when the CLI answers with an error
    /// - `Connection` when the transport fails or the reader has stopped
    pub async fn send_control_request(&self, request: OutboundRequest) -> Result<Value> {
        if !self.streaming {
            return Err(ClaudeError::control_protocol(
                "Control requests require streaming mode",
            ));
        }

        let counter = self.request_counter.fetch_add(1, Ordering::SeqCst) + 1;
        let request_id = format!("req_{counter}_{:08x}", rand::random::<u32>());
        let line = request.to_line(&request_id)?;
        let subtype = request.subtype();

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending.lock().await;
            if self.shared.reader_done.load(Ordering::SeqCst) {
                return Err(ClaudeError::connection(
                    "Control channel closed; the CLI is no longer reading",
                ));
            }
            pending.insert(request_id.clone(), tx);
        }

        debug!(request_id = %request_id, subtype, "Sending control request");
        if let Err(e) = self.shared.write(&line).await {
            self.shared.pending.lock().await.remove(&request_id);
            return Err(e);
        }

        match tokio::time::timeout(self.control_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_dropped)) => Err(ClaudeError::connection(
                "Control channel closed before a response arrived",
            )),
            Err(_elapsed) => {
                self.shared.pending.lock().await.remove(&request_id);
                warn!(request_id = %request_id, subtype, "Control request timed out");
                Err(ClaudeError::control_timeout(
                    self.control_timeout.as_secs(),
                    subtype,
                ))
            }
        }
    }

    /// Ask the CLI to stop the current turn
    ///
    /// # Errors
    /// Same as [`Self::send_control_request`].
    pub async fn interrupt(&self) -> Result<()> {
        self.send_control_request(OutboundRequest::Interrupt).await?;
        Ok(())
    }

    /// Change the permission mode
    ///
    /// # Errors
    /// Same as [`Self::send_control_request`].
    pub async fn set_permission_mode(&self, mode: PermissionMode) -> Result<()> {
        self.send_control_request(OutboundRequest::SetPermissionMode { mode })
            .await?;
        Ok(())
    }

    /// Write one content message as a JSON line
    ///
    /// # Errors
    /// Returns the transport's write error.
    pub async fn write_message(&self, message: &Value) -> Result<()> {
        self.shared.write(&format!("{message}\n")).await
    }

    /// Close the input side of the transport
    ///
    /// # Errors
    /// Returns the transport's error.
    pub async fn end_input(&self) -> Result<()> {
        self.shared.end_input().await
    }

    /// Write every message of `input` in the background, then end input
    ///
    /// Failures are logged and end the task; the reader remains the place
    /// where a broken session shows up. A write blocked on a CLI that stopped
    /// reading is abandoned when the session closes.
    pub fn stream_input(&self, mut input: InputStream) {
        if self.closed {
            return;
        }
        let shared = Arc::clone(&self.shared);
        self.tasks.spawn(async move {
            loop {
                let next = tokio::select! {
                    () = shared.token.cancelled() => return,
                    next = input.next() => next,
                };
                let Some(message) = next else { break };
                if let Err(e) = shared.write(&format!("{message}\n")).await {
                    if shared.token.is_cancelled() {
                        debug!("Input streaming cancelled");
                    } else {
                        warn!(error = %e, "Stopped streaming input");
                    }
                    return;
                }
            }
            if let Err(e) = shared.end_input().await {
                if !shared.token.is_cancelled() {
                    warn!(error = %e, "Failed to end input");
                }
            }
        });
    }

    /// Content messages in arrival order
    ///
    /// A reader failure is yielded once as the last item. The stream ends at
    /// end of session; calling again afterwards yields nothing.
    ///
    /// Takes `&self`, so control requests such as [`Self::interrupt`] can be
    /// sent while a stream is being consumed. Streams are served one at a
    /// time: a second stream waits until the first is dropped.
    pub fn receive_messages(&self) -> impl Stream<Item = Result<Value>> + '_ {
        async_stream::stream! {
            let mut content = self.content_rx.lock().await;
            while let Some(event) = content.recv().await {
                match event {
                    ContentEvent::Message(message) => yield Ok(message),
                    ContentEvent::Error(e) => {
                        yield Err(e);
                        break;
                    }
                    ContentEvent::End => break,
                }
            }
        }
    }

    /// Whether [`Self::close`] has run
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop all tasks and close the transport; later calls do nothing
    ///
    /// # Errors
    /// Returns the transport's close error.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.shared.token.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        self.content_tx = None;

        debug!("Control protocol closed");
        self.shared.transport.lock().await.close().await
    }
}

impl Drop for ProtocolHandler {
    fn drop(&mut self) {
        self.shared.token.cancel();
    }
}

impl std::fmt::Debug for ProtocolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolHandler")
            .field("streaming", &self.streaming)
            .field("started", &self.started)
            .field("closed", &self.closed)
            .field("control_timeout", &self.control_timeout)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Reader
// ============================================================================

async fn read_loop(
    shared: Arc<Shared>,
    mut rx: mpsc::Receiver<Result<Value>>,
    content_tx: mpsc::Sender<ContentEvent>,
    tasks: TaskTracker,
) {
    let mut failure = None;
    loop {
        let next = tokio::select! {
            () = shared.token.cancelled() => break,
            next = rx.recv() => next,
        };
        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => {
                failure = Some(e);
                break;
            }
            None => break,
        };

        match Incoming::classify(message) {
            Incoming::Response { request_id, outcome } => {
                shared.resolve(&request_id, outcome).await;
            }
            Incoming::Request { request_id, request } => {
                let shared = Arc::clone(&shared);
                tasks.spawn(async move {
                    tokio::select! {
                        () = shared.token.cancelled() => {
                            debug!(request_id = %request_id, "Control request dispatch cancelled");
                        }
                        () = shared.handle_control_request(&request_id, request) => {}
                    }
                });
            }
            Incoming::Cancel(message) => {
                debug!(message = %message, "Ignoring control_cancel_request");
            }
            Incoming::Malformed { kind, message } => {
                warn!(kind, message = %message, "Dropping malformed control message");
            }
            Incoming::Content(message) => {
                shared.observe(&message);
                if !shared.deliver(&content_tx, ContentEvent::Message(message)).await {
                    break;
                }
            }
        }
    }

    shared.fail_pending().await;
    if let Some(e) = failure {
        debug!(error = %e, "Reader stopped on error");
        shared.deliver(&content_tx, ContentEvent::Error(e)).await;
    }
    shared.deliver(&content_tx, ContentEvent::End).await;
}

impl Shared {
    /// Write to the transport, giving up once the session is closing
    async fn write(&self, data: &str) -> Result<()> {
        tokio::select! {
            () = self.token.cancelled() => Err(ClaudeError::connection("Session is closing")),
            written = async { self.transport.lock().await.write(data).await } => written,
        }
    }

    async fn end_input(&self) -> Result<()> {
        tokio::select! {
            () = self.token.cancelled() => Err(ClaudeError::connection("Session is closing")),
            ended = async { self.transport.lock().await.end_input().await } => ended,
        }
    }

    /// Queue a content event; false once the consumer is gone or the session
    /// is closing with a full queue
    async fn deliver(&self, tx: &mpsc::Sender<ContentEvent>, event: ContentEvent) -> bool {
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Closed(_)) => false,
            Err(TrySendError::Full(event)) => tokio::select! {
                () = self.token.cancelled() => false,
                sent = tx.send(event) => sent.is_ok(),
            },
        }
    }

    async fn resolve(&self, request_id: &str, outcome: Result<Value>) {
        let sender = self.pending.lock().await.remove(request_id);
        match sender {
            Some(sender) => {
                trace!(request_id, ok = outcome.is_ok(), "Resolved control request");
                let _ = sender.send(outcome);
            }
            None => debug!(request_id, "Response for unknown control request"),
        }
    }

    async fn fail_pending(&self) {
        let mut pending = self.pending.lock().await;
        self.reader_done.store(true, Ordering::SeqCst);
        for (request_id, sender) in pending.drain() {
            debug!(request_id = %request_id, "Failing pending control request");
            let _ = sender.send(Err(ClaudeError::connection(
                "Control channel closed before a response arrived",
            )));
        }
    }

    fn observe(&self, message: &Value) {
        if message.get("type").and_then(Value::as_str) != Some("system")
            || message.get("subtype").and_then(Value::as_str) != Some("init")
        {
            return;
        }
        if let Ok(mut session) = self.session.lock() {
            session.session_id = message
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string);
            session.cwd = message.get("cwd").and_then(Value::as_str).map(str::to_string);
        }
    }

    fn hook_context(&self) -> HookContext {
        let (session_id, cwd) = match self.session.lock() {
            Ok(session) => (session.session_id.clone(), session.cwd.clone()),
            Err(_) => (None, None),
        };
        HookContext::new(session_id, cwd, Some(self.token.child_token()))
    }

    // ========================================================================
    // Inbound dispatch
    // ========================================================================

    async fn handle_control_request(&self, request_id: &str, request: Value) {
        let subtype = request
            .get("subtype")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        debug!(request_id, subtype = %subtype, "Handling control request");

        let response = match self.dispatch(request).await {
            Ok(body) => ControlResponse::success(request_id, body),
            Err(e) => {
                debug!(request_id, subtype = %subtype, error = %e, "Control request failed");
                ControlResponse::error(request_id, error_detail(e))
            }
        };

        let written = match response.to_line() {
            Ok(line) => self.write(&line).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(request_id, error = %e, "Failed to write control response");
        }
    }

    async fn dispatch(&self, request: Value) -> Result<Value> {
        match InboundRequest::parse(request)? {
            InboundRequest::CanUseTool(request) => self.can_use_tool(request).await,
            InboundRequest::HookCallback(request) => self.hook_callback(request).await,
            InboundRequest::McpMessage(request) => self.mcp_message(request).await,
        }
    }

    async fn can_use_tool(&self, request: PermissionRequest) -> Result<Value> {
        let callback = self
            .can_use_tool
            .as_ref()
            .ok_or_else(|| ClaudeError::control_protocol("canUseTool callback is not provided"))?;

        let suggestions = request
            .permission_suggestions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|suggestion| {
                match serde_json::from_value::<PermissionUpdate>(suggestion) {
                    Ok(update) => Some(update),
                    Err(e) => {
                        debug!(error = %e, "Skipping unrecognized permission suggestion");
                        None
                    }
                }
            })
            .collect();
        let context = ToolPermissionContext::with_cancellation(suggestions, self.token.child_token())
            .blocked_path(request.blocked_path);

        let result = callback
            .call(request.tool_name, request.input, context)
            .await?;
        PermissionManager::to_response(result)
    }

    async fn hook_callback(&self, request: HookCallbackRequest) -> Result<Value> {
        let hook = self.hooks.read().await.get(&request.callback_id).ok_or_else(|| {
            ClaudeError::hook(format!(
                "No hook callback found for ID: {}",
                request.callback_id
            ))
        })?;

        let output = hook
            .invoke(request.input, request.tool_use_id, self.hook_context())
            .await?;
        serde_json::to_value(&output).map_err(|e| ClaudeError::json_encode(e.to_string()))
    }

    async fn mcp_message(&self, request: McpMessageRequest) -> Result<Value> {
        let server_name = request.server_name.filter(|name| !name.is_empty());
        let message = request
            .message
            .filter(|message| message.as_object().is_some_and(|m| !m.is_empty()));
        let (Some(server_name), Some(message)) = (server_name, message) else {
            return Err(ClaudeError::mcp(
                "Missing server_name or message for MCP request",
            ));
        };

        let response = match self.sdk_mcp_servers.get(&server_name) {
            Some(server) => server.handle_message(message).await,
            None => JsonRpcResponse::error(
                message.get("id").cloned(),
                McpError::server_not_found(&server_name),
            )
            .into_value(),
        };
        Ok(json!({ "mcp_response": response }))
    }
}

/// Text sent in an error control response
fn error_detail(error: ClaudeError) -> String {
    match error {
        ClaudeError::ControlProtocol(message)
        | ClaudeError::Hook(message)
        | ClaudeError::Mcp(message)
        | ClaudeError::ControlRequestFailed(message) => message,
        other => other.to_string(),
    }
}
