//! In-memory transport for driving the engine from tests
//!
//! [`mock_transport`] returns a transport to hand to the SDK and a
//! [`MockHandle`] that plays the CLI: it feeds lines to the reader and sees
//! every line the SDK writes.

#![allow(dead_code)]

use async_trait::async_trait;
use claude_code_sdk::transport::Transport;
use claude_code_sdk::{ClaudeError, Result};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// How long a test waits for the SDK to write something
pub const WRITE_WAIT: Duration = Duration::from_secs(5);

/// Lines the "CLI" can emit before anything reads them
const INBOUND_CAPACITY: usize = 1024;

/// Route SDK events to the test output; `RUST_LOG=claude_code_sdk=trace`
/// shows every line the engine handles
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct MockState {
    ready: AtomicBool,
    input_ended: AtomicBool,
    stall_writes: AtomicBool,
    closes: AtomicUsize,
}

pub struct MockTransport {
    inbound: Option<mpsc::Receiver<Result<Value>>>,
    written: mpsc::UnboundedSender<String>,
    state: Arc<MockState>,
}

pub struct MockHandle {
    inbound: Option<mpsc::Sender<Result<Value>>>,
    written: mpsc::UnboundedReceiver<String>,
    skipped: VecDeque<Value>,
    state: Arc<MockState>,
}

pub fn mock_transport() -> (Box<dyn Transport>, MockHandle) {
    init_tracing();
    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
    let (written_tx, written_rx) = mpsc::unbounded_channel();
    let state = Arc::new(MockState::default());

    let transport = MockTransport {
        inbound: Some(inbound_rx),
        written: written_tx,
        state: Arc::clone(&state),
    };
    let handle = MockHandle {
        inbound: Some(inbound_tx),
        written: written_rx,
        skipped: VecDeque::new(),
        state,
    };
    (Box::new(transport), handle)
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        self.state.ready.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if !self.state.ready.load(Ordering::SeqCst) {
            return Err(ClaudeError::connection("MockTransport is not ready for writing"));
        }
        if self.state.stall_writes.load(Ordering::SeqCst) {
            // A CLI that stopped reading stdin
            std::future::pending::<()>().await;
        }
        self.written
            .send(data.to_string())
            .map_err(|_| ClaudeError::connection("Test harness dropped"))
    }

    async fn end_input(&mut self) -> Result<()> {
        if self.state.stall_writes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.state.input_ended.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn read_messages(&mut self) -> mpsc::Receiver<Result<Value>> {
        match self.inbound.take() {
            Some(rx) => rx,
            None => mpsc::channel(1).1,
        }
    }

    fn is_ready(&self) -> bool {
        self.state.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.state.ready.store(false, Ordering::SeqCst);
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MockHandle {
    /// Emit one line from the "CLI"
    pub fn send(&self, message: Value) {
        self.emit(Ok(message));
    }

    /// Emit a transport failure
    pub fn send_err(&self, error: ClaudeError) {
        self.emit(Err(error));
    }

    fn emit(&self, item: Result<Value>) {
        let Some(tx) = &self.inbound else { return };
        // A closed reader is fine; a full queue means the test outran it
        if let Err(TrySendError::Full(_)) = tx.try_send(item) {
            panic!("inbound queue full");
        }
    }

    /// End the "CLI" output
    pub fn finish(&mut self) {
        self.inbound = None;
    }

    /// Next line the SDK wrote, decoded
    pub async fn next_written(&mut self) -> Value {
        if let Some(value) = self.skipped.pop_front() {
            return value;
        }
        self.recv_written().await
    }

    async fn recv_written(&mut self) -> Value {
        let line = tokio::time::timeout(WRITE_WAIT, self.written.recv())
            .await
            .expect("timed out waiting for the SDK to write")
            .expect("transport dropped");
        assert!(line.ends_with('\n'), "line not newline-terminated: {line:?}");
        serde_json::from_str(line.trim_end()).expect("SDK wrote invalid JSON")
    }

    /// Whether the SDK wrote anything within `wait`
    pub async fn wrote_within(&mut self, wait: Duration) -> bool {
        if !self.skipped.is_empty() {
            return true;
        }
        match tokio::time::timeout(wait, self.written.recv()).await {
            Ok(Some(line)) => {
                if let Ok(value) = serde_json::from_str(line.trim_end()) {
                    self.skipped.push_back(value);
                }
                true
            }
            _ => false,
        }
    }

    /// Wait for a written line matching `predicate`; others stay queued
    pub async fn next_matching(&mut self, predicate: impl Fn(&Value) -> bool) -> Value {
        if let Some(pos) = self.skipped.iter().position(&predicate) {
            return self.skipped.remove(pos).expect("position is valid");
        }
        loop {
            let value = self.recv_written().await;
            if predicate(&value) {
                return value;
            }
            self.skipped.push_back(value);
        }
    }

    /// Wait for an outbound control request; returns `(request_id, request)`
    pub async fn expect_control_request(&mut self, subtype: &str) -> (String, Value) {
        let message = self
            .next_matching(|v| {
                v["type"] == "control_request" && v["request"]["subtype"] == subtype
            })
            .await;
        let request_id = message["request_id"]
            .as_str()
            .expect("control request without request_id")
            .to_string();
        (request_id, message["request"].clone())
    }

    /// Wait for the SDK's answer to an inbound request
    pub async fn expect_control_response(&mut self, request_id: &str) -> Value {
        let message = self
            .next_matching(|v| {
                v["type"] == "control_response" && v["response"]["request_id"] == request_id
            })
            .await;
        message["response"].clone()
    }

    pub fn respond_success(&self, request_id: &str, response: Value) {
        self.send(json!({
            "type": "control_response",
            "response": {"subtype": "success", "request_id": request_id, "response": response}
        }));
    }

    pub fn respond_error(&self, request_id: &str, error: &str) {
        self.send(json!({
            "type": "control_response",
            "response": {"subtype": "error", "request_id": request_id, "error": error}
        }));
    }

    /// Answer the `initialize` handshake; returns the request
    pub async fn serve_initialize(&mut self, response: Value) -> Value {
        let (request_id, request) = self.expect_control_request("initialize").await;
        self.respond_success(&request_id, response);
        request
    }

    /// Send a control request from the "CLI"
    pub fn request(&self, request_id: &str, request: Value) {
        self.send(json!({
            "type": "control_request",
            "request_id": request_id,
            "request": request
        }));
    }

    pub fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub fn input_ended(&self) -> bool {
        self.state.input_ended.load(Ordering::SeqCst)
    }

    /// Make every later write and `end_input` hang forever
    pub fn stall_writes(&self) {
        self.state.stall_writes.store(true, Ordering::SeqCst);
    }
}

pub fn assistant(text: &str) -> Value {
    json!({
        "type": "assistant",
        "message": {
            "model": "claude-sonnet-4-5",
            "content": [{"type": "text", "text": text}]
        }
    })
}

pub fn result(session_id: &str) -> Value {
    json!({
        "type": "result",
        "subtype": "success",
        "duration_ms": 1200,
        "duration_api_ms": 900,
        "is_error": false,
        "num_turns": 1,
        "session_id": session_id,
        "total_cost_usd": 0.001,
        "result": "4"
    })
}
