//! Control protocol between the SDK and the Claude Code CLI
//!
//! Control messages share the transport with conversation content. The
//! [`ProtocolHandler`] reads every line, keeps content flowing to the caller in
//! order, and answers the CLI's requests concurrently.
//!
//! ## Message Flow
//!
//! ```text
//! SDK                                   CLI
//!  |                                     |
//!  |--- control_request: initialize ---->|
//!  |<-- control_response ----------------|
//!  |                                     |
//!  |--- user message ------------------->|
//!  |<-- assistant message ---------------|
//!  |<-- control_request: can_use_tool ---|
//!  |--- control_response --------------->|
//!  |<-- control_request: hook_callback --|
//!  |--- control_response --------------->|
//!  |<-- control_request: mcp_message ----|
//!  |--- control_response --------------->|
//!  |--- control_request: interrupt ----->|
//!  |<-- control_response ----------------|
//!  |<-- result message ------------------|
//! ```
//!
//! Outbound requests are correlated by `req_<counter>_<random hex>` IDs and
//! fail after 60 seconds without an answer. Each inbound request gets exactly
//! one response, success or error.

pub mod handler;
pub mod protocol;

pub use handler::{
    CONTENT_QUEUE_CAPACITY, DEFAULT_CONTROL_TIMEOUT, ProtocolConfig, ProtocolHandler,
};
pub use protocol::{ControlResponse, InboundRequest, Incoming, OutboundRequest};
