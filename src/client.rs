//! `ClaudeSDKClient` for interactive, stateful sessions
//!
//! The client keeps one CLI process alive across many exchanges. It always
//! runs in streaming mode, so permission callbacks, hooks, in-process MCP
//! servers and interrupts are all available.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                    ClaudeSDKClient                      │
//! │                                                         │
//! │   query() ──────┐          ┌──── receive_messages()     │
//! │                 ▼          │                            │
//! │        ┌──────────────────────────────┐                 │
//! │        │       ProtocolHandler        │                 │
//! │        │  reader task · control reqs  │                 │
//! │        │  content queue · dispatch    │                 │
//! │        └──────────────┬───────────────┘                 │
//! │                       ▼                                 │
//! │               Transport (stdio)                         │
//! └───────────────────────────────────────────────────────┘
//! ```
//!
//! Sending and receiving are independent: the reader task keeps draining the
//! CLI's output while the caller writes. Every operation except `connect` and
//! `disconnect` takes `&self`, so one task can consume a response while
//! another interrupts it or sends the next prompt.
//!
//! # Example: Basic Usage
//!
//! ```no_run
//! use claude_code_sdk::{ClaudeAgentOptions, ClaudeSDKClient, Message, StreamExt};
//!
//! # async fn example() -> claude_code_sdk::Result<()> {
//! let mut client = ClaudeSDKClient::new(ClaudeAgentOptions::default());
//! client.connect(None).await?;
//!
//! client.query("What is the capital of France?").await?;
//! {
//!     let mut response = Box::pin(client.receive_response()?);
//!     while let Some(message) = response.next().await {
//!         if let Message::Assistant { message, .. } = message? {
//!             println!("Claude: {}", message.text());
//!         }
//!     }
//! }
//!
//! client.disconnect().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Example: Scoped Session
//!
//! ```no_run
//! use claude_code_sdk::{ClaudeAgentOptions, ClaudeSDKClient};
//! use futures::FutureExt;
//!
//! # async fn example() -> claude_code_sdk::Result<()> {
//! let mut client = ClaudeSDKClient::new(ClaudeAgentOptions::default());
//! let info = client
//!     .scoped(|client| async move { client.get_server_info() }.boxed())
//!     .await?;
//! println!("{info:?}");
//! # Ok(())
//! # }
//! ```

use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::control::{ProtocolConfig, ProtocolHandler};
use crate::error::{ClaudeError, Result};
use crate::message::parse_message;
use crate::permissions::PermissionManager;
use crate::transport::{PromptInput, SubprocessTransport, Transport};
use crate::types::{ClaudeAgentOptions, Message, PermissionMode, Prompt, user_message};

/// Session ID used by [`ClaudeSDKClient::query`]
pub const DEFAULT_SESSION_ID: &str = "default";

/// Client for bidirectional, multi-turn conversations with Claude
///
/// Created disconnected; [`connect`](Self::connect) starts the CLI. Every
/// other operation fails with [`ClaudeError::NotConnected`] until then.
pub struct ClaudeSDKClient {
    options: ClaudeAgentOptions,
    custom_transport: Option<Box<dyn Transport>>,
    handler: Option<ProtocolHandler>,
}

impl ClaudeSDKClient {
    /// Create a disconnected client
    #[must_use]
    pub fn new(options: ClaudeAgentOptions) -> Self {
        Self {
            options,
            custom_transport: None,
            handler: None,
        }
    }

    /// Create a disconnected client that will use `transport` instead of
    /// spawning the CLI
    ///
    /// The transport is consumed by the first [`connect`](Self::connect);
    /// later connections spawn the CLI.
    #[must_use]
    pub fn with_transport(options: ClaudeAgentOptions, transport: Box<dyn Transport>) -> Self {
        Self {
            options,
            custom_transport: Some(transport),
            handler: None,
        }
    }

    /// Options this client was created with
    #[must_use]
    pub fn options(&self) -> &ClaudeAgentOptions {
        &self.options
    }

    /// Start the CLI and perform the `initialize` handshake
    ///
    /// `None` opens an interactive session with no initial input. A
    /// [`Prompt::Messages`] stream is written in the background and ends the
    /// CLI's input once exhausted. A [`Prompt::Text`] prompt is passed on the
    /// command line, which leaves no control channel. An existing connection
    /// is closed first.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` when a permission callback is combined with a text
    ///   prompt or with `permission_prompt_tool_name`
    /// - `CliNotFound` / `Connection` when the CLI cannot be started or does
    ///   not complete the handshake
    pub async fn connect(&mut self, prompt: Option<Prompt>) -> Result<()> {
        self.disconnect().await?;

        let streaming = prompt.as_ref().is_none_or(Prompt::is_streaming);
        let mut options = self.options.clone();
        PermissionManager::prepare_options(&mut options, streaming)?;

        let mut transport = match self.custom_transport.take() {
            Some(transport) => transport,
            None => {
                let input = match &prompt {
                    Some(Prompt::Text(text)) => PromptInput::String(text.clone()),
                    _ => PromptInput::Stream,
                };
                Box::new(SubprocessTransport::new(input, options.clone())?) as Box<dyn Transport>
            }
        };
        transport.connect().await?;

        let mut handler =
            ProtocolHandler::new(transport, ProtocolConfig::from_options(&options, streaming));
        handler.start().await;
        if let Err(e) = handler.initialize().await {
            if let Err(close_error) = handler.close().await {
                debug!(error = %close_error, "Failed to close after initialize error");
            }
            return Err(e);
        }

        if let Some(Prompt::Messages(stream)) = prompt {
            handler.stream_input(stream);
        }

        info!(streaming, "Connected to Claude Code CLI");
        self.handler = Some(handler);
        Ok(())
    }

    fn handler(&self) -> Result<&ProtocolHandler> {
        self.handler.as_ref().ok_or_else(ClaudeError::not_connected)
    }

    /// Send a prompt in the `"default"` session
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before [`connect`](Self::connect), or the
    /// transport's write error.
    pub async fn query(&self, prompt: impl Into<Prompt>) -> Result<()> {
        self.query_with_session(prompt, DEFAULT_SESSION_ID).await
    }

    /// Send a prompt tagged with `session_id`
    ///
    /// A text prompt is wrapped in a user message. Each message of a stream
    /// is written in order, with `session_id` added where it is missing.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before [`connect`](Self::connect), or the
    /// transport's write error.
    pub async fn query_with_session(
        &self,
        prompt: impl Into<Prompt>,
        session_id: &str,
    ) -> Result<()> {
        let handler = self.handler()?;
        match prompt.into() {
            Prompt::Text(text) => handler.write_message(&user_message(&text, session_id)).await,
            Prompt::Messages(mut messages) => {
                while let Some(mut message) = messages.next().await {
                    if let Value::Object(fields) = &mut message {
                        fields
                            .entry("session_id")
                            .or_insert_with(|| json!(session_id));
                    }
                    handler.write_message(&message).await?;
                }
                Ok(())
            }
        }
    }

    /// Ask the CLI to stop the current turn
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, `ControlTimeout`, or the CLI's error.
    pub async fn interrupt(&self) -> Result<()> {
        self.handler()?.interrupt().await
    }

    /// Change the permission mode mid-session
    ///
    /// # Errors
    ///
    /// Returns `NotConnected`, `ControlTimeout`, or the CLI's error.
    pub async fn set_permission_mode(&self, mode: PermissionMode) -> Result<()> {
        self.handler()?.set_permission_mode(mode).await
    }

    /// The CLI's answer to `initialize` (commands, output styles, ...)
    ///
    /// `None` when the session was opened with a text prompt.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before [`connect`](Self::connect).
    pub fn get_server_info(&self) -> Result<Option<Value>> {
        Ok(self.handler()?.initialization_result().cloned())
    }

    /// Every content message of the session, in order
    ///
    /// The stream ends when the CLI's output ends. A transport failure is
    /// yielded as the last item. Unparseable messages are yielded as
    /// `MessageParse` errors and the stream continues.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before [`connect`](Self::connect).
    pub fn receive_messages(&self) -> Result<impl Stream<Item = Result<Message>> + '_> {
        Ok(self
            .handler()?
            .receive_messages()
            .map(|item| item.and_then(parse_message)))
    }

    /// Messages up to and including the next [`Message::Result`]
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before [`connect`](Self::connect).
    pub fn receive_response(&self) -> Result<impl Stream<Item = Result<Message>> + '_> {
        let messages = self.receive_messages()?;
        Ok(async_stream::stream! {
            let mut messages = std::pin::pin!(messages);
            while let Some(item) = messages.next().await {
                let done = matches!(&item, Ok(message) if message.is_result());
                yield item;
                if done {
                    break;
                }
            }
        })
    }

    /// Whether a session is open
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.handler.as_ref().is_some_and(|h| !h.is_closed())
    }

    /// Close the session; does nothing when not connected
    ///
    /// # Errors
    ///
    /// Returns the transport's close error. The client is disconnected
    /// either way.
    pub async fn disconnect(&mut self) -> Result<()> {
        let Some(mut handler) = self.handler.take() else {
            return Ok(());
        };
        debug!("Disconnecting from Claude Code CLI");
        handler.close().await
    }

    /// Connect, run `body`, then disconnect whatever `body` returned
    ///
    /// An error from `body` is returned unchanged after the disconnect.
    ///
    /// # Errors
    ///
    /// Returns the connect error, the error of `body`, or the disconnect
    /// error, in that order of precedence.
    pub async fn scoped<T, F>(&mut self, body: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a mut ClaudeSDKClient) -> BoxFuture<'a, Result<T>>,
    {
        self.connect(None).await?;
        let outcome = body(&mut *self).await;
        let disconnected = self.disconnect().await;
        let value = outcome?;
        disconnected?;
        Ok(value)
    }
}

impl std::fmt::Debug for ClaudeSDKClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaudeSDKClient")
            .field("options", &self.options)
            .field("custom_transport", &self.custom_transport.is_some())
            .field("handler", &self.handler)
            .finish()
    }
}
