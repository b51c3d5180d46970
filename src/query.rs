//! One-shot queries
//!
//! [`query()`] runs a single exchange and yields its messages. Use it when
//! the whole input is known up front; use [`ClaudeSDKClient`](crate::ClaudeSDKClient)
//! to react to responses or send follow-ups.
//!
//! A text prompt goes on the command line and the CLI's stdin is closed, so
//! permission callbacks, hooks and in-process MCP servers need a
//! [`Prompt::Messages`] stream instead.

use futures::{Stream, StreamExt};
use tracing::debug;

use crate::control::{ProtocolConfig, ProtocolHandler};
use crate::error::Result;
use crate::message::parse_message;
use crate::permissions::PermissionManager;
use crate::transport::{PromptInput, SubprocessTransport, Transport};
use crate::types::{ClaudeAgentOptions, Message, Prompt};

/// Run one query against the Claude Code CLI
///
/// The returned stream yields every message until the CLI's output ends,
/// then closes the session. A message that cannot be parsed is yielded as an
/// error and the stream continues; a transport failure is yielded as the last
/// item.
///
/// # Example
///
/// ```no_run
/// use claude_code_sdk::{Message, StreamExt, query};
///
/// # async fn example() -> claude_code_sdk::Result<()> {
/// let stream = query("What is 2 + 2?", None).await?;
/// let mut stream = Box::pin(stream);
/// while let Some(message) = stream.next().await {
///     if let Message::Result { result, .. } = message? {
///         println!("{result:?}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// - `InvalidConfig` when a permission callback is combined with a text
///   prompt or with `permission_prompt_tool_name`
/// - `CliNotFound` / `Connection` when the CLI cannot be started or does not
///   complete the handshake
pub async fn query(
    prompt: impl Into<Prompt>,
    options: Option<ClaudeAgentOptions>,
) -> Result<impl Stream<Item = Result<Message>>> {
    let prompt = prompt.into();
    let mut options = options.unwrap_or_default();
    PermissionManager::prepare_options(&mut options, prompt.is_streaming())?;

    let input = match &prompt {
        Prompt::Text(text) => PromptInput::String(text.clone()),
        Prompt::Messages(_) => PromptInput::Stream,
    };
    let transport = SubprocessTransport::new(input, options.clone())?;
    run(prompt, options, Box::new(transport)).await
}

/// [`query()`] over a caller-supplied transport
///
/// # Errors
///
/// Same as [`query()`], with connection errors coming from `transport`.
pub async fn query_with_transport(
    prompt: impl Into<Prompt>,
    options: Option<ClaudeAgentOptions>,
    transport: Box<dyn Transport>,
) -> Result<impl Stream<Item = Result<Message>>> {
    let prompt = prompt.into();
    let mut options = options.unwrap_or_default();
    PermissionManager::prepare_options(&mut options, prompt.is_streaming())?;
    run(prompt, options, transport).await
}

async fn run(
    prompt: Prompt,
    options: ClaudeAgentOptions,
    mut transport: Box<dyn Transport>,
) -> Result<impl Stream<Item = Result<Message>>> {
    let streaming = prompt.is_streaming();
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
    if let Prompt::Messages(messages) = prompt {
        handler.stream_input(messages);
    }

    Ok(async_stream::stream! {
        {
            let mut messages = std::pin::pin!(handler.receive_messages());
            while let Some(item) = messages.next().await {
                match item {
                    Ok(data) => yield parse_message(data),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
        if let Err(e) = handler.close().await {
            debug!(error = %e, "Failed to close query session");
        }
    })
}
