//! One-shot query example
//!
//! Run with: `RUST_LOG=claude_code_sdk=debug` cargo run --example `simple_query`

use claude_code_sdk::{ClaudeAgentOptions, ContentBlock, Message, StreamExt, query};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let options = ClaudeAgentOptions::builder().max_turns(1).build();
    let stream = query("What is 2 + 2?", Some(options)).await?;
    let mut stream = Box::pin(stream);

    while let Some(message) = stream.next().await {
        match message? {
            Message::Assistant { message, .. } => {
                for block in &message.content {
                    if let ContentBlock::Text { text } = block {
                        println!("Claude: {text}");
                    }
                }
            }
            Message::Result {
                total_cost_usd,
                duration_ms,
                ..
            } => {
                println!("\n[{duration_ms} ms, cost: ${:.4}]", total_cost_usd.unwrap_or(0.0));
            }
            _ => {}
        }
    }

    Ok(())
}
