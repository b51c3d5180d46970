//! Interactive REPL client example
//!
//! Type a message and press Enter. Ctrl-C while Claude is answering
//! interrupts the turn, `/plan` switches the permission mode, and `quit` ends
//! the session.
//!
//! Run with: cargo run --example `interactive_client`

use claude_code_sdk::{ClaudeAgentOptions, ClaudeSDKClient, Message, PermissionMode, StreamExt};
use std::io::{self, BufRead, Write};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let options = ClaudeAgentOptions::builder().max_turns(50).build();
    let mut client = ClaudeSDKClient::new(options);
    client.connect(None).await?;

    if let Some(info) = client.get_server_info()? {
        let commands = info["commands"].as_array().map_or(0, Vec::len);
        println!("Connected ({commands} commands available)\n");
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("You: ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        match input {
            "" => continue,
            "quit" | "exit" => break,
            "/plan" => {
                client.set_permission_mode(PermissionMode::Plan).await?;
                println!("(plan mode)");
                continue;
            }
            _ => {}
        }

        client.query(input).await?;

        print!("\nClaude: ");
        stdout.flush()?;
        let mut response = Box::pin(client.receive_response()?);
        // The turn still ends with a result message after an interrupt
        let interrupt_on_ctrl_c = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            println!("\n  [interrupting]");
            client.interrupt().await
        };
        tokio::pin!(interrupt_on_ctrl_c);
        let mut watching = true;

        loop {
            tokio::select! {
                message = response.next() => match message {
                    Some(Ok(Message::Assistant { message, .. })) => {
                        print!("{}", message.text());
                        stdout.flush()?;
                    }
                    Some(Ok(Message::Result { total_cost_usd, .. })) => {
                        if let Some(cost) = total_cost_usd {
                            println!("\n  [cost: ${cost:.4}]");
                        }
                        println!();
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        eprintln!("\nError: {e}");
                        break;
                    }
                    None => break,
                },
                interrupted = &mut interrupt_on_ctrl_c, if watching => {
                    watching = false;
                    interrupted?;
                }
            }
        }
    }

    client.disconnect().await?;
    println!("Session closed.");
    Ok(())
}
