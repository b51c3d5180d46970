//! In-process tools, a permission callback and a hook in one session
//!
//! The calculator tools run inside this process; the CLI reaches them over
//! the control channel as `mcp__calc__add` and `mcp__calc__multiply`.
//!
//! Run with: `RUST_LOG=claude_code_sdk=debug` cargo run --example `sdk_mcp_tools`

use claude_code_sdk::hooks::{HookMatcherBuilder, HookRegistry};
use claude_code_sdk::mcp::{ToolResult, create_sdk_mcp_server, tool};
use claude_code_sdk::{
    ClaudeAgentOptions, ClaudeSDKClient, HookEvent, HookOutput, McpServers, Message,
    PermissionManager, PermissionResult, StreamExt,
};
use serde_json::json;
use std::collections::HashMap;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let add = tool(
        "add",
        "Add two numbers",
        json!({"a": "number", "b": "number"}),
        |args| async move {
            let sum = args["a"].as_f64().unwrap_or(0.0) + args["b"].as_f64().unwrap_or(0.0);
            Ok(ToolResult::text(format!("{sum}")))
        },
    );
    let multiply = tool(
        "multiply",
        "Multiply two numbers",
        json!({"a": "number", "b": "number"}),
        |args| async move {
            let product = args["a"].as_f64().unwrap_or(0.0) * args["b"].as_f64().unwrap_or(0.0);
            Ok(ToolResult::text(format!("{product}")))
        },
    );
    let calculator = create_sdk_mcp_server("calculator", "1.0.0", vec![add, multiply]);

    let permissions = PermissionManager::callback(|tool_name, _input, _ctx| async move {
        if tool_name.starts_with("mcp__calc__") {
            return Ok(PermissionResult::allow());
        }
        Ok(PermissionResult::deny(format!("{tool_name} is not allowed in this demo")))
    });

    let audit = HookRegistry::callback(|input, tool_use_id, _ctx| async move {
        println!("[hook] {} ({tool_use_id:?})", input["tool_name"]);
        Ok(HookOutput::default())
    });
    let mut hooks = HashMap::new();
    hooks.insert(
        HookEvent::PreToolUse,
        vec![HookMatcherBuilder::new(None::<String>).add_hook(audit).build()],
    );

    let options = ClaudeAgentOptions::builder()
        .mcp_servers(McpServers::Dict(HashMap::from([(
            "calc".to_string(),
            calculator,
        )])))
        .allowed_tools(vec!["mcp__calc__add".into(), "mcp__calc__multiply".into()])
        .can_use_tool(permissions)
        .hooks(hooks)
        .max_turns(5)
        .build();

    let mut client = ClaudeSDKClient::new(options);
    client.connect(None).await?;
    client
        .query("Use the calculator tools to compute (12 + 30) * 3.")
        .await?;

    let mut response = Box::pin(client.receive_response()?);
    while let Some(message) = response.next().await {
        match message? {
            Message::Assistant { message, .. } => println!("Claude: {}", message.text()),
            Message::Result { result, .. } => println!("Result: {result:?}"),
            _ => {}
        }
    }
    drop(response);

    client.disconnect().await?;
    Ok(())
}
