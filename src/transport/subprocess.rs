//! Subprocess transport running the Claude Code CLI

use async_trait::async_trait;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{READ_CHANNEL_CAPACITY, Transport};
use super::buffer::{DEFAULT_MAX_BUFFER_SIZE, JsonLineBuffer};
use crate::error::{ClaudeError, Result};
use crate::types::{ClaudeAgentOptions, McpServers, SystemPrompt};
use crate::utils::preview;

// Environment variables that must not be overridden through options
const DANGEROUS_ENV_VARS: &[&str] = &[
    "LD_PRELOAD",
    "LD_LIBRARY_PATH",
    "DYLD_INSERT_LIBRARIES",
    "DYLD_LIBRARY_PATH",
    "PATH",
    "NODE_OPTIONS",
    "PYTHONPATH",
    "PERL5LIB",
    "RUBYLIB",
];

// Extra CLI flags forwarded from `extra_args`
const ALLOWED_EXTRA_FLAGS: &[&str] = &["timeout", "retries", "log-level", "cache-dir", "debug-to-stderr"];

/// Bytes requested from stdout per read
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Grace period for the CLI to exit after stdin closes
const CLOSE_GRACE: std::time::Duration = std::time::Duration::from_secs(5);

/// How the prompt reaches the CLI
#[derive(Debug, Clone)]
pub enum PromptInput {
    /// One-shot prompt passed on the command line; stdin is closed at once
    String(String),
    /// Messages written to stdin as stream-json
    Stream,
}

impl PromptInput {
    /// Whether stdin stays open for stream-json input
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Stream)
    }
}

impl From<String> for PromptInput {
    fn from(s: String) -> Self {
        PromptInput::String(s)
    }
}

impl From<&str> for PromptInput {
    fn from(s: &str) -> Self {
        PromptInput::String(s.to_string())
    }
}

/// Transport over the stdio of a `claude` child process
pub struct SubprocessTransport {
    prompt: PromptInput,
    options: ClaudeAgentOptions,
    cli_path: PathBuf,
    process: Option<Child>,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    ready: Arc<AtomicBool>,
    max_buffer_size: usize,
    reader_task: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<()>>,
    cancellation_token: CancellationToken,
}

impl SubprocessTransport {
    /// Create a transport; the CLI is located now but started on `connect`
    ///
    /// `options.cli_path` takes precedence over the `PATH` search.
    ///
    /// # Errors
    /// Returns `CliNotFound` if no CLI can be located.
    pub fn new(prompt: PromptInput, options: ClaudeAgentOptions) -> Result<Self> {
        let cli_path = match options.cli_path.clone() {
            Some(path) => path,
            None => Self::find_cli()?,
        };
        let max_buffer_size = options.max_buffer_size.unwrap_or(DEFAULT_MAX_BUFFER_SIZE);

        Ok(Self {
            prompt,
            options,
            cli_path,
            process: None,
            stdin: None,
            stdout: None,
            ready: Arc::new(AtomicBool::new(false)),
            max_buffer_size,
            reader_task: None,
            stderr_task: None,
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Find the Claude Code CLI binary
    fn find_cli() -> Result<PathBuf> {
        if let Ok(path) = which::which("claude") {
            return Ok(path);
        }

        let home = env::var("HOME").map(PathBuf::from).unwrap_or_default();
        let locations = [
            home.join(".npm-global/bin/claude"),
            PathBuf::from("/usr/local/bin/claude"),
            home.join(".local/bin/claude"),
            home.join("node_modules/.bin/claude"),
            home.join(".yarn/bin/claude"),
            home.join(".claude/local/claude"),
        ];

        locations
            .into_iter()
            .find(|path| path.is_file())
            .ok_or_else(ClaudeError::cli_not_found)
    }

    /// Argument list passed to the CLI
    fn build_args(&self) -> Result<Vec<String>> {
        let mut args: Vec<String> = vec![
            "--output-format".into(),
            "stream-json".into(),
            "--verbose".into(),
        ];
        let options = &self.options;

        match &options.system_prompt {
            Some(SystemPrompt::String(s)) => {
                args.extend(["--system-prompt".into(), s.clone()]);
            }
            Some(SystemPrompt::Preset(preset)) => {
                if let Some(append) = &preset.append {
                    args.extend(["--append-system-prompt".into(), append.clone()]);
                }
            }
            None => {}
        }

        if !options.allowed_tools.is_empty() {
            let tools: Vec<&str> = options.allowed_tools.iter().map(|t| t.as_str()).collect();
            args.extend(["--allowedTools".into(), tools.join(",")]);
        }
        if let Some(max_turns) = options.max_turns {
            args.extend(["--max-turns".into(), max_turns.to_string()]);
        }
        if !options.disallowed_tools.is_empty() {
            let tools: Vec<&str> = options.disallowed_tools.iter().map(|t| t.as_str()).collect();
            args.extend(["--disallowedTools".into(), tools.join(",")]);
        }
        if let Some(model) = &options.model {
            args.extend(["--model".into(), model.clone()]);
        }
        if let Some(tool) = &options.permission_prompt_tool_name {
            args.extend(["--permission-prompt-tool".into(), tool.clone()]);
        }
        if let Some(mode) = &options.permission_mode {
            args.extend(["--permission-mode".into(), mode.as_str().to_string()]);
        }
        if options.continue_conversation {
            args.push("--continue".into());
        }
        if let Some(session_id) = &options.resume {
            args.extend(["--resume".into(), session_id.to_string()]);
        }
        if let Some(settings) = &options.settings {
            args.extend(["--settings".into(), settings.to_string_lossy().into_owned()]);
        }
        for dir in &options.add_dirs {
            args.extend(["--add-dir".into(), dir.to_string_lossy().into_owned()]);
        }

        match &options.mcp_servers {
            McpServers::Dict(servers) if !servers.is_empty() => {
                let mut config = serde_json::Map::new();
                for (name, server) in servers {
                    config.insert(name.clone(), server.to_cli_json()?);
                }
                let config = serde_json::json!({ "mcpServers": config });
                args.extend(["--mcp-config".into(), config.to_string()]);
            }
            McpServers::Path(path) => {
                args.extend(["--mcp-config".into(), path.to_string_lossy().into_owned()]);
            }
            McpServers::Dict(_) | McpServers::None => {}
        }

        let mut disallowed: Vec<&str> = options
            .extra_args
            .keys()
            .map(String::as_str)
            .filter(|flag| !ALLOWED_EXTRA_FLAGS.contains(flag))
            .collect();
        if !disallowed.is_empty() {
            disallowed.sort_unstable();
            let flags = disallowed.join(", ");
            warn!(flags = %flags, allowed = ?ALLOWED_EXTRA_FLAGS, "Rejected disallowed CLI flags in extra_args");
            return Err(ClaudeError::invalid_config(format!(
                "Disallowed CLI flags in extra_args: [{flags}]. Allowed flags: {ALLOWED_EXTRA_FLAGS:?}"
            )));
        }
        for (flag, value) in &options.extra_args {
            args.push(format!("--{flag}"));
            if let Some(value) = value {
                args.push(value.clone());
            }
        }

        match &self.prompt {
            PromptInput::Stream => {
                args.extend(["--input-format".into(), "stream-json".into()]);
            }
            PromptInput::String(prompt) => {
                args.extend(["--print".into(), "--".into(), prompt.clone()]);
            }
        }

        Ok(args)
    }

    /// Environment overrides, after rejecting dangerous variables
    fn build_env(&self) -> Result<HashMap<String, String>> {
        let mut dangerous: Vec<&str> = self
            .options
            .env
            .keys()
            .map(String::as_str)
            .filter(|key| DANGEROUS_ENV_VARS.contains(key))
            .collect();
        if !dangerous.is_empty() {
            dangerous.sort_unstable();
            let vars = dangerous.join(", ");
            warn!(vars = %vars, "Rejected dangerous environment variables");
            return Err(ClaudeError::invalid_config(format!(
                "Dangerous environment variables detected: [{vars}]. These are blocked to prevent injection attacks."
            )));
        }

        let mut process_env = self.options.env.clone();
        process_env.insert("CLAUDE_CODE_ENTRYPOINT".to_string(), "sdk-rust".to_string());
        process_env.insert("CLAUDE_AGENT_SDK_VERSION".to_string(), crate::VERSION.to_string());
        if let Some(cwd) = &self.options.cwd {
            process_env.insert("PWD".to_string(), cwd.to_string_lossy().into_owned());
        }
        Ok(process_env)
    }
}

#[async_trait]
impl Transport for SubprocessTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.process.is_some() {
            return Ok(());
        }

        let args = self.build_args()?;
        let process_env = self.build_env()?;

        let mut cmd = Command::new(&self.cli_path);
        cmd.args(&args)
            .envs(process_env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.options.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(user) = &self.options.user {
            run_as(&mut cmd, user)?;
        }

        debug!(cli = %self.cli_path.display(), streaming = self.prompt.is_streaming(), "Starting Claude Code CLI");

        let mut child = cmd.spawn().map_err(|e| {
            if let Some(cwd) = self.options.cwd.as_ref().filter(|cwd| !cwd.exists()) {
                return ClaudeError::connection(format!(
                    "Working directory does not exist: {}",
                    cwd.display()
                ));
            }
            if e.kind() == std::io::ErrorKind::NotFound {
                return ClaudeError::cli_not_found();
            }
            ClaudeError::connection(format!("Failed to start Claude Code: {e}"))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stdin handle"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stdout handle"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ClaudeError::connection("Failed to get stderr handle"))?;

        // Drain stderr so the child never blocks on a full pipe
        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if !line.trim().is_empty() {
                    debug!(target: "claude_code_sdk::cli_stderr", "{}", preview(&line, 2000));
                }
            }
        });

        self.stdout = Some(stdout);
        self.process = Some(child);
        self.stderr_task = Some(stderr_task);
        self.ready.store(true, Ordering::SeqCst);

        if self.prompt.is_streaming() {
            self.stdin = Some(stdin);
        } else {
            let mut stdin = stdin;
            let _ = stdin.shutdown().await;
        }

        Ok(())
    }

    async fn write(&mut self, data: &str) -> Result<()> {
        if !self.is_ready() {
            return Err(ClaudeError::connection(
                "ProcessTransport is not ready for writing",
            ));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ClaudeError::connection("ProcessTransport is not ready for writing"))?;

        let written = async {
            stdin.write_all(data.as_bytes()).await?;
            stdin.flush().await
        }
        .await;

        if let Err(e) = written {
            self.ready.store(false, Ordering::SeqCst);
            return Err(ClaudeError::connection(format!(
                "Failed to write to process stdin: {e}"
            )));
        }
        Ok(())
    }

    async fn end_input(&mut self) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin
                .shutdown()
                .await
                .map_err(|e| ClaudeError::transport(format!("Failed to close stdin: {e}")))?;
        }
        Ok(())
    }

    fn read_messages(&mut self) -> mpsc::Receiver<Result<serde_json::Value>> {
        let (tx, rx) = mpsc::channel(READ_CHANNEL_CAPACITY);

        let stdout = self.stdout.take();
        let process = self.process.take();
        let ready = Arc::clone(&self.ready);
        let cancel = self.cancellation_token.clone();
        let buffer = JsonLineBuffer::new(self.max_buffer_size);

        let task = tokio::spawn(async move {
            let Some(stdout) = stdout else {
                let error = ClaudeError::connection("Not connected - stdout not available");
                forward(&tx, &cancel, Err(error)).await;
                return;
            };

            let finished = read_stdout(stdout, buffer, &tx, &cancel).await;
            ready.store(false, Ordering::SeqCst);

            let Some(mut child) = process else {
                return;
            };
            if !finished {
                let _ = child.start_kill();
                return;
            }
            let status = tokio::select! {
                () = cancel.cancelled() => {
                    let _ = child.start_kill();
                    return;
                }
                status = child.wait() => status,
            };
            match status {
                Ok(status) if !status.success() => {
                    let code = status.code().unwrap_or(-1);
                    let error = ClaudeError::process(
                        format!("Command failed with exit code {code}"),
                        code,
                        Some("Check stderr output for details".to_string()),
                    );
                    forward(&tx, &cancel, Err(error)).await;
                }
                Ok(_) => debug!("Claude Code CLI exited"),
                Err(e) => {
                    forward(&tx, &cancel, Err(ClaudeError::Io(e))).await;
                }
            }
        });

        self.reader_task = Some(task);
        rx
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn close(&mut self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);

        // Closing stdin asks the CLI to finish; the reader waits for the exit
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.shutdown().await;
        }

        if let Some(mut task) = self.reader_task.take() {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                debug!("CLI did not exit within grace period, killing");
                self.cancellation_token.cancel();
                let _ = task.await;
            }
        }
        self.cancellation_token.cancel();

        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        self.stdout = None;

        // Process never handed to a reader
        if let Some(mut child) = self.process.take() {
            match tokio::time::timeout(CLOSE_GRACE, child.wait()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(ClaudeError::Io(e)),
                Err(_) => {
                    let _ = child.kill().await;
                }
            }
        }

        Ok(())
    }
}

/// Switch the child to `user` before it execs
#[cfg(unix)]
fn run_as(cmd: &mut Command, user: &str) -> Result<()> {
    let (uid, gid) = resolve_user(user)?;
    debug!(user, uid, "Running CLI as another user");
    cmd.uid(uid);
    if let Some(gid) = gid {
        cmd.gid(gid);
    }
    Ok(())
}

#[cfg(not(unix))]
fn run_as(_cmd: &mut Command, user: &str) -> Result<()> {
    Err(ClaudeError::invalid_config(format!(
        "Cannot run the CLI as {user}: only supported on Unix"
    )))
}

/// uid, and primary gid when known, of a numeric uid or a local user name
#[cfg(unix)]
fn resolve_user(user: &str) -> Result<(u32, Option<u32>)> {
    if let Ok(uid) = user.parse::<u32>() {
        return Ok((uid, None));
    }
    let passwd = std::fs::read_to_string("/etc/passwd")
        .map_err(|e| ClaudeError::invalid_config(format!("Cannot resolve user {user}: {e}")))?;
    passwd_entry(&passwd, user)
        .ok_or_else(|| ClaudeError::invalid_config(format!("Unknown user: {user}")))
}

/// `name:password:uid:gid:...`
#[cfg(unix)]
fn passwd_entry(passwd: &str, user: &str) -> Option<(u32, Option<u32>)> {
    passwd.lines().find_map(|line| {
        let mut fields = line.split(':');
        if fields.next()? != user {
            return None;
        }
        let _password = fields.next()?;
        let uid = fields.next()?.parse().ok()?;
        let gid = fields.next().and_then(|gid| gid.parse().ok());
        Some((uid, gid))
    })
}

/// Decode stdout into `tx` until EOF or a failure
///
/// Returns true at EOF. Returns false when reading stopped early, after a
/// failure was forwarded, on cancellation, or once the receiver went away;
/// the caller kills the child in that case.
async fn read_stdout(
    mut stdout: ChildStdout,
    mut buffer: JsonLineBuffer,
    tx: &mpsc::Sender<Result<serde_json::Value>>,
    cancel: &CancellationToken,
) -> bool {
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => {
                debug!("CLI reader cancelled");
                return false;
            }
            read = stdout.read(&mut chunk) => read,
        };
        let n = match read {
            Ok(0) => return true,
            Ok(n) => n,
            Err(e) => {
                forward(tx, cancel, Err(ClaudeError::Io(e))).await;
                return false;
            }
        };
        match buffer.feed_bytes(&chunk[..n]) {
            Ok(messages) => {
                for message in messages {
                    trace!(
                        msg_type = message.get("type").and_then(|v| v.as_str()).unwrap_or("unknown"),
                        "Received message from CLI"
                    );
                    // Waits while the channel is full, leaving the CLI blocked on its pipe
                    if !forward(tx, cancel, Ok(message)).await {
                        return false;
                    }
                }
            }
            Err(e) => {
                forward(tx, cancel, Err(e)).await;
                return false;
            }
        }
    }
}

/// Send one item; false once cancelled or nobody is receiving
async fn forward(
    tx: &mpsc::Sender<Result<serde_json::Value>>,
    cancel: &CancellationToken,
    item: Result<serde_json::Value>,
) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        sent = tx.send(item) => sent.is_ok(),
    }
}

impl Drop for SubprocessTransport {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        if let Some(task) = self.stderr_task.take() {
            task.abort();
        }
        if let Some(mut child) = self.process.take() {
            let _ = child.start_kill();
        }
    }
}
