// CLI commands driving a compiler session
use anyhow::{Context, Result, bail};
use byteforge_common::config::Config;
use byteforge_common::types::{ErrorKind, ExecutionRequest, ExecutionResult};
use byteforge_session::{
    metrics, AuthProvider, HttpExecutionClient, SessionController, SessionError, TokenAuth,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::ClientArgs;

/// Environment config with command line overrides applied
fn resolve_config(args: &ClientArgs) -> Result<Config> {
    let mut config = Config::from_env().context("Invalid ByteForge environment configuration")?;

    if let Some(endpoint) = &args.endpoint {
        config.execution_url = endpoint.clone();
    }
    if let Some(token) = &args.token {
        config.token = Some(token.clone()).filter(|t| !t.is_empty());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_seconds = timeout;
    }

    Ok(config)
}

fn build_session(config: &Config) -> (Arc<SessionController>, Arc<TokenAuth>) {
    let auth = Arc::new(TokenAuth::new(config.token.clone()));
    let client = HttpExecutionClient::from_config(config).with_token_source(auth.clone());
    let controller = Arc::new(SessionController::new(client, auth.clone()));
    (controller, auth)
}

fn load_request(file: &Path, input: Option<&str>, input_file: Option<&Path>) -> Result<ExecutionRequest> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("Failed to read source file {}", file.display()))?;

    let stdin = match (input, input_file) {
        (Some(text), _) => text.to_string(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?,
        (None, None) => String::new(),
    };

    ExecutionRequest::new(source, stdin)
        .with_context(|| format!("Cannot submit {}", file.display()))
}

/// Render a settled run the way the compiler page shows it
pub fn render_result(result: &ExecutionResult) -> String {
    let mut out = String::new();

    match (&result.error_message, result.error_kind) {
        (None, _) => {
            out.push_str(&format!("✓ Program finished in {}ms\n", result.elapsed_ms));
            out.push_str(&result.output);
        }
        (Some(message), Some(ErrorKind::Transport)) => {
            out.push_str(&format!("✗ {}\n", message));
        }
        (Some(message), _) => {
            out.push_str(&format!(
                "✗ Your program failed to compile/run ({}ms)\n",
                result.elapsed_ms
            ));
            if !result.output.is_empty() {
                out.push_str(&result.output);
                if !result.output.ends_with('\n') {
                    out.push('\n');
                }
            }
            out.push_str(message);
        }
    }

    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Render a run that produced no program result
pub fn render_error(error: &SessionError) -> String {
    match error {
        SessionError::Authorization => {
            "✗ Log in to run code (use `login <token>` or set BYTEFORGE_TOKEN)".to_string()
        }
        SessionError::ConcurrentExecution => {
            "⚠ A program is already running; wait for it or `reset`".to_string()
        }
        SessionError::Transport(_) => format!("✗ {} (run again to retry)", error),
        SessionError::Cancelled => "⚠ Run cancelled".to_string(),
    }
}

/// Run one program through a fresh session; returns whether it succeeded
pub async fn run_program(
    file: &Path,
    input: Option<&str>,
    input_file: Option<&Path>,
    json: bool,
    args: &ClientArgs,
) -> Result<bool> {
    let config = resolve_config(args)?;
    let request = load_request(file, input, input_file)?;
    let (controller, _auth) = build_session(&config);

    debug!(endpoint = %config.execution_url, file = %file.display(), "Running program");

    match controller.run(request).await {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_result(&result));
            }
            Ok(result.is_success())
        }
        Err(SessionError::Transport(e)) if json => {
            // The transport failure is recorded in the session like any result
            match controller.current_result() {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => bail!("couldn't reach the execution service: {}", e),
            }
            Ok(false)
        }
        Err(e) => {
            eprintln!("{}", render_error(&e));
            Ok(false)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Run { file: PathBuf, input_file: Option<PathBuf> },
    Status,
    Reset,
    Login(String),
    Logout,
    Metrics,
    Help,
    Quit,
}

impl SessionCommand {
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace();
        let Some(verb) = parts.next() else {
            bail!("Empty command");
        };
        let args: Vec<&str> = parts.collect();

        let command = match (verb, args.as_slice()) {
            ("run", [file]) => SessionCommand::Run {
                file: PathBuf::from(file),
                input_file: None,
            },
            ("run", [file, input]) => SessionCommand::Run {
                file: PathBuf::from(file),
                input_file: Some(PathBuf::from(input)),
            },
            ("run", _) => bail!("Usage: run <file> [input-file]"),
            ("status", []) => SessionCommand::Status,
            ("reset", []) => SessionCommand::Reset,
            ("login", [token]) => SessionCommand::Login(token.to_string()),
            ("login", _) => bail!("Usage: login <token>"),
            ("logout", []) => SessionCommand::Logout,
            ("metrics", []) => SessionCommand::Metrics,
            ("help", []) => SessionCommand::Help,
            ("quit" | "exit", []) => SessionCommand::Quit,
            _ => bail!("Unknown command '{}' (try `help`)", line.trim()),
        };

        Ok(command)
    }
}

const SESSION_HELP: &str = "\
Commands:
  run <file> [input-file]  compile and run a program
  status                   show the session state and last result
  reset                    clear the result (cancels a pending run)
  login <token>            authenticate as a user
  logout                   drop the current user
  metrics                  print session metrics
  quit                     leave the session";

/// Interactive session reading commands from stdin
///
/// Runs execute in the background so `status` and `reset` stay usable while
/// a program is pending.
pub async fn interactive_session(args: &ClientArgs) -> Result<()> {
    let config = resolve_config(args)?;
    let (controller, auth) = build_session(&config);
    let mut pending: Option<JoinHandle<()>> = None;

    println!("ByteForge compiler session → {}", config.execution_url);
    if !auth.is_authenticated() {
        println!("Not logged in; use `login <token>` before running code");
    }
    println!("Type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let command = match SessionCommand::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match command {
            SessionCommand::Run { file, input_file } => {
                let request = match load_request(&file, None, input_file.as_deref()) {
                    Ok(request) => request,
                    Err(e) => {
                        println!("✗ {:#}", e);
                        continue;
                    }
                };

                let controller = controller.clone();
                let handle = tokio::spawn(async move {
                    match controller.run(request).await {
                        Ok(result) => print!("{}", render_result(&result)),
                        Err(e) => println!("{}", render_error(&e)),
                    }
                });

                // Keep the handle of the run that owns the session slot
                if pending.as_ref().map_or(true, |h| h.is_finished()) {
                    pending = Some(handle);
                }
            }
            SessionCommand::Status => {
                let snapshot = controller.snapshot();
                println!("Status: {} (runs: {})", snapshot.status, snapshot.runs_started);
                if let Some(result) = &snapshot.current_result {
                    print!("{}", render_result(result));
                }
            }
            SessionCommand::Reset => {
                controller.reset();
                println!("Session reset");
            }
            SessionCommand::Login(token) => {
                auth.login(token);
                println!("Logged in");
            }
            SessionCommand::Logout => {
                auth.logout();
                println!("Logged out");
            }
            SessionCommand::Metrics => {
                print!("{}", metrics::gather());
            }
            SessionCommand::Help => println!("{}", SESSION_HELP),
            SessionCommand::Quit => break,
        }
    }

    if let Some(handle) = pending {
        if !handle.is_finished() {
            controller.reset();
        }
        let _ = handle.await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            SessionCommand::parse("run Main.java").unwrap(),
            SessionCommand::Run {
                file: PathBuf::from("Main.java"),
                input_file: None
            }
        );
        assert_eq!(
            SessionCommand::parse("  run Main.java in.txt ").unwrap(),
            SessionCommand::Run {
                file: PathBuf::from("Main.java"),
                input_file: Some(PathBuf::from("in.txt"))
            }
        );
        assert_eq!(SessionCommand::parse("status").unwrap(), SessionCommand::Status);
        assert_eq!(SessionCommand::parse("reset").unwrap(), SessionCommand::Reset);
        assert_eq!(
            SessionCommand::parse("login abc").unwrap(),
            SessionCommand::Login("abc".to_string())
        );
        assert_eq!(SessionCommand::parse("exit").unwrap(), SessionCommand::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_commands() {
        assert!(SessionCommand::parse("run").is_err());
        assert!(SessionCommand::parse("login").is_err());
        assert!(SessionCommand::parse("status now").is_err());
        assert!(SessionCommand::parse("compile Main.java").is_err());
        assert!(SessionCommand::parse("   ").is_err());
    }

    #[test]
    fn test_render_success_panel() {
        let result = ExecutionResult::program("hi\n".to_string(), None, Utc::now(), 42);
        assert_eq!(render_result(&result), "✓ Program finished in 42ms\nhi\n");
    }

    #[test]
    fn test_render_program_error_panel() {
        let result = ExecutionResult::program(
            String::new(),
            Some("cannot find symbol".to_string()),
            Utc::now(),
            7,
        );
        let text = render_result(&result);
        assert!(text.starts_with("✗ Your program failed to compile/run (7ms)"));
        assert!(text.ends_with("cannot find symbol\n"));
    }

    #[test]
    fn test_render_transport_panel_differs() {
        let error = SessionError::Transport(byteforge_session::TransportError::Network(
            "connection refused".to_string(),
        ));
        let result = ExecutionResult::transport(error.to_string(), Utc::now(), 3);

        let panel = render_result(&result);
        assert!(panel.contains("couldn't reach the execution service"));
        assert!(!panel.contains("Your program failed"));

        assert!(render_error(&error).contains("retry"));
    }

    #[test]
    fn test_render_guard_errors() {
        assert!(render_error(&SessionError::Authorization).contains("Log in"));
        assert!(render_error(&SessionError::ConcurrentExecution).contains("already running"));
    }

    #[test]
    fn test_resolve_config_overrides() {
        let args = ClientArgs {
            endpoint: Some("http://localhost:9999/execute".to_string()),
            token: Some("tok".to_string()),
            timeout: Some(3),
        };
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.execution_url, "http://localhost:9999/execute");
        assert_eq!(config.token.as_deref(), Some("tok"));
        assert_eq!(config.timeout_seconds, 3);
    }
}
