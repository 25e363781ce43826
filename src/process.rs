//! # External Process Module
//!
//! Questo modulo uniforma l'esecuzione dei tool esterni.
//!
//! ## Responsabilità:
//! - `ToolOutput`: risultato di un comando `{exit_code, stdout, stderr, error}`
//!   con il predicato `succeeded()`
//! - `ToolRunner`: trait usato da probe, repair, encode e metadata, così
//!   che ogni collaboratore legga il risultato nello stesso modo
//! - `SystemToolRunner`: implementazione reale con `tokio::process`
//!
//! ## Note:
//! - Nessun retry nascosto: i fallback (es. encoder hardware → software)
//!   sono sequenze esplicite di due chiamate nel chiamante
//! - Un tool mancante non genera panic: diventa un `ToolOutput` fallito
//!   con `error` valorizzato

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Instant;
use tracing::debug;

use crate::tool_resolver::ToolPathResolver;

/// Captured result of one external command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Program and arguments, for logs
    pub command: Vec<String>,
    /// Exit code, `None` when the process never ran or was killed by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Spawn error (tool not found, permission denied)
    pub error: Option<String>,
}

impl ToolOutput {
    /// Successful result with the given stdout
    pub fn success(command: Vec<String>, stdout: impl Into<String>) -> Self {
        Self {
            command,
            exit_code: Some(0),
            stdout: stdout.into(),
            ..Default::default()
        }
    }

    /// Result of a process that exited with `code`
    pub fn failure(command: Vec<String>, code: i32, stderr: impl Into<String>) -> Self {
        Self {
            command,
            exit_code: Some(code),
            stderr: stderr.into(),
            ..Default::default()
        }
    }

    /// Result of a process that could not be started
    pub fn spawn_error(command: Vec<String>, error: impl Into<String>) -> Self {
        Self {
            command,
            exit_code: None,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none() && self.exit_code == Some(0)
    }

    /// Short failure description for error messages
    pub fn failure_reason(&self) -> String {
        if let Some(ref error) = self.error {
            return error.clone();
        }
        let stderr = self.stderr.trim();
        let tail: String = stderr
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join(" | ");
        match self.exit_code {
            Some(code) if tail.is_empty() => format!("exit code {}", code),
            Some(code) => format!("exit code {}: {}", code, tail),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs an external tool to completion
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, tool: &str, args: &[String]) -> ToolOutput;
}

/// Runs tools as real child processes
#[derive(Debug, Clone, Default)]
pub struct SystemToolRunner {
    resolver: ToolPathResolver,
}

impl SystemToolRunner {
    pub fn new(resolver: ToolPathResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ToolRunner for SystemToolRunner {
    async fn run(&self, tool: &str, args: &[String]) -> ToolOutput {
        let program = self.resolver.command_for(tool);
        let mut command = Vec::with_capacity(args.len() + 1);
        command.push(tool.to_string());
        command.extend(args.iter().cloned());

        debug!("Running: {}", command.join(" "));
        let start_time = Instant::now();

        let output = tokio::process::Command::new(&program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await;

        match output {
            Ok(output) => {
                debug!(
                    "{} finished in {:.1}s with {:?}",
                    tool,
                    start_time.elapsed().as_secs_f64(),
                    output.status.code()
                );
                ToolOutput {
                    command,
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    error: None,
                }
            }
            Err(e) => ToolOutput::spawn_error(
                command,
                format!("Failed to execute {}: {}", program.display(), e),
            ),
        }
    }
}
