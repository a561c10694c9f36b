//! Remote-shell transport (the execute collaborator).
//!
//! RemoteTarget::new -> invoker argv (shell-split) + user + host
//! RemoteTarget::command_line -> `<invoker..> -l <user> <host> <command> <options..>`
//! Executor trait -> ShellExecutor (tokio child process, timeout, optional device lock)
//! PatliteClient -> command line + execute + logging
//!
use async_trait::async_trait;
use shell_words::split as shell_split;
use std::fmt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::patlite::EncodedCommand;

/* ---- Errors ---- */

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid invoker '{0}': {1}")]
    Invoker(String, String),

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("remote command timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

/* ---- Target ---- */

/// Where and how the device is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    invoker: Vec<String>,
    user: String,
    host: String,
}

impl RemoteTarget {
    /// Build a target from a shell-style invoker string (e.g. `rsh`, or
    /// `ssh -o BatchMode=yes`).
    pub fn new(invoker: &str, user: &str, host: &str) -> Result<Self, TransportError> {
        let trimmed = invoker.trim();
        if trimmed.is_empty() {
            return Err(TransportError::Invoker(
                invoker.to_string(),
                "invoker is empty".into(),
            ));
        }
        let parts = shell_split(trimmed)
            .map_err(|e| TransportError::Invoker(invoker.to_string(), e.to_string()))?;
        if parts.first().is_none_or(|p| p.is_empty()) {
            return Err(TransportError::Invoker(
                invoker.to_string(),
                "empty program name".into(),
            ));
        }
        Ok(Self {
            invoker: parts,
            user: user.to_string(),
            host: host.to_string(),
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    /// Argv for one invocation. Each encoded field is its own argument, so an
    /// empty `sec` still travels as `""` and alert keeps all six positions.
    /// Commands without options add nothing after the command name.
    pub fn command_line(&self, encoded: &EncodedCommand) -> Vec<String> {
        let mut argv = self.invoker.clone();
        argv.push("-l".into());
        argv.push(self.user.clone());
        argv.push(self.host.clone());
        argv.push(encoded.command().to_string());
        argv.extend(encoded.fields().into_iter().map(String::from));
        argv
    }

    /// Space-joined rendering used for logs and dry runs.
    pub fn display_line(&self, encoded: &EncodedCommand) -> String {
        format!(
            "{} -l {} {} {encoded}",
            self.invoker.join(" "),
            self.user,
            self.host,
        )
    }
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} via {}", self.user, self.host, self.invoker.join(" "))
    }
}

/* ---- Executor ---- */

#[async_trait]
pub trait Executor: Send + Sync {
    /// Run argv and return captured stdout.
    async fn execute(&self, argv: &[String]) -> Result<String, TransportError>;
}

/// Spawns the transport program directly (no shell interpolation).
#[derive(Debug)]
pub struct ShellExecutor {
    timeout: Duration,
    device_lock: Option<Mutex<()>>,
}

impl ShellExecutor {
    pub fn new(timeout: Duration, serialize: bool) -> Self {
        Self {
            timeout,
            device_lock: serialize.then(|| Mutex::new(())),
        }
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn execute(&self, argv: &[String]) -> Result<String, TransportError> {
        let Some((program, args)) = argv.split_first() else {
            return Err(TransportError::Invoker(String::new(), "empty command line".into()));
        };

        // Held until the child exits when device access is serialized.
        let _guard = match &self.device_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TransportError::Spawn {
                program: program.clone(),
                source,
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(|source| TransportError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(TransportError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/* ---- Client ---- */

/// Target + executor; the only place a command line is actually run.
#[derive(Clone)]
pub struct PatliteClient {
    target: RemoteTarget,
    executor: Arc<dyn Executor>,
}

impl PatliteClient {
    pub fn new(target: RemoteTarget, executor: Arc<dyn Executor>) -> Self {
        Self { target, executor }
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    pub async fn run(&self, encoded: &EncodedCommand) -> Result<String, TransportError> {
        info!(cmd = %self.target.display_line(encoded), "executing");
        let out = self.executor.execute(&self.target.command_line(encoded)).await?;
        debug!(command = %encoded.command(), output = %out.trim_end(), "device replied");
        Ok(out)
    }
}
