//! External process-listing command.
//!
//! Runs a `top`-like command built from a configurable template and captures
//! its standard output. Standard error is inherited by this process.

use std::fmt;
use std::io;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

use crate::config::USER_PLACEHOLDER;

/// Indentation inserted after every newline so the listing lines up inside `<pre>`.
const LISTING_INDENT: &str = "\n    ";

/// Why a listing invocation did not complete successfully.
#[derive(Debug, Error)]
pub enum ListingError {
    #[error("failed to start: {0}")]
    Spawn(#[source] io::Error),
    #[error("failed while waiting for output: {0}")]
    Wait(#[source] io::Error),
    #[error("{0}")]
    Status(ExitStatus),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// A failed invocation together with the text to show in its place:
/// whatever output was produced, followed by the error message.
#[derive(Debug)]
pub struct ListingFailure {
    pub output: String,
    pub error: ListingError,
}

/// Command line of the listing with the user name already substituted.
#[derive(Debug, Clone)]
pub struct ListingCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ListingCommand {
    /// Builds the command from `template`, replacing `{user}` in every argument.
    ///
    /// Returns `None` for an empty template.
    pub fn from_template(template: &[String], user: &str, timeout: Duration) -> Option<Self> {
        let (program, args) = template.split_first()?;
        Some(Self {
            program: program.replace(USER_PLACEHOLDER, user),
            args: args
                .iter()
                .map(|a| a.replace(USER_PLACEHOLDER, user))
                .collect(),
            timeout,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Runs the command to completion or until the timeout expires.
    ///
    /// On success the output is indented for embedding.
    #[instrument(skip(self), fields(cmd = %self))]
    pub async fn run(&self) -> Result<String, ListingFailure> {
        let mut buf = Vec::with_capacity(4096);

        let mut child = match Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return Err(self.failure(&buf, ListingError::Spawn(e))),
        };
        let mut stdout = child.stdout.take();

        let collected = timeout(self.timeout, async {
            if let Some(out) = stdout.as_mut() {
                if let Err(e) = out.read_to_end(&mut buf).await {
                    return Err(ListingError::Wait(e));
                }
            }
            child.wait().await.map_err(ListingError::Wait)
        })
        .await;

        let error = match collected {
            Ok(Ok(status)) if status.success() => {
                debug!("Listing produced {} bytes", buf.len());
                return Ok(indent(&String::from_utf8_lossy(&buf)));
            }
            Ok(Ok(status)) => ListingError::Status(status),
            Ok(Err(e)) => e,
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill timed out listing command: {}", e);
                }
                ListingError::Timeout(self.timeout)
            }
        };

        Err(self.failure(&buf, error))
    }

    fn failure(&self, partial: &[u8], error: ListingError) -> ListingFailure {
        let mut output = String::from_utf8_lossy(partial).into_owned();
        output.push_str(&format!("\n\nerror calling {}: {}\n", self, error));
        ListingFailure { output, error }
    }
}

impl fmt::Display for ListingCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        write!(f, "]")
    }
}

/// Indents every line after the first by four spaces.
pub fn indent(text: &str) -> String {
    text.replace('\n', LISTING_INDENT)
}
