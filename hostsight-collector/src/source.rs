//! Raw text providers.
//!
//! Readers never touch the filesystem or spawn processes directly; they ask a
//! [`TextSource`] for text. [`SystemSource`] talks to the real host and
//! [`StaticSource`] serves fixtures, which keeps every parser testable with
//! plain strings.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::trace;

/// Capability that produces raw text for the readers.
pub trait TextSource: Send + Sync {
    /// Read a whole file as text.
    fn read_file(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send;

    /// Run a program and return its standard output.
    ///
    /// A non-zero exit status is an error.
    fn run_command(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = io::Result<String>> + Send;
}

/// Reads the live host through `tokio::fs` and `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSource;

impl SystemSource {
    pub fn new() -> Self {
        Self
    }
}

impl TextSource for SystemSource {
    fn read_file(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        async move { tokio::fs::read_to_string(path).await }
    }

    fn run_command(
        &self,
        program: &str,
        args: &[String],
    ) -> impl Future<Output = io::Result<String>> + Send {
        async move {
            trace!(program, ?args, "Running command");

            // Dropping the future (timeout) must not leave the child running
            let output = tokio::process::Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await?;

            if !output.status.success() {
                return Err(io::Error::other(format!(
                    "{} exited with {}: {}",
                    program,
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }

            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
    }
}

/// Serves fixed text, for tests and dry runs.
///
/// Unknown files and commands fail with `NotFound`, which readers report as an
/// unavailable source.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    files: HashMap<PathBuf, String>,
    commands: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the content of a file.
    pub fn with_file(mut self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        self.files
            .insert(path.as_ref().to_path_buf(), content.into());
        self
    }

    /// Register the output of a program, whatever its arguments.
    pub fn with_command(mut self, program: impl Into<String>, output: impl Into<String>) -> Self {
        self.commands.insert(program.into(), output.into());
        self
    }

    /// Forget a file so the next read fails.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    /// Forget a command so the next run fails.
    pub fn remove_command(&mut self, program: &str) {
        self.commands.remove(program);
    }
}

impl TextSource for StaticSource {
    fn read_file(&self, path: &Path) -> impl Future<Output = io::Result<String>> + Send {
        let result = self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no fixture for {}", path.display()),
            )
        });
        async move { result }
    }

    fn run_command(
        &self,
        program: &str,
        _args: &[String],
    ) -> impl Future<Output = io::Result<String>> + Send {
        let result = self.commands.get(program).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no fixture for command {}", program),
            )
        });
        async move { result }
    }
}
