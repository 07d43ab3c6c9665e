//! Remote command execution on managed servers.
//!
//! Supports a generic interface for running shell commands and reading or writing files on a
//! domain controller.
//!
//! Two implementations are provided, [`ssh::SshRemote`] and [`memory::InMemoryRemote`]. The
//! former drives the OpenSSH client. The latter keeps files in memory and answers commands
//! from a script, for tests and dry runs.

use crate::error::Error;
use std::sync::Arc;

pub mod memory;
pub mod ssh;

#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryRemote;
#[allow(clippy::module_name_repetitions)]
pub use ssh::SshRemote;

/// `DynRemote` is a type alias for a [`Remote`] shared by every request that targets the same
/// server.
#[allow(clippy::module_name_repetitions)]
pub type DynRemote = Arc<dyn Remote + Send + Sync>;

/// The result of a finished remote command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// An async trait describing shell access to one server.
#[async_trait::async_trait]
pub trait Remote {
    /// Run `command` through the remote shell. A non-zero exit code is not an error here.
    async fn run(&self, command: &str) -> Result<CommandOutput, Error>;

    /// Replace the contents of the file at `path`.
    async fn write_file(&self, path: &str, contents: &str) -> Result<(), Error>;

    /// Read the file at `path`.
    async fn read_file(&self, path: &str) -> Result<String, Error> {
        let output = self.run(&format!("cat {}", shell_quote(path))).await?;
        if !output.success() {
            return Err(Error::RemoteRead {
                path: path.to_string(),
                stderr: output.stderr,
            });
        }
        Ok(output.stdout)
    }
}

/// Quote `arg` for a POSIX shell.
#[must_use]
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '-' | '_' | ':' | '='));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
