//! An OpenSSH client implementation of the [`Remote`][super::Remote] trait.
//!
//! Each call spawns `ssh` non-interactively (`BatchMode=yes`), so servers must accept key
//! authentication for the configured user.
use crate::config::ServerConfig;
use crate::error::Error;
use crate::remote::{shell_quote, CommandOutput, Remote};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Clone)]
pub struct SshRemote {
    host: String,
    port: u16,
    user: String,
    key_path: Option<String>,
    timeout: Duration,
}

impl SshRemote {
    #[must_use]
    pub fn new(server: &ServerConfig) -> Self {
        Self {
            host: server.host.clone(),
            port: server.port,
            user: server.user.clone(),
            key_path: server
                .key_path
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned()),
            timeout: server.command_timeout,
        }
    }

    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-p")
            .arg(self.port.to_string())
            .arg("-l")
            .arg(&self.user);
        if let Some(key_path) = &self.key_path {
            cmd.arg("-i").arg(key_path);
        }
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.timeout.as_secs().max(1)))
            .arg(&self.host)
            .arg(remote_command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn output(&self, mut cmd: Command, stdin: Option<&str>) -> Result<CommandOutput, Error> {
        if stdin.is_some() {
            cmd.stdin(Stdio::piped());
        }
        let mut child = cmd
            .spawn()
            .map_err(|err| Error::Transport(format!("could not start ssh: {err}")))?;

        let run = async move {
            if let (Some(data), Some(mut pipe)) = (stdin, child.stdin.take()) {
                pipe.write_all(data.as_bytes()).await?;
                pipe.shutdown().await?;
            }
            child.wait_with_output().await
        };
        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| Error::RemoteTimeout(self.timeout))??;

        // ssh itself exits with 255 when the connection or authentication fails.
        let exit_code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if exit_code == 255 {
            return Err(Error::Transport(format!(
                "ssh to {}@{}:{} failed: {}",
                self.user,
                self.host,
                self.port,
                stderr.trim()
            )));
        }
        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}

#[async_trait::async_trait]
impl Remote for SshRemote {
    async fn run(&self, command: &str) -> Result<CommandOutput, Error> {
        tracing::debug!("ssh {}@{}: {command}", self.user, self.host);
        self.output(self.command(command), None).await
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), Error> {
        let command = format!("cat > {}", shell_quote(path));
        tracing::debug!("ssh {}@{}: {command}", self.user, self.host);
        let output = self.output(self.command(&command), Some(contents)).await?;
        if !output.success() {
            return Err(Error::RemoteWrite {
                path: path.to_string(),
                stderr: output.stderr,
            });
        }
        Ok(())
    }
}
