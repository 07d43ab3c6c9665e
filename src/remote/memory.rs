//! An in-memory implementation of the [`Remote`][super::Remote] trait.
//!
//! Files live in a map. `cat`, `cp -p`, `mv -f` and `rm -f` act on that map; any other command
//! succeeds with no output unless a scripted reply matches it. Every command is recorded.
use crate::error::Error;
use crate::remote::{CommandOutput, Remote};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default, Debug)]
pub struct InMemoryRemote {
    files: Mutex<HashMap<String, String>>,
    replies: Mutex<Vec<(String, CommandOutput)>>,
    dropped: Mutex<Vec<String>>,
    history: Mutex<Vec<String>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryRemote {
    #[must_use]
    pub fn with_file(self, path: &str, contents: &str) -> Self {
        lock(&self.files).insert(path.to_string(), contents.to_string());
        self
    }

    /// Answer every later command starting with `prefix` with `output`. The most recently
    /// added matching reply wins.
    pub fn reply(&self, prefix: &str, output: CommandOutput) {
        lock(&self.replies).push((prefix.to_string(), output));
    }

    /// Fail every later command starting with `prefix`, and every later write to a path
    /// starting with it, with [`Error::Transport`].
    pub fn drop_connection(&self, prefix: &str) {
        lock(&self.dropped).push(prefix.to_string());
    }

    fn check_connection(&self, target: &str) -> Result<(), Error> {
        if lock(&self.dropped).iter().any(|p| target.starts_with(p.as_str())) {
            return Err(Error::Transport(format!("connection lost during `{target}`")));
        }
        Ok(())
    }

    /// The current contents of `path`, if it exists.
    #[must_use]
    pub fn file(&self, path: &str) -> Option<String> {
        lock(&self.files).get(path).cloned()
    }

    /// Every path that currently exists.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = lock(&self.files).keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Every command run so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }

    fn builtin(&self, command: &str) -> CommandOutput {
        let args: Vec<String> = command.split_whitespace().map(unquote).collect();
        let mut files = lock(&self.files);
        match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["cat", path] => match files.get(*path) {
                Some(contents) => CommandOutput {
                    stdout: contents.clone(),
                    ..CommandOutput::default()
                },
                None => failure(format!("cat: {path}: No such file or directory")),
            },
            ["cp", "-p", from, to] => match files.get(*from).cloned() {
                Some(contents) => {
                    files.insert((*to).to_string(), contents);
                    CommandOutput::default()
                }
                None => failure(format!("cp: cannot stat '{from}': No such file or directory")),
            },
            ["mv", "-f", from, to] => match files.remove(*from) {
                Some(contents) => {
                    files.insert((*to).to_string(), contents);
                    CommandOutput::default()
                }
                None => failure(format!("mv: cannot stat '{from}': No such file or directory")),
            },
            ["rm", "-f", path] => {
                files.remove(*path);
                CommandOutput::default()
            }
            _ => CommandOutput::default(),
        }
    }
}

fn failure(stderr: String) -> CommandOutput {
    CommandOutput {
        exit_code: 1,
        stdout: String::new(),
        stderr,
    }
}

fn unquote(arg: &str) -> String {
    arg.strip_prefix('\'')
        .and_then(|a| a.strip_suffix('\''))
        .unwrap_or(arg)
        .to_string()
}

#[async_trait::async_trait]
impl Remote for InMemoryRemote {
    async fn run(&self, command: &str) -> Result<CommandOutput, Error> {
        lock(&self.history).push(command.to_string());
        self.check_connection(command)?;
        let scripted = lock(&self.replies)
            .iter()
            .rev()
            .find(|(prefix, _)| command.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone());
        Ok(scripted.unwrap_or_else(|| self.builtin(command)))
    }

    async fn write_file(&self, path: &str, contents: &str) -> Result<(), Error> {
        self.check_connection(path)?;
        lock(&self.files).insert(path.to_string(), contents.to_string());
        Ok(())
    }
}
