//! Subprocess launching.

use crate::error::{PyghxError, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// A fully-specified command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub current_dir: Option<PathBuf>,
    pub env: Vec<(OsString, OsString)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        self.env
            .push((key.as_ref().to_os_string(), value.as_ref().to_os_string()));
        self
    }

    /// Space-joined command line for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.args.iter().map(OsString::as_os_str))
            .map(|s| s.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value this command sets for `key`, if any.
    pub fn env_value(&self, key: &str) -> Option<&OsStr> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }
}

/// Spawns a command, waits for it, and reports its exit status.
pub trait ProcessRunner {
    /// Exit code of the finished process.
    fn run(&self, spec: &CommandSpec) -> Result<i32>;
}

/// [`ProcessRunner`] using `std::process` with inherited stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, spec: &CommandSpec) -> Result<i32> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        if let Some(dir) = &spec.current_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        debug!("Spawning: {}", spec.display());
        let status = cmd.status().map_err(|e| PyghxError::LaunchFailed {
            program: spec.program.display().to_string(),
            message: e.to_string(),
        })?;

        status.code().ok_or_else(|| PyghxError::ProcessTerminated {
            program: spec.program.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_spec_builder() {
        let spec = CommandSpec::new("python3")
            .arg("-m")
            .args(["acme_tool", "--verbose"])
            .current_dir("/work")
            .env("PYTHONPATH", "/pkg/src")
            .env("PYTHONPATH", "/pkg");

        assert_eq!(spec.display(), "python3 -m acme_tool --verbose");
        assert_eq!(spec.current_dir, Some(PathBuf::from("/work")));
        assert_eq!(spec.env_value("PYTHONPATH"), Some(OsStr::new("/pkg")));
        assert_eq!(spec.env_value("HOME"), None);
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let result = SystemProcessRunner.run(&CommandSpec::new("pyghx-no-such-program"));
        assert!(matches!(result, Err(PyghxError::LaunchFailed { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_is_propagated() {
        let spec = CommandSpec::new("sh").args(["-c", "exit 7"]);
        assert_eq!(SystemProcessRunner.run(&spec).unwrap(), 7);

        let spec = CommandSpec::new("sh").args(["-c", "exit 0"]);
        assert_eq!(SystemProcessRunner.run(&spec).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_is_termination() {
        let spec = CommandSpec::new("sh").args(["-c", "kill -9 $$"]);
        assert!(matches!(
            SystemProcessRunner.run(&spec),
            Err(PyghxError::ProcessTerminated { .. })
        ));
    }
}
