//! Precommit hooks.
//!
//! A precommit hook runs after files are rewritten and before anything is
//! committed, typically to run the test suite against the new version. If
//! it fails, the working tree is checked out and nothing is committed.
//!
//! Any `FnMut(&HookContext) -> HookResult<()>` is a hook. [`ShellHook`] runs a list
//! of shell commands in order, with `{version}` and `{tag}` interpolated.

use std::process::Command;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use thiserror::Error;
use tracing::{debug, instrument};

/// Why a precommit hook failed.
#[derive(Error, Debug)]
pub enum HookError {
    /// A shell command exited unsuccessfully.
    #[error("precommit command `{command}` failed")]
    CommandFailed {
        /// The command as configured, before interpolation.
        command: String,
        /// Exit status, or `None` when killed by a signal.
        exit_code: Option<i32>,
        /// Trimmed stderr of the command.
        stderr: String,
    },

    /// `sh` could not be started.
    #[error("could not start precommit command: {0}")]
    Exec(#[from] std::io::Error),

    /// A hook supplied by the caller reported failure.
    #[error("precommit hook failed: {0}")]
    Rejected(String),
}

/// Result alias for hook operations.
pub type HookResult<T> = Result<T, HookError>;

/// Variables available to a precommit hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    /// The new version (e.g., `1.2.3`).
    pub version: String,
    /// The tag that will be created (e.g., `v1.2.3`).
    pub tag: String,
}

/// Runs before the bump is committed.
pub trait PrecommitHook {
    /// Return `Ok(())` to let the commit proceed.
    fn run(&mut self, context: &HookContext) -> HookResult<()>;
}

impl<F> PrecommitHook for F
where
    F: FnMut(&HookContext) -> HookResult<()>,
{
    fn run(&mut self, context: &HookContext) -> HookResult<()> {
        self(context)
    }
}

/// What a successful shell command printed.
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// The command as configured.
    pub command: String,
    /// Captured stdout.
    pub stdout: String,
    /// Wall-clock run time.
    pub duration: Duration,
}

/// A precommit hook made of shell commands, run one after another with `sh -c`.
///
/// Execution stops at the first command that fails.
#[derive(Debug, Clone)]
pub struct ShellHook {
    commands: Vec<String>,
    workdir: Utf8PathBuf,
    outputs: Vec<HookOutput>,
}

impl ShellHook {
    /// Create a hook running `commands` in `workdir`.
    pub fn new(commands: Vec<String>, workdir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            commands,
            workdir: workdir.into(),
            outputs: Vec::new(),
        }
    }

    /// Outputs of the commands that ran successfully in the last run.
    pub fn outputs(&self) -> &[HookOutput] {
        &self.outputs
    }

    fn exec(&self, template: &str, context: &HookContext) -> HookResult<HookOutput> {
        let line = expand(template, context);
        debug!(command = %line, workdir = %self.workdir, "precommit command");

        let started = Instant::now();
        let output = Command::new("sh")
            .arg("-c")
            .arg(&line)
            .current_dir(&self.workdir)
            .output()?;

        if output.status.success() {
            Ok(HookOutput {
                command: template.to_string(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                duration: started.elapsed(),
            })
        } else {
            Err(HookError::CommandFailed {
                command: template.to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

impl PrecommitHook for ShellHook {
    #[instrument(skip_all, fields(count = self.commands.len(), version = %context.version))]
    fn run(&mut self, context: &HookContext) -> HookResult<()> {
        self.outputs.clear();
        for template in &self.commands {
            let output = self.exec(template, context)?;
            self.outputs.push(output);
        }
        Ok(())
    }
}

/// Substitute `{version}` and `{tag}`; other braces are left alone.
fn expand(template: &str, context: &HookContext) -> String {
    template
        .replace("{version}", &context.version)
        .replace("{tag}", &context.tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8Path;
    use tempfile::TempDir;

    fn context() -> HookContext {
        HookContext {
            version: "1.2.3".into(),
            tag: "v1.2.3".into(),
        }
    }

    fn utf8_tmp(tmp: &TempDir) -> &Utf8Path {
        Utf8Path::from_path(tmp.path()).expect("tempdir is UTF-8")
    }

    #[test]
    fn expands_version_and_tag() {
        assert_eq!(
            expand("git log {tag}..HEAD && echo {version}", &context()),
            "git log v1.2.3..HEAD && echo 1.2.3"
        );
        assert_eq!(expand("echo {other}", &context()), "echo {other}");
    }

    #[test]
    fn closures_are_hooks() {
        let mut seen = Vec::new();
        let mut hook = |ctx: &HookContext| -> HookResult<()> {
            seen.push(ctx.version.clone());
            Ok(())
        };
        hook.run(&context()).unwrap();
        assert_eq!(seen, vec!["1.2.3"]);
    }

    #[test]
    fn shell_hook_runs_in_order() {
        let tmp = TempDir::new().unwrap();
        let mut hook = ShellHook::new(
            vec!["echo {version}".into(), "echo {tag}".into()],
            utf8_tmp(&tmp),
        );
        hook.run(&context()).unwrap();
        let outputs = hook.outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].stdout.trim(), "1.2.3");
        assert_eq!(outputs[1].stdout.trim(), "v1.2.3");
    }

    #[test]
    fn shell_hook_stops_at_failure() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let marker = root.join("ran");
        let mut hook = ShellHook::new(
            vec!["exit 3".into(), format!("touch {marker}")],
            root,
        );

        let err = hook.run(&context()).unwrap_err();
        assert!(matches!(
            err,
            HookError::CommandFailed {
                exit_code: Some(3),
                ..
            }
        ));
        assert!(!marker.exists());
    }

    #[test]
    fn shell_hook_runs_in_workdir() {
        let tmp = TempDir::new().unwrap();
        let root = utf8_tmp(&tmp);
        let mut hook = ShellHook::new(vec!["touch {version}.ok".into()], root);
        hook.run(&context()).unwrap();
        assert!(root.join("1.2.3.ok").exists());
    }
}
