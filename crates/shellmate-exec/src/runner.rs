use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use shellmate_core::state::ExecutionOutcome;
use tracing::debug;
use tracing::warn;

/// Runs an accepted command line through the host shell.
///
/// Never fails at the type level: a command that could not be started is a
/// [`ExecutionOutcome::LaunchFailure`], and a non-zero exit is still
/// [`ExecutionOutcome::Completed`].
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> ExecutionOutcome;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellRunner {
    program: String,
    flag: String,
    cwd: Option<PathBuf>,
}

impl ShellRunner {
    pub fn new() -> Self {
        if cfg!(windows) {
            Self::with_program("cmd")
        } else {
            Self::with_program("sh")
        }
    }

    /// Uses `program` as the interpreter; the command flag follows its family.
    pub fn with_program(program: impl Into<String>) -> Self {
        let program = program.into();
        let flag = command_flag(&program).to_string();
        Self {
            program,
            flag,
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> ExecutionOutcome {
        let mut process = Command::new(&self.program);
        process
            .arg(&self.flag)
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            process.current_dir(cwd);
        }

        debug!(program = %self.program, command = %command, "spawning shell");
        match process.output() {
            Ok(output) => ExecutionOutcome::Completed {
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code(),
            },
            Err(err) => {
                warn!(program = %self.program, error = %err, "failed to start shell");
                ExecutionOutcome::LaunchFailure {
                    reason: format!("{}: {err}", self.program),
                }
            }
        }
    }
}

/// Both separators are honoured so Windows paths classify the same on any host.
fn command_flag(program: &str) -> &'static str {
    let base = program.rsplit(['/', '\\']).next().unwrap_or(program);
    let name = base.to_ascii_lowercase();
    let name = name.strip_suffix(".exe").unwrap_or(&name);
    match name {
        "cmd" => "/C",
        "powershell" | "pwsh" => "-Command",
        _ => "-c",
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn flag_follows_interpreter_family() {
        assert_eq!(command_flag("sh"), "-c");
        assert_eq!(command_flag("/usr/bin/bash"), "-c");
        assert_eq!(command_flag("cmd"), "/C");
        assert_eq!(command_flag("C:\\Windows\\System32\\cmd.exe"), "/C");
        assert_eq!(command_flag("pwsh"), "-Command");
        assert_eq!(command_flag("C:/Program Files/PowerShell/7/pwsh.EXE"), "-Command");
        assert_eq!(command_flag("/opt/tools/cmd-helper"), "-c");
    }

    #[cfg(unix)]
    #[test]
    fn captures_stdout_through_pipes() {
        let outcome = ShellRunner::new().run("printf 'b\\na\\n' | sort");
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                stdout: "a\nb\n".to_string(),
                stderr: String::new(),
                exit_code: Some(0),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_zero_exit_is_still_completed() {
        let outcome = ShellRunner::new().run("echo oops >&2; exit 3");
        assert_eq!(
            outcome,
            ExecutionOutcome::Completed {
                stdout: String::new(),
                stderr: "oops\n".to_string(),
                exit_code: Some(3),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn stdin_is_closed() {
        let outcome = ShellRunner::new().run("cat; echo done");
        match outcome {
            ExecutionOutcome::Completed { stdout, .. } => assert_eq!(stdout, "done\n"),
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn missing_interpreter_is_a_launch_failure() {
        let outcome = ShellRunner::with_program("shellmate-no-such-shell").run("echo hi");
        assert!(matches!(outcome, ExecutionOutcome::LaunchFailure { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("marker.txt"), "x").expect("write marker");

        let outcome = ShellRunner::new().in_dir(dir.path()).run("ls");
        match outcome {
            ExecutionOutcome::Completed { stdout, exit_code, .. } => {
                assert_eq!(stdout.trim(), "marker.txt");
                assert_eq!(exit_code, Some(0));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
