//! Runs build steps as subprocesses.
//! Unaware of the operation graph; just command execution.

use crate::graph::CommandInfo;
use std::process::Stdio;

/// Everything a runner needs to execute one operation.
pub struct ProcessRequest<'a> {
    pub command: &'a CommandInfo,
    /// Declared paths, for runners that can't observe file access themselves.
    pub declared_input: Vec<&'a str>,
    pub declared_output: Vec<&'a str>,
}

/// The result of executing a build step.
#[derive(Debug, Default, Clone)]
pub struct ProcessResult {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Paths the process read, as reported by the runner.
    pub observed_reads: Vec<String>,
    /// Paths the process wrote, as reported by the runner.
    pub observed_writes: Vec<String>,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes a command synchronously, waiting for it to exit.
///
/// An Err() means the command could not be run at all; a command that ran
/// and failed is an Ok() with a non-zero exit code.
pub trait CommandRunner {
    fn run(&mut self, request: &ProcessRequest) -> anyhow::Result<ProcessResult>;
}

/// Runs commands through the platform shell.  It can't see which files a
/// process touches, so it reports the declared paths as observed.
#[derive(Default)]
pub struct ShellRunner {}

impl ShellRunner {
    pub fn new() -> Self {
        ShellRunner {}
    }
}

#[cfg(unix)]
fn shell_command(cmdline: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("/bin/sh");
    cmd.arg("-c").arg(cmdline);
    cmd
}

#[cfg(windows)]
fn shell_command(cmdline: &str) -> std::process::Command {
    let mut cmd = std::process::Command::new("cmd");
    cmd.arg("/c").arg(cmdline);
    cmd
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, request: &ProcessRequest) -> anyhow::Result<ProcessResult> {
        let command = request.command;
        let out = shell_command(&command.cmdline())
            .current_dir(&command.working_directory)
            .stdin(Stdio::null())
            .output()
            .map_err(|err| anyhow::anyhow!("spawn {:?}: {}", command.executable, err))?;

        let mut result = ProcessResult {
            exit_code: out.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
            observed_reads: Vec::new(),
            observed_writes: Vec::new(),
        };

        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(sig) = out.status.signal() {
                match sig {
                    libc::SIGINT => result.stderr.push_str("interrupted"),
                    _ => result.stderr.push_str(&format!("signal {}", sig)),
                }
            }
        }

        if result.success() {
            result.observed_reads = request.declared_input.iter().map(|p| p.to_string()).collect();
            result.observed_writes = request.declared_output.iter().map(|p| p.to_string()).collect();
        }
        Ok(result)
    }
}
