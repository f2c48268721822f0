use std::{
    ffi::OsStr,
    path::Path,
    process::{Command, Stdio},
};

use crate::foundation::error::{TimelapseError, TimelapseResult};

/// Captured result of one external tool invocation.
#[derive(Clone, Debug)]
pub(crate) struct ToolOutput {
    pub(crate) command: String,
    pub(crate) success: bool,
    pub(crate) code: Option<i32>,
    pub(crate) stdout: String,
    pub(crate) stderr: String,
}

impl ToolOutput {
    /// Text used as the snapshot error when the tool failed.
    pub(crate) fn failure_text(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            self.stdout.trim().to_string()
        } else {
            stderr.to_string()
        }
    }

    pub(crate) fn into_checked(self) -> TimelapseResult<String> {
        if self.success {
            return Ok(self.stdout);
        }
        let code = self
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Err(TimelapseError::tool(format!(
            "'{}' exited with status {code}: {}",
            self.command,
            self.failure_text()
        )))
    }
}

/// Run `program` in `cwd` and block until it exits, capturing both output streams.
pub(crate) fn output<I, S>(cwd: &Path, program: &str, args: I) -> TimelapseResult<ToolOutput>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    let mut rendered = program.to_string();
    for arg in args {
        let arg = arg.as_ref();
        rendered.push(' ');
        rendered.push_str(&arg.to_string_lossy());
        cmd.arg(arg);
    }

    tracing::trace!(cwd = %cwd.display(), command = %rendered, "spawning tool");
    let out = cmd
        .current_dir(cwd)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| {
            TimelapseError::tool(format!(
                "failed to spawn '{program}' (is it installed and on PATH?): {e}"
            ))
        })?;

    Ok(ToolOutput {
        command: rendered,
        success: out.status.success(),
        code: out.status.code(),
        stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
    })
}

/// Like [`output`], but a nonzero exit becomes a [`TimelapseError::Tool`] carrying stderr.
pub(crate) fn checked<I, S>(cwd: &Path, program: &str, args: I) -> TimelapseResult<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    output(cwd, program, args)?.into_checked()
}

pub(crate) fn is_on_path(program: &str) -> bool {
    Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/process.rs"]
mod tests;
