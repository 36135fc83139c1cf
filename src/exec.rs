//! External toolchain execution
//!
//! This module is the only sanctioned way to invoke the certificate
//! toolchain. Every invocation is blocking, captures both output streams,
//! and treats a non-zero exit as fatal: the failing command line, its exit
//! status, and everything it printed are surfaced verbatim so the operator
//! can diagnose the toolchain directly.

use log::{debug, info};
use std::ffi::OsStr;
use std::process::{Command, Stdio};

use crate::error::{Result, SetupError};

/// Captured result of a successful toolchain invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Standard output, lossily decoded.
    pub stdout: String,
    /// Standard error, lossily decoded.
    pub stderr: String,
}

/// Render a program and its arguments the way a shell would show them.
fn render_command<S: AsRef<OsStr>>(program: &str, args: &[S]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        rendered.push_str(&arg.as_ref().to_string_lossy());
    }
    rendered
}

/// Run one external tool to completion and capture its output.
///
/// Non-zero exit is an error carrying the full diagnostic payload; spawn
/// failure (tool not installed) is reported the same way with status -1.
pub fn run_tool<S: AsRef<OsStr>>(program: &str, args: &[S]) -> Result<ToolOutput> {
    let rendered = render_command(program, args);
    debug!("running: {rendered}");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| SetupError::Tool {
            command: rendered.clone(),
            status: -1,
            stdout: String::new(),
            stderr: format!("failed to spawn: {e}"),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    if output.status.success() {
        info!("ok: {rendered}");
        Ok(ToolOutput { stdout, stderr })
    } else {
        Err(SetupError::Tool {
            command: rendered,
            status: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        })
    }
}
