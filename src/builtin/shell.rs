//! Local script execution via `bash`.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

/// Output of a finished script.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Feed `script` to `bash` on stdin, running in `dir` with extra `env`.
/// Uses bash (not sh) so scripts may rely on `set -o pipefail`.
pub fn exec_local(
    dir: &Path,
    script: &str,
    env: &BTreeMap<String, String>,
) -> std::io::Result<ExecOutput> {
    let mut child = Command::new("bash")
        .current_dir(dir)
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(ref mut stdin) = child.stdin {
        stdin.write_all(script.as_bytes())?;
    }

    let output = child.wait_with_output()?;
    Ok(ExecOutput {
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

/// Quote `s` as a single bash word.
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// A script line running `file` with `args` under `set -euo pipefail`.
pub fn invocation(file: &str, args: &[String]) -> String {
    let mut line = format!("set -euo pipefail\nbash {}", quote(file));
    for arg in args {
        line.push(' ');
        line.push_str(&quote(arg));
    }
    line.push('\n');
    line
}
