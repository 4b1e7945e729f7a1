#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub log_path: PathBuf,
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_gtv") {
        return PathBuf::from(path);
    }

    let exe_name = if cfg!(windows) { "gtv.exe" } else { "gtv" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!("unable to resolve gtv binary path for integration test"),
    }
}

/// Run `gtv` with `args`, feeding `stdin` through a pipe.
///
/// HOME and the activity log point into `sandbox` so runs never touch the
/// real user directories.
pub fn run_cli_case(case_name: &str, sandbox: &Path, args: &[&str], stdin: &str) -> CmdResult {
    let root = std::env::temp_dir().join("gtv-test-logs");
    fs::create_dir_all(&root).expect("create temp test log dir");

    let log_path = root.join(format!("{}-{}.log", sanitize(case_name), now_millis()));
    let bin_path = resolve_bin_path();

    let mut child = Command::new(&bin_path)
        .args(args)
        .current_dir(sandbox)
        .env("HOME", sandbox)
        .env_remove("XDG_CONFIG_HOME")
        .env_remove("XDG_DATA_HOME")
        .env("GTV_ACTIVITY_LOG", sandbox.join("activity.jsonl"))
        .env("GTV_EXPORT_DIR", sandbox)
        .env("NO_COLOR", "1")
        .env("RUST_BACKTRACE", "1")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("execute gtv command");
    {
        let mut pipe = child.stdin.take().expect("stdin pipe");
        // gtv may exit before reading everything (e.g. --version).
        let _ = pipe.write_all(stdin.as_bytes());
    }
    let output = child.wait_with_output().expect("wait for gtv");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let mut log_content = String::new();
    log_content.push_str(&format!("case={case_name}\n"));
    log_content.push_str(&format!("bin={}\n", bin_path.display()));
    log_content.push_str(&format!("args={args:?}\n"));
    log_content.push_str(&format!("status={}\n", output.status));
    log_content.push_str("----- stdout -----\n");
    log_content.push_str(&stdout);
    log_content.push('\n');
    log_content.push_str("----- stderr -----\n");
    log_content.push_str(&stderr);
    log_content.push('\n');
    fs::write(&log_path, log_content).expect("write test log");

    CmdResult {
        status: output.status,
        stdout,
        stderr,
        log_path,
    }
}

/// One `go test -json` line.
pub fn event_line(action: &str, package: &str, test: &str, output: &str, elapsed: f64) -> String {
    let mut value = serde_json::json!({
        "Time": "2024-03-07T08:05:09Z",
        "Action": action,
        "Package": package,
    });
    if !test.is_empty() {
        value["Test"] = test.into();
    }
    if !output.is_empty() {
        value["Output"] = output.into();
    }
    if elapsed > 0.0 {
        value["Elapsed"] = elapsed.into();
    }
    format!("{value}\n")
}

/// A small stream with one passing and one failing test.
pub fn mixed_stream() -> String {
    [
        event_line("start", "example.com/svc", "", "", 0.0),
        event_line("run", "example.com/svc", "TestOk", "", 0.0),
        event_line("output", "example.com/svc", "TestOk", "=== RUN   TestOk\n", 0.0),
        event_line("pass", "example.com/svc", "TestOk", "", 0.01),
        event_line("run", "example.com/svc", "TestBroken", "", 0.0),
        event_line("output", "example.com/svc", "TestBroken", "boom\n", 0.0),
        event_line("fail", "example.com/svc", "TestBroken", "", 0.02),
        event_line("fail", "example.com/svc", "", "", 0.05),
    ]
    .concat()
}
