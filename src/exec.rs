use crate::config::CommandSpec;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Number of decimal places for elapsed time display
const ELAPSED_TIME_PRECISION: usize = 2;

/// Outcome of running one command (or command sequence)
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// Whether every step exited with status zero
    pub ok: bool,
    /// Combined stdout/stderr of all steps
    pub log: String,
}

impl ExecResult {
    fn failed(message: String) -> Self {
        Self {
            ok: false,
            log: message,
        }
    }
}

fn display(spec: &CommandSpec) -> String {
    match spec {
        CommandSpec::Argv(argv) => argv.join(" "),
        CommandSpec::Shell(raw) => raw.clone(),
    }
}

fn build_command(spec: &CommandSpec) -> Command {
    match spec {
        CommandSpec::Argv(argv) => {
            let mut cmd = Command::new(&argv[0]);
            cmd.args(&argv[1..]);
            cmd
        }
        CommandSpec::Shell(raw) => {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(raw);
            cmd
        }
    }
}

/// Read lines from a child stream, echoing each to stderr while capturing it
async fn tee<R: AsyncRead + Unpin>(stream: R) -> String {
    let mut captured = String::new();
    let mut lines = BufReader::new(stream).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        eprintln!("{}", line);
        captured.push_str(&line);
        captured.push('\n');
    }
    captured
}

/// Run a single command, streaming its output live while capturing it.
///
/// A spawn failure (e.g. missing binary) is recorded in the result rather
/// than raised: the pipeline treats it like any other failed step.
pub async fn run(spec: &CommandSpec) -> ExecResult {
    let shown = display(spec);
    info!("Running: {}", shown);
    let start = Instant::now();

    let mut child = match build_command(spec)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to execute '{}': {}", shown, e);
            return ExecResult::failed(format!("Failed to execute '{}': {}", shown, e));
        }
    };

    // Streams are consumed concurrently so neither pipe can fill and stall the child
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (out, err, status) = tokio::join!(
        async {
            match stdout {
                Some(s) => tee(s).await,
                None => String::new(),
            }
        },
        async {
            match stderr {
                Some(s) => tee(s).await,
                None => String::new(),
            }
        },
        child.wait()
    );

    let ok = match status {
        Ok(status) => status.success(),
        Err(e) => {
            warn!("Failed to wait for '{}': {}", shown, e);
            false
        }
    };

    let elapsed = format!(
        "{:.prec$}",
        start.elapsed().as_secs_f64(),
        prec = ELAPSED_TIME_PRECISION
    );
    debug!("'{}' finished in {}s (ok: {})", shown, elapsed, ok);

    let mut log = out;
    log.push_str(&err);
    ExecResult { ok, log }
}

/// Run a command sequence, stopping at the first failing step.
///
/// Logs of executed steps are concatenated; `ok` is false if any step failed.
pub async fn run_sequence(specs: &[CommandSpec]) -> ExecResult {
    let mut log = String::new();
    for spec in specs {
        let result = run(spec).await;
        log.push_str(&result.log);
        if !result.ok {
            return ExecResult { ok: false, log };
        }
    }
    ExecResult { ok: true, log }
}
