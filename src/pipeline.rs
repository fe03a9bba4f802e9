use crate::cli::Mode;
use crate::classify::{classify, failures_rule, warnings_rule};
use crate::config::Config;
use crate::diff;
use crate::exec::{self, ExecResult};
use crate::llm::{AnalysisMode, LlamaClient};
use crate::report::{PhaseStatus, Report};
use crate::server::LlamaServer;
use anyhow::bail;
use std::path::Path;
use tracing::{info, warn};

const EXIT_SUCCESS: i32 = 0;
const EXIT_FAILURE: i32 = 1;

/// Trailing raw log lines used as analysis context when a finding set is empty
const RAW_LOG_TAIL_LINES: usize = 50;

/// Run the whole pipeline: setup, build, test, decide, analyze, report.
///
/// Returns the process exit code: non-zero iff build or test failed. Fatal
/// infrastructure errors (setup failure, server never healthy, analysis
/// request failure) propagate as errors instead, with no report emitted.
pub async fn run(config: &Config, mode: Mode) -> anyhow::Result<i32> {
    if let Some(setup) = &config.setup {
        info!("Running setup command");
        let result = exec::run(setup).await;
        if !result.ok {
            bail!("setup command failed");
        }
    }

    info!("Build phase");
    let build = exec::run_sequence(&config.build).await;
    if build.ok {
        info!("Build succeeded");
    } else {
        warn!("Build failed");
    }
    let build_warnings = classify(&build.log, &warnings_rule());
    info!("Extracted {} warning/error line(s)", build_warnings.len());

    let test = if build.ok {
        info!("Test phase");
        Some(exec::run_sequence(&config.test).await)
    } else {
        info!("Skipping test phase: build failed");
        None
    };
    // Skipped tests are vacuously ok; they must never trigger a test-failure report
    let test_ok = test.as_ref().map(|t| t.ok).unwrap_or(true);
    let test_failures = test
        .as_ref()
        .map(|t| classify(&t.log, &failures_rule()))
        .unwrap_or_default();

    let Some(analysis_mode) = choose_analysis(mode, build.ok, test_ok, &build_warnings) else {
        info!("Build and tests green with no warnings, nothing to analyze");
        return Ok(EXIT_SUCCESS);
    };
    info!("Analysis mode: {}", analysis_mode.as_str());

    let context = analysis_context(
        analysis_mode,
        config,
        &build,
        test.as_ref(),
        &build_warnings,
        &test_failures,
    );

    // Server lifetime is scoped to the analysis; kill_on_drop backstops
    // every path where stop() is not reached.
    let mut server = LlamaServer::start(config)?;
    let analysis = analyze(&server, config, analysis_mode, &context).await;
    server.stop().await;
    let analysis = analysis?;

    let report = Report {
        issue_type: analysis_mode.into(),
        commit: diff::short_commit_hash(Path::new(".")),
        mode: mode.as_str(),
        build_status: phase_status(build.ok),
        test_status: test
            .map(|t| phase_status(t.ok))
            .unwrap_or(PhaseStatus::Skipped),
        analysis,
    };
    report.print();

    Ok(exit_code(build.ok, test_ok))
}

/// Await server readiness, then issue the single analysis request
async fn analyze(
    server: &LlamaServer,
    config: &Config,
    mode: AnalysisMode,
    context: &str,
) -> anyhow::Result<String> {
    let probe = reqwest::Client::new();
    server.wait_ready(&probe).await?;
    let client = LlamaClient::new(config.server_url())?;
    client
        .query(&config.system_prompt, &mode.prompt(context))
        .await
}

/// Pick at most one analysis request for this run.
///
/// Review mode always reviews the diff; otherwise build failure takes
/// priority over test failure, which takes priority over leftover warnings.
/// `None` is the fast path: nothing to analyze, no server start.
pub fn choose_analysis(
    mode: Mode,
    build_ok: bool,
    test_ok: bool,
    warnings: &[String],
) -> Option<AnalysisMode> {
    if mode == Mode::Review {
        return Some(AnalysisMode::Review);
    }
    if !build_ok {
        return Some(AnalysisMode::BuildFailure);
    }
    if !test_ok {
        return Some(AnalysisMode::TestFailure);
    }
    if !warnings.is_empty() {
        return Some(AnalysisMode::Warnings);
    }
    None
}

/// Exit code contract: failure only reflects the build and test phases
pub fn exit_code(build_ok: bool, test_ok: bool) -> i32 {
    if build_ok && test_ok {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

fn phase_status(ok: bool) -> PhaseStatus {
    if ok {
        PhaseStatus::Passed
    } else {
        PhaseStatus::Failed
    }
}

/// Assemble the context text for the chosen analysis mode
fn analysis_context(
    mode: AnalysisMode,
    config: &Config,
    build: &ExecResult,
    test: Option<&ExecResult>,
    warnings: &[String],
    failures: &[String],
) -> String {
    match mode {
        AnalysisMode::Review => diff::latest_commit_diff(Path::new("."), &config.review_exts),
        AnalysisMode::BuildFailure => findings_or_tail(warnings, &build.log),
        AnalysisMode::TestFailure => {
            findings_or_tail(failures, test.map(|t| t.log.as_str()).unwrap_or(""))
        }
        AnalysisMode::Warnings => warnings.join("\n"),
    }
}

/// Finding lines if there are any, otherwise the tail of the raw log.
///
/// A build can fail without producing a single pattern match (killed
/// process, configure error); the raw tail keeps the request useful.
fn findings_or_tail(findings: &[String], log: &str) -> String {
    if !findings.is_empty() {
        return findings.join("\n");
    }
    let lines: Vec<&str> = log.lines().collect();
    let start = lines.len().saturating_sub(RAW_LOG_TAIL_LINES);
    lines[start..].join("\n")
}
