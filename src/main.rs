use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use patch_sweep::config;
use patch_sweep::config::settings::Settings;
use patch_sweep::config::targets::load_targets;
use patch_sweep::pipeline::dispatcher::{DispatchMode, RunContext, run_all_targets};
use patch_sweep::remote::azcli::AzCli;
use patch_sweep::report::writer::ReportWriter;
use patch_sweep::runlog::RunLog;
use patch_sweep::summary::SummaryAggregator;

fn usage() {
    eprintln!("Usage: patch_sweep [--serial | --parallel N] [--settings FILE] <targets.csv>");
    eprintln!("  Assess and install guest patches for each target row.");
    eprintln!("  --serial       process targets one at a time, in order");
    eprintln!("  --parallel N   worker cap for parallel dispatch (0 = default)");
    eprintln!("  --settings     settings YAML (default: settings.yaml next to targets.csv)");
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        usage();
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("patch_sweep {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("PATCH_SWEEP_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut serial_flag = false;
    let mut parallel_limit: Option<usize> = None;
    let mut settings_path: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--serial" => serial_flag = true,
            "--parallel" => {
                let Some(value) = iter.next() else {
                    eprintln!("ERROR: --parallel requires a worker count");
                    return ExitCode::FAILURE;
                };
                match value.parse::<usize>() {
                    Ok(n) => parallel_limit = Some(n),
                    Err(_) => {
                        eprintln!("ERROR: invalid --parallel value '{value}'");
                        return ExitCode::FAILURE;
                    }
                }
            }
            "--settings" => {
                let Some(value) = iter.next() else {
                    eprintln!("ERROR: --settings requires a file path");
                    return ExitCode::FAILURE;
                };
                settings_path = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') => {
                eprintln!("ERROR: unknown flag '{other}'");
                usage();
                return ExitCode::FAILURE;
            }
            other => positional.push(other.to_string()),
        }
    }

    if serial_flag && parallel_limit.is_some() {
        eprintln!("ERROR: --serial and --parallel are mutually exclusive");
        return ExitCode::FAILURE;
    }
    let [target_file] = positional.as_slice() else {
        eprintln!("ERROR: expected exactly one target file");
        usage();
        return ExitCode::FAILURE;
    };
    let target_path = PathBuf::from(target_file);

    // Explicit settings file, or settings.yaml next to the target file.
    let settings = match &settings_path {
        Some(path) => Settings::from_file(path),
        None => config::load_settings_for_targets(&target_path),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to load settings: {e}");
            return ExitCode::FAILURE;
        }
    };

    let run_log = match RunLog::create(&settings.log_dir.join("run.log"), "patch_sweep", true) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: Cannot open run log: {e}");
            return ExitCode::FAILURE;
        }
    };

    let load_report = match load_targets(&target_path, &settings) {
        Ok(r) => r,
        Err(e) => {
            run_log.error(&format!("Aborting run: {e}"));
            return ExitCode::FAILURE;
        }
    };
    for rejected in &load_report.rejected {
        run_log.error(&format!("Row rejected: {}", rejected.reason));
    }
    run_log.info(&format!(
        "Loaded {} target(s) from {} ({} row(s) rejected)",
        load_report.targets.len(),
        target_path.display(),
        load_report.rejected.len()
    ));

    // Flags take precedence over settings; `serial: true` in settings can
    // still be overridden by an explicit --parallel.
    let mode = if serial_flag {
        DispatchMode::Serial
    } else if let Some(limit) = parallel_limit {
        DispatchMode::Parallel { limit }
    } else if settings.serial {
        DispatchMode::Serial
    } else {
        DispatchMode::Parallel {
            limit: settings.concurrency,
        }
    };

    let az = AzCli::new();
    let assessment_report = ReportWriter::new(settings.report_dir.join("assessment.csv"));
    let install_report = ReportWriter::new(settings.report_dir.join("install.csv"));

    let ctx = RunContext {
        inventory: &az,
        client: &az,
        assessment_report: &assessment_report,
        install_report: &install_report,
        run_log: &run_log,
        log_dir: settings.log_dir.clone(),
        poll_interval: Duration::from_secs(settings.poll_interval_secs),
    };

    let outcomes = match run_all_targets(&load_report.targets, mode, &ctx) {
        Ok(o) => o,
        Err(e) => {
            run_log.error(&format!("Aborting run: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let mut aggregator = SummaryAggregator::new();
    aggregator.note_rejected(load_report.rejected.len());
    for outcome in &outcomes {
        aggregator.record(outcome);
    }
    let summary = aggregator.finalize();
    for line in summary.to_string().lines() {
        run_log.info(line);
    }

    // Individual target failures are in the summary, not the exit code.
    ExitCode::SUCCESS
}
