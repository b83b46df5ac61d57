// 全ターゲット実行: 直列または上限付き並列でタスクを流す。
//
// Parallel admission is the rayon pool itself (sized to the limit) and
// completion is the pool's join; the polling thread only reports progress.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use rayon::prelude::*;

use crate::config::merged::TargetSpec;
use crate::error::PatchSweepError;
use crate::pipeline::executor::{OutcomeRecord, PhaseOutcome, execute_target};
use crate::remote::{Inventory, PatchClient};
use crate::report::flatten::flatten;
use crate::report::writer::ReportWriter;
use crate::runlog::RunLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// One target at a time, in spec order.
    Serial,
    /// One task per target through a pool capped at `limit` workers.
    /// 0 = pool default sizing.
    Parallel { limit: usize },
}

/// Everything a task needs besides its spec. Shared across workers; the
/// report writers serialize their own appends.
pub struct RunContext<'a, I, C> {
    pub inventory: &'a I,
    pub client: &'a C,
    pub assessment_report: &'a ReportWriter,
    pub install_report: &'a ReportWriter,
    pub run_log: &'a RunLog,
    /// Directory for per-task log files in parallel mode.
    pub log_dir: PathBuf,
    pub poll_interval: Duration,
}

/// Run every spec to completion and return their outcome records. Records
/// come back in spec order; per-target failures never abort the dispatch.
pub fn run_all_targets<I, C>(
    specs: &[TargetSpec],
    mode: DispatchMode,
    ctx: &RunContext<'_, I, C>,
) -> crate::error::Result<Vec<OutcomeRecord>>
where
    I: Inventory + Sync,
    C: PatchClient + Sync,
{
    match mode {
        DispatchMode::Serial => {
            ctx.run_log
                .info(&format!("Dispatching {} target(s) serially", specs.len()));
            Ok(specs
                .iter()
                .map(|spec| process_one(spec, ctx, ctx.run_log))
                .collect())
        }
        DispatchMode::Parallel { limit } => run_parallel(specs, limit, ctx),
    }
}

fn run_parallel<I, C>(
    specs: &[TargetSpec],
    limit: usize,
    ctx: &RunContext<'_, I, C>,
) -> crate::error::Result<Vec<OutcomeRecord>>
where
    I: Inventory + Sync,
    C: PatchClient + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(limit)
        .build()
        .map_err(|e| PatchSweepError::config(format!("Cannot build worker pool: {e}")))?;
    ctx.run_log.info(&format!(
        "Dispatching {} target(s) in parallel (limit: {})",
        specs.len(),
        if limit == 0 {
            "default".to_string()
        } else {
            limit.to_string()
        }
    ));

    let in_flight = AtomicUsize::new(0);
    let done = AtomicBool::new(false);

    let outcomes = std::thread::scope(|scope| {
        if !ctx.poll_interval.is_zero() {
            scope.spawn(|| {
                loop {
                    std::thread::sleep(ctx.poll_interval);
                    if done.load(Ordering::Acquire) {
                        break;
                    }
                    let running = in_flight.load(Ordering::Acquire);
                    ctx.run_log
                        .info(&format!("{running} target task(s) still running"));
                }
            });
        }

        let outcomes: Vec<OutcomeRecord> = pool.install(|| {
            specs
                .par_iter()
                .enumerate()
                .map(|(seq, spec)| {
                    in_flight.fetch_add(1, Ordering::AcqRel);
                    let outcome = run_task(seq + 1, spec, ctx);
                    in_flight.fetch_sub(1, Ordering::AcqRel);
                    outcome
                })
                .collect()
        });
        done.store(true, Ordering::Release);
        outcomes
    });

    Ok(outcomes)
}

/// One parallel task: own log sink, then the shared phase/report flow.
/// Concurrent targets never interleave within one log file.
fn run_task<I, C>(seq: usize, spec: &TargetSpec, ctx: &RunContext<'_, I, C>) -> OutcomeRecord
where
    I: Inventory + Sync,
    C: PatchClient + Sync,
{
    let log_path = ctx.log_dir.join(task_log_name(seq, &spec.name));
    match RunLog::create(&log_path, &spec.name, false) {
        Ok(task_log) => process_one(spec, ctx, &task_log),
        Err(e) => {
            // Task still runs, logging into the aggregate sink instead.
            ctx.run_log.error(&format!(
                "Cannot open task log {}: {e}; using run log",
                log_path.display()
            ));
            process_one(spec, ctx, ctx.run_log)
        }
    }
}

fn process_one<I, C>(spec: &TargetSpec, ctx: &RunContext<'_, I, C>, log: &RunLog) -> OutcomeRecord
where
    I: Inventory + Sync,
    C: PatchClient + Sync,
{
    let outcome = execute_target(spec, ctx.inventory, ctx.client, log);
    // Assessment row first, then install, matching phase order.
    write_phase_row(ctx.assessment_report, &outcome, &outcome.assessment, log);
    write_phase_row(ctx.install_report, &outcome, &outcome.install, log);
    outcome
}

/// Append the flattened Result Object, when the phase produced one. Write
/// failures are logged and contained; the row is never dropped silently.
fn write_phase_row(writer: &ReportWriter, outcome: &OutcomeRecord, phase: &PhaseOutcome, log: &RunLog) {
    let Some(result) = &phase.result else {
        return;
    };
    let fields = flatten(result);
    if let Err(e) = writer.append(&outcome.target, &fields) {
        log.error(&format!(
            "Failed to append report row for '{}' to {}: {e}",
            outcome.target,
            writer.path().display()
        ));
    }
}

/// `task-NN-<name>.log`, with the target name reduced to filename-safe
/// characters.
fn task_log_name(seq: usize, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    format!("task-{seq:02}-{safe}.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_log_name_sanitizes() {
        assert_eq!(task_log_name(3, "web 01/eu"), "task-03-web-01-eu.log");
    }

    #[test]
    fn test_task_log_name_pads_sequence() {
        assert_eq!(task_log_name(7, "db"), "task-07-db.log");
        assert_eq!(task_log_name(12, "db"), "task-12-db.log");
    }
}
