// 1ターゲット実行: インベントリ照会 -> 評価フェーズ -> インストールフェーズ。
//
// Never returns an error; every failure is captured into the outcome
// record so one target can never take down the dispatch of the others.

use serde_json::Value;

use crate::config::merged::TargetSpec;
use crate::config::targets::Action;
use crate::remote::{Fault, HostInfo, Inventory, MachineKind, OsFamily, PatchClient};
use crate::runlog::RunLog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseStatus {
    Succeeded,
    SucceededWithWarning,
    Failed,
    Skipped,
}

/// Short message for triage plus the full diagnostic text.
#[derive(Debug, Clone)]
pub struct FailureDetail {
    pub message: String,
    pub detail: String,
}

impl From<Fault> for FailureDetail {
    fn from(fault: Fault) -> Self {
        FailureDetail {
            message: fault.message,
            detail: fault.detail,
        }
    }
}

/// Result of one phase. `result` is kept whenever the remote call returned
/// a Result Object, including non-success statuses, so the report can
/// still carry the provider's own failure fields.
#[derive(Debug)]
pub struct PhaseOutcome {
    pub status: PhaseStatus,
    pub result: Option<Value>,
    pub failure: Option<FailureDetail>,
}

impl PhaseOutcome {
    fn skipped() -> Self {
        PhaseOutcome {
            status: PhaseStatus::Skipped,
            result: None,
            failure: None,
        }
    }

    fn failed(failure: FailureDetail, result: Option<Value>) -> Self {
        PhaseOutcome {
            status: PhaseStatus::Failed,
            result,
            failure: Some(failure),
        }
    }
}

/// The full per-target result. Owned by the dispatcher until handed to the
/// report/summary side; never mutated after creation.
#[derive(Debug)]
pub struct OutcomeRecord {
    pub target: String,
    pub assessment: PhaseOutcome,
    pub install: PhaseOutcome,
    /// Set when no phase ran at all (target absent from the inventory).
    pub skip_reason: Option<String>,
}

/// Run the phases of one target spec against the remote collaborators.
pub fn execute_target<I, C>(
    spec: &TargetSpec,
    inventory: &I,
    client: &C,
    log: &RunLog,
) -> OutcomeRecord
where
    I: Inventory + ?Sized,
    C: PatchClient + ?Sized,
{
    log.info(&format!(
        "Processing target '{}' in resource group '{}'",
        spec.name, spec.resource_group
    ));

    let Some(host) = inventory.lookup(&spec.name, &spec.resource_group) else {
        let reason = format!(
            "'{}' not found in resource group '{}' (neither VM nor Arc machine)",
            spec.name, spec.resource_group
        );
        log.warn(&format!("Skipping: {reason}"));
        return OutcomeRecord {
            target: spec.name.clone(),
            assessment: PhaseOutcome::skipped(),
            install: PhaseOutcome::skipped(),
            skip_reason: Some(reason),
        };
    };
    log.info(&format!(
        "'{}' classified as {} ({})",
        spec.name,
        kind_str(host.kind),
        host.os.map(os_str).unwrap_or("unknown OS")
    ));

    let assessment = if spec.action == Action::InstallOnly {
        PhaseOutcome::skipped()
    } else {
        run_phase(spec, "assessment", log, || client.assess(spec, &host))
    };

    // A failed assessment does not block the install attempt.
    let install = if spec.action == Action::AssessOnly {
        PhaseOutcome::skipped()
    } else {
        match host.os {
            None => {
                let failure = FailureDetail {
                    message: format!(
                        "install skipped for '{}': unknown or unsupported OS family",
                        spec.name
                    ),
                    detail: "inventory reported no usable OS type; \
                             cannot choose a classification set"
                        .to_string(),
                };
                log.error_with_detail(&failure.message, &failure.detail);
                PhaseOutcome::failed(failure, None)
            }
            Some(os) => {
                let classifications = classifications_for(spec, os);
                run_phase(spec, "install", log, || {
                    client.install(spec, &host, classifications)
                })
            }
        }
    };

    OutcomeRecord {
        target: spec.name.clone(),
        assessment,
        install,
        skip_reason: None,
    }
}

/// The classification filter matching the target's OS family.
fn classifications_for(spec: &TargetSpec, os: OsFamily) -> &[String] {
    match os {
        OsFamily::Windows => &spec.windows_classifications,
        OsFamily::Linux => &spec.linux_classifications,
    }
}

fn run_phase(
    spec: &TargetSpec,
    phase: &str,
    log: &RunLog,
    call: impl FnOnce() -> Result<Value, Fault>,
) -> PhaseOutcome {
    log.info(&format!("Starting {phase} for '{}'", spec.name));
    match call() {
        Ok(result) => classify_result(spec, phase, result, log),
        Err(fault) => {
            log.error_with_detail(
                &format!("{phase} failed for '{}': {}", spec.name, fault.message),
                &fault.detail,
            );
            PhaseOutcome::failed(fault.into(), None)
        }
    }
}

/// Map a returned Result Object onto a phase status: `Succeeded` with an
/// empty error field is a success, `Succeeded` with a non-empty error is a
/// success with warning, anything else failed.
fn classify_result(spec: &TargetSpec, phase: &str, result: Value, log: &RunLog) -> PhaseOutcome {
    let status = result.get("status").and_then(Value::as_str);
    if status == Some("Succeeded") {
        if error_field_is_empty(result.get("error")) {
            log.info(&format!("{phase} succeeded for '{}'", spec.name));
            PhaseOutcome {
                status: PhaseStatus::Succeeded,
                result: Some(result),
                failure: None,
            }
        } else {
            log.warn(&format!(
                "{phase} succeeded with warnings for '{}': {}",
                spec.name,
                result.get("error").map(Value::to_string).unwrap_or_default()
            ));
            PhaseOutcome {
                status: PhaseStatus::SucceededWithWarning,
                result: Some(result),
                failure: None,
            }
        }
    } else {
        let failure = FailureDetail {
            message: format!(
                "{phase} for '{}' returned status '{}'",
                spec.name,
                status.unwrap_or("<missing>")
            ),
            detail: result.to_string(),
        };
        log.error_with_detail(&failure.message, &failure.detail);
        PhaseOutcome::failed(failure, Some(result))
    }
}

/// Whether the provider's error field carries anything worth surfacing.
fn error_field_is_empty(error: Option<&Value>) -> bool {
    match error {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Object(map)) => map.is_empty() || map.values().all(|v| error_field_is_empty(Some(v))),
        Some(Value::Array(items)) => items.is_empty(),
        Some(_) => false,
    }
}

fn kind_str(kind: MachineKind) -> &'static str {
    match kind {
        MachineKind::AzureVm => "Azure VM",
        MachineKind::ArcServer => "Arc server",
    }
}

fn os_str(os: OsFamily) -> &'static str {
    match os {
        OsFamily::Windows => "Windows",
        OsFamily::Linux => "Linux",
    }
}
