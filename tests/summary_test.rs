// 実行サマリ集計のテスト

use serde_json::json;

use patch_sweep::pipeline::executor::{FailureDetail, OutcomeRecord, PhaseOutcome, PhaseStatus};
use patch_sweep::summary::SummaryAggregator;

fn phase(status: PhaseStatus) -> PhaseOutcome {
    let failure = match status {
        PhaseStatus::Failed => Some(FailureDetail {
            message: "failed".to_string(),
            detail: "detail".to_string(),
        }),
        _ => None,
    };
    let result = match status {
        PhaseStatus::Skipped => None,
        _ => Some(json!({"status": "Succeeded"})),
    };
    PhaseOutcome {
        status,
        result,
        failure,
    }
}

fn outcome(target: &str, assessment: PhaseStatus, install: PhaseStatus) -> OutcomeRecord {
    OutcomeRecord {
        target: target.to_string(),
        assessment: phase(assessment),
        install: phase(install),
        skip_reason: None,
    }
}

fn not_found(target: &str) -> OutcomeRecord {
    OutcomeRecord {
        target: target.to_string(),
        assessment: phase(PhaseStatus::Skipped),
        install: phase(PhaseStatus::Skipped),
        skip_reason: Some(format!("'{target}' not found")),
    }
}

#[test]
fn test_counts_attempted_phases() {
    let mut aggregator = SummaryAggregator::new();
    aggregator.record(&outcome("a", PhaseStatus::Succeeded, PhaseStatus::Succeeded));
    aggregator.record(&outcome("b", PhaseStatus::Succeeded, PhaseStatus::Skipped));
    aggregator.record(&outcome("c", PhaseStatus::Skipped, PhaseStatus::Succeeded));

    let summary = aggregator.finalize();
    assert_eq!(summary.total, 3);
    assert_eq!(summary.assessments_attempted, 2);
    assert_eq!(summary.installs_attempted, 2);
    assert!(summary.failed_assessment.is_empty());
    assert!(summary.failed_install.is_empty());
}

#[test]
fn test_failed_assessment_and_successful_install_counted_independently() {
    // 評価が失敗してもインストール成功は成功として数える
    let mut aggregator = SummaryAggregator::new();
    aggregator.record(&outcome("web01", PhaseStatus::Failed, PhaseStatus::Succeeded));

    let summary = aggregator.finalize();
    assert_eq!(summary.assessments_attempted, 1);
    assert_eq!(summary.installs_attempted, 1);
    assert_eq!(summary.failed_assessment, vec!["web01"]);
    assert!(summary.failed_install.is_empty());
}

#[test]
fn test_warning_counts_as_success() {
    let mut aggregator = SummaryAggregator::new();
    aggregator.record(&outcome(
        "web01",
        PhaseStatus::SucceededWithWarning,
        PhaseStatus::SucceededWithWarning,
    ));

    let summary = aggregator.finalize();
    assert_eq!(summary.assessments_attempted, 1);
    assert_eq!(summary.installs_attempted, 1);
    assert!(summary.failed_assessment.is_empty());
    assert!(summary.failed_install.is_empty());
}

#[test]
fn test_not_found_targets_tracked_separately() {
    let mut aggregator = SummaryAggregator::new();
    aggregator.record(&not_found("ghost01"));
    aggregator.record(&outcome("web01", PhaseStatus::Succeeded, PhaseStatus::Succeeded));

    let summary = aggregator.finalize();
    assert_eq!(summary.total, 2);
    assert_eq!(summary.not_found, vec!["ghost01"]);
    assert_eq!(summary.assessments_attempted, 1, "skipped target attempts nothing");
}

#[test]
fn test_failed_names_are_distinct() {
    let mut aggregator = SummaryAggregator::new();
    aggregator.record(&outcome("web01", PhaseStatus::Failed, PhaseStatus::Failed));
    aggregator.record(&outcome("web01", PhaseStatus::Failed, PhaseStatus::Succeeded));

    let summary = aggregator.finalize();
    assert_eq!(summary.failed_assessment, vec!["web01"]);
    assert_eq!(summary.failed_install, vec!["web01"]);
}

#[test]
fn test_rejected_rows_tracked_separately_from_totals() {
    let mut aggregator = SummaryAggregator::new();
    aggregator.note_rejected(2);
    aggregator.record(&outcome("web01", PhaseStatus::Succeeded, PhaseStatus::Succeeded));

    let summary = aggregator.finalize();
    assert_eq!(summary.total, 1);
    assert_eq!(summary.rejected_rows, 2);
}

#[test]
fn test_display_renders_counts_and_names() {
    let mut aggregator = SummaryAggregator::new();
    aggregator.note_rejected(1);
    aggregator.record(&outcome("web01", PhaseStatus::Failed, PhaseStatus::Succeeded));
    aggregator.record(&outcome("web02", PhaseStatus::Succeeded, PhaseStatus::Failed));
    aggregator.record(&not_found("ghost01"));

    let rendered = aggregator.finalize().to_string();
    assert!(rendered.contains("targets processed:     3"));
    assert!(rendered.contains("rows rejected at load: 1"));
    assert!(rendered.contains("failed assessment:     1 (web01)"));
    assert!(rendered.contains("failed install:        1 (web02)"));
    assert!(rendered.contains("not found:             1 (ghost01)"));
}

#[test]
fn test_display_renders_none_for_empty_lists() {
    let mut aggregator = SummaryAggregator::new();
    aggregator.record(&outcome("web01", PhaseStatus::Succeeded, PhaseStatus::Succeeded));

    let rendered = aggregator.finalize().to_string();
    assert!(rendered.contains("failed assessment:     none"));
    assert!(rendered.contains("failed install:        none"));
}
