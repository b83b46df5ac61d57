use crate::pipeline::executor::{OutcomeRecord, PhaseStatus};

/// Accumulates run-wide counters at the single aggregation point after the
/// dispatcher joins. No I/O; rendering happens once via [`RunSummary`].
#[derive(Debug, Default)]
pub struct SummaryAggregator {
    total: usize,
    assessments_attempted: usize,
    installs_attempted: usize,
    failed_assessment: Vec<String>,
    failed_install: Vec<String>,
    not_found: Vec<String>,
    rejected_rows: usize,
}

impl SummaryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load-time validation skips, tracked separately from execution
    /// failures.
    pub fn note_rejected(&mut self, count: usize) {
        self.rejected_rows += count;
    }

    pub fn record(&mut self, outcome: &OutcomeRecord) {
        self.total += 1;

        if outcome.skip_reason.is_some() {
            push_distinct(&mut self.not_found, &outcome.target);
            return;
        }

        if outcome.assessment.status != PhaseStatus::Skipped {
            self.assessments_attempted += 1;
            if outcome.assessment.status == PhaseStatus::Failed {
                push_distinct(&mut self.failed_assessment, &outcome.target);
            }
        }
        if outcome.install.status != PhaseStatus::Skipped {
            self.installs_attempted += 1;
            if outcome.install.status == PhaseStatus::Failed {
                push_distinct(&mut self.failed_install, &outcome.target);
            }
        }
    }

    pub fn finalize(self) -> RunSummary {
        RunSummary {
            total: self.total,
            assessments_attempted: self.assessments_attempted,
            installs_attempted: self.installs_attempted,
            failed_assessment: self.failed_assessment,
            failed_install: self.failed_install,
            not_found: self.not_found,
            rejected_rows: self.rejected_rows,
        }
    }
}

fn push_distinct(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// Final counts for the run, read once at the end.
#[derive(Debug)]
pub struct RunSummary {
    pub total: usize,
    pub assessments_attempted: usize,
    pub installs_attempted: usize,
    pub failed_assessment: Vec<String>,
    pub failed_install: Vec<String>,
    pub not_found: Vec<String>,
    pub rejected_rows: usize,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Run summary:")?;
        writeln!(f, "  targets processed:     {}", self.total)?;
        writeln!(f, "  rows rejected at load: {}", self.rejected_rows)?;
        writeln!(f, "  assessments attempted: {}", self.assessments_attempted)?;
        writeln!(f, "  installs attempted:    {}", self.installs_attempted)?;
        writeln!(
            f,
            "  failed assessment:     {}",
            render_names(&self.failed_assessment)
        )?;
        writeln!(
            f,
            "  failed install:        {}",
            render_names(&self.failed_install)
        )?;
        write!(f, "  not found:             {}", render_names(&self.not_found))
    }
}

fn render_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        format!("{} ({})", names.len(), names.join(", "))
    }
}
