// 成長スキーマCSV: 既知カラムの和集合をヘッダに保ち、行を追記する。
//
// New columns rewrite the header line in place; existing data rows are
// left untouched and read as blank under the widened header. Appends are
// serialized behind a mutex because header reconciliation plus append is
// not atomic against concurrent writers.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::PatchSweepError;

const DELIMITER: char = ',';

/// Columns present in every report row, ahead of the flattened keys.
const STATIC_COLUMNS: &[&str] = &["timestamp", "target"];

/// One growing-schema tabular output file (one instance per report kind).
pub struct ReportWriter {
    path: PathBuf,
    state: Mutex<WriterState>,
}

struct WriterState {
    /// Union of all columns ever seen, first-seen order. Empty until the
    /// first append touches the file.
    columns: Vec<String>,
    initialized: bool,
}

impl ReportWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ReportWriter {
            path: path.into(),
            state: Mutex::new(WriterState {
                columns: Vec::new(),
                initialized: false,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one row for `target`. Unknown keys in `fields` grow the
    /// header; the `timestamp` column is filled here.
    pub fn append(&self, target: &str, fields: &[(String, String)]) -> crate::error::Result<()> {
        let mut state = match self.state.lock() {
            Ok(s) => s,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !state.initialized {
            self.initialize(&mut state)?;
        }

        let new_keys: Vec<&String> = fields
            .iter()
            .map(|(key, _)| key)
            .filter(|key| !state.columns.iter().any(|c| c == *key))
            .collect();
        if !new_keys.is_empty() {
            for key in new_keys {
                state.columns.push(key.clone());
            }
            self.rewrite_header(&state.columns)?;
        }

        let timestamp = chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let line = state
            .columns
            .iter()
            .map(|column| match column.as_str() {
                "timestamp" => sanitize(&timestamp),
                "target" => sanitize(target),
                key => fields
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| sanitize(v))
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>()
            .join(&DELIMITER.to_string());

        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| PatchSweepError::report(format!("{}: {e}", self.path.display())))?;
        writeln!(file, "{line}")
            .map_err(|e| PatchSweepError::report(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }

    /// First touch: seed columns from an existing file's header, or create
    /// the file (and parent directories) with the static header.
    fn initialize(&self, state: &mut WriterState) -> crate::error::Result<()> {
        if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)
                .map_err(|e| PatchSweepError::report(format!("{}: {e}", self.path.display())))?;
            match content.lines().next() {
                Some(header) if !header.trim().is_empty() => {
                    state.columns = header
                        .split(DELIMITER)
                        .map(|c| c.trim().to_string())
                        .collect();
                }
                // Present but empty file: start it like a fresh one.
                _ => {
                    state.columns = STATIC_COLUMNS.iter().map(|c| c.to_string()).collect();
                    std::fs::write(&self.path, format!("{}\n", state.columns.join(",")))
                        .map_err(|e| {
                            PatchSweepError::report(format!("{}: {e}", self.path.display()))
                        })?;
                }
            }
        } else {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PatchSweepError::report(format!("{}: {e}", parent.display())))?;
            }
            state.columns = STATIC_COLUMNS.iter().map(|c| c.to_string()).collect();
            std::fs::write(&self.path, format!("{}\n", state.columns.join(",")))
                .map_err(|e| PatchSweepError::report(format!("{}: {e}", self.path.display())))?;
        }
        state.initialized = true;
        Ok(())
    }

    /// Replace the first line of the file with the widened header. Data
    /// rows keep their existing cells.
    fn rewrite_header(&self, columns: &[String]) -> crate::error::Result<()> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| PatchSweepError::report(format!("{}: {e}", self.path.display())))?;
        let mut lines: Vec<&str> = content.lines().collect();
        let header = columns.join(",");
        if lines.is_empty() {
            lines.push(&header);
        } else {
            lines[0] = &header;
        }
        let mut rewritten = lines.join("\n");
        rewritten.push('\n');
        std::fs::write(&self.path, rewritten)
            .map_err(|e| PatchSweepError::report(format!("{}: {e}", self.path.display())))?;
        Ok(())
    }
}

/// Delimiter-breaking characters inside a value become a single space.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '\n' | '\r' | DELIMITER => ' ',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_delimiter_and_newlines() {
        assert_eq!(sanitize("a,b\nc\rd"), "a b c d");
    }

    #[test]
    fn test_sanitize_leaves_clean_values_alone() {
        assert_eq!(sanitize("KB5005565; KB5006670"), "KB5005565; KB5006670");
    }
}
