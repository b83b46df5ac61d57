// 実行ログ: `<timestamp> <ident> <level> <message>` 形式の行を書き出す。
//
// One aggregate sink per run (echoed to stderr) plus, in parallel mode,
// one exclusively-owned sink per task.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::error::PatchSweepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Info => "Info",
            LogLevel::Warn => "Warn",
            LogLevel::Error => "Error",
        }
    }
}

/// A timestamped, leveled log sink. `ident` names the writer — the run
/// itself for the aggregate log, the target for a per-task log.
pub struct RunLog {
    file: Mutex<File>,
    ident: String,
    echo: bool,
}

impl RunLog {
    /// Open (append) the sink at `path`, creating parent directories.
    pub fn create(path: &Path, ident: &str, echo: bool) -> crate::error::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| PatchSweepError::log(format!("{}: {e}", parent.display())))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| PatchSweepError::log(format!("{}: {e}", path.display())))?;
        Ok(RunLog {
            file: Mutex::new(file),
            ident: ident.to_string(),
            echo,
        })
    }

    pub fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    pub fn error(&self, message: &str) {
        self.write(LogLevel::Error, message);
    }

    /// Short message at Error level, full diagnostic text on its own
    /// following line so triage can stop at the first.
    pub fn error_with_detail(&self, message: &str, detail: &str) {
        self.write(LogLevel::Error, message);
        if !detail.trim().is_empty() {
            self.write(LogLevel::Error, detail);
        }
    }

    fn write(&self, level: LogLevel, message: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let line = format!("{timestamp} {} {} {message}", self.ident, level.as_str());
        if self.echo {
            eprintln!("{line}");
        }
        let mut file = match self.file.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        // A sink that stops accepting writes must not take the run down.
        let _ = writeln!(file, "{line}");
    }
}
