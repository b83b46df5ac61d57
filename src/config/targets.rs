use std::path::Path;

use serde::Deserialize;

use super::settings::Settings;
use crate::config::merged::TargetSpec;
use crate::error::PatchSweepError;

/// Which phases run for a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    AssessOnly,
    InstallOnly,
    Both,
}

impl std::str::FromStr for Action {
    type Err = PatchSweepError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "assessonly" => Ok(Action::AssessOnly),
            "installonly" => Ok(Action::InstallOnly),
            "both" | "" => Ok(Action::Both),
            other => Err(PatchSweepError::load(format!(
                "Invalid action: '{other}' (expected AssessOnly, InstallOnly or Both)"
            ))),
        }
    }
}

/// Reboot behaviour handed through to the install operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
pub enum RebootSetting {
    #[default]
    IfRequired,
    Always,
    Never,
}

impl RebootSetting {
    /// Wire form expected by the remote operation.
    pub fn as_arg(self) -> &'static str {
        match self {
            RebootSetting::IfRequired => "IfRequired",
            RebootSetting::Always => "Always",
            RebootSetting::Never => "Never",
        }
    }
}

impl std::str::FromStr for RebootSetting {
    type Err = PatchSweepError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ifrequired" => Ok(RebootSetting::IfRequired),
            "always" => Ok(RebootSetting::Always),
            "never" => Ok(RebootSetting::Never),
            other => Err(PatchSweepError::load(format!(
                "Invalid rebootSetting: '{other}' (expected IfRequired, Always or Never)"
            ))),
        }
    }
}

/// One raw target row before merging with [`Settings`]. Optional cells stay
/// `None` so the merge can distinguish "absent" from an explicit value.
#[derive(Debug, Clone, Default)]
pub struct TargetRow {
    pub order: Option<i64>,
    pub name: String,
    pub resource_group: String,
    pub action: Option<Action>,
    pub maximum_duration: Option<String>,
    pub reboot_setting: Option<RebootSetting>,
    pub windows_classifications: Option<Vec<String>>,
    pub linux_classifications: Option<Vec<String>>,
}

/// A row excluded at load time. Tracked separately from execution failures.
#[derive(Debug, Clone)]
pub struct RejectedRow {
    /// 1-based line number in the source file.
    pub line: usize,
    /// Target name if the cell was readable, otherwise empty.
    pub name: String,
    pub reason: String,
}

/// Outcome of loading the target file: the resolved, ordered specs plus
/// every row that failed validation.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub targets: Vec<TargetSpec>,
    pub rejected: Vec<RejectedRow>,
}

/// ターゲットCSVを読み込み、検証・ソート済みの [`LoadReport`] を返す。
///
/// 認識するカラム（ヘッダは大文字小文字を区別しない）:
/// - `name`, `resourceGroup` — 必須
/// - `order` — 数値。カラムがあれば安定ソートに使用
/// - `action`, `maximumDuration`, `rebootSetting`,
///   `windowsClassifications`, `linuxClassifications` — 任意
///
/// ファイルが存在しない、または必須カラムがヘッダに無い場合はエラー。
/// 行単位の検証エラーは該当行のみ除外し、ロード全体は継続する。
pub fn load_targets(path: &Path, settings: &Settings) -> crate::error::Result<LoadReport> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PatchSweepError::load(format!("Cannot read target file {}: {e}", path.display()))
    })?;
    parse_targets(&content, settings)
}

pub fn parse_targets(content: &str, settings: &Settings) -> crate::error::Result<LoadReport> {
    let mut lines = content.lines().enumerate();

    let header_line = lines
        .next()
        .ok_or_else(|| PatchSweepError::load("Target file is empty"))?
        .1;
    let header: Vec<String> = split_csv_line(header_line)
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();
    let col = |name: &str| header.iter().position(|h| h == name);

    let name_idx = col("name")
        .ok_or_else(|| PatchSweepError::load("Target file header is missing 'name' column"))?;
    let rg_idx = col("resourcegroup").ok_or_else(|| {
        PatchSweepError::load("Target file header is missing 'resourceGroup' column")
    })?;
    let order_idx = col("order");
    let action_idx = col("action");
    let duration_idx = col("maximumduration");
    let reboot_idx = col("rebootsetting");
    let win_idx = col("windowsclassifications");
    let linux_idx = col("linuxclassifications");

    let mut report = LoadReport::default();
    // (input position, source line, raw row)
    let mut rows: Vec<(usize, TargetRow)> = Vec::new();

    for (line_idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let lineno = line_idx + 1;
        let fields = split_csv_line(line);
        let cell = |idx: Option<usize>| -> &str {
            idx.and_then(|i| fields.get(i))
                .map(|s| s.trim())
                .unwrap_or("")
        };

        let name = cell(Some(name_idx)).to_string();
        let resource_group = cell(Some(rg_idx)).to_string();

        let mut reject = |name: &str, reason: String| {
            report.rejected.push(RejectedRow {
                line: lineno,
                name: name.to_string(),
                reason,
            });
        };

        if name.is_empty() {
            reject("", format!("line {lineno}: missing required field 'name'"));
            continue;
        }
        if resource_group.is_empty() {
            reject(
                &name,
                format!("line {lineno}: missing required field 'resourceGroup'"),
            );
            continue;
        }

        let order = match cell(order_idx) {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(n) => Some(n),
                Err(_) => {
                    reject(&name, format!("line {lineno}: non-numeric order '{raw}'"));
                    continue;
                }
            },
        };
        let action = match cell(action_idx) {
            "" => None,
            raw => match raw.parse::<Action>() {
                Ok(a) => Some(a),
                Err(e) => {
                    reject(&name, format!("line {lineno}: {e}"));
                    continue;
                }
            },
        };
        let reboot_setting = match cell(reboot_idx) {
            "" => None,
            raw => match raw.parse::<RebootSetting>() {
                Ok(r) => Some(r),
                Err(e) => {
                    reject(&name, format!("line {lineno}: {e}"));
                    continue;
                }
            },
        };
        let maximum_duration = match cell(duration_idx) {
            "" => None,
            raw => Some(raw.to_string()),
        };
        let windows_classifications = parse_list(cell(win_idx));
        let linux_classifications = parse_list(cell(linux_idx));

        rows.push((
            rows.len(),
            TargetRow {
                order,
                name,
                resource_group,
                action,
                maximum_duration,
                reboot_setting,
                windows_classifications,
                linux_classifications,
            },
        ));
    }

    // Sort only when the source declares an order column; empty cells keep
    // the row's input position as its key. Stable, so ties stay in order.
    if order_idx.is_some() {
        rows.sort_by_key(|(pos, row)| row.order.unwrap_or(*pos as i64));
    }

    report.targets = rows
        .iter()
        .map(|(pos, row)| TargetSpec::new(settings, row, *pos))
        .collect();
    Ok(report)
}

/// CSV行を個々のフィールドに分割する。
///
/// - フィールド区切りはカンマ
/// - ダブルクォートで囲まれたフィールド内のカンマは区切りとして扱わない
/// - クォート内の `""` はエスケープされたダブルクォート
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Comma-delimited list cell. Empty cell means "no override", not an
/// empty list.
fn parse_list(cell: &str) -> Option<Vec<String>> {
    if cell.trim().is_empty() {
        return None;
    }
    Some(
        cell.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
    )
}
