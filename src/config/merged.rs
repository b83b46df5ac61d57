use super::settings::Settings;
use super::targets::{Action, RebootSetting, TargetRow};

/// One fully-resolved unit of work. Built once by the loader, immutable
/// afterwards, consumed by exactly one executor invocation.
///
/// Both classification lists are carried because the OS family is not
/// known until the inventory lookup at execution time; the executor picks
/// the matching one then.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    pub order: i64,
    pub name: String,
    pub resource_group: String,
    pub action: Action,
    pub maximum_duration: String,
    pub reboot_setting: RebootSetting,
    pub windows_classifications: Vec<String>,
    pub linux_classifications: Vec<String>,
}

impl TargetSpec {
    /// 行のOption値がSomeなら行の値を、NoneならSettingsの値を使用する。
    /// `order` が無い行は入力順の位置をそのまま使う。
    pub fn new(settings: &Settings, row: &TargetRow, position: usize) -> Self {
        TargetSpec {
            order: row.order.unwrap_or(position as i64),
            name: row.name.clone(),
            resource_group: row.resource_group.clone(),
            action: row.action.unwrap_or(Action::Both),
            maximum_duration: row
                .maximum_duration
                .clone()
                .unwrap_or_else(|| settings.maximum_duration.clone()),
            reboot_setting: row.reboot_setting.unwrap_or(settings.reboot_setting),
            windows_classifications: row
                .windows_classifications
                .clone()
                .unwrap_or_else(|| settings.windows_classifications.clone()),
            linux_classifications: row
                .linux_classifications
                .clone()
                .unwrap_or_else(|| settings.linux_classifications.clone()),
        }
    }
}
