pub mod merged;
pub mod settings;
pub mod targets;

use settings::Settings;
use std::path::Path;

/// ターゲットファイルのパスからsettings.yamlを自動検出して読み込む。
///
/// ターゲットファイルと同じディレクトリに `settings.yaml` が存在すれば
/// 読み込み、存在しなければデフォルト設定を返す。
pub fn load_settings_for_targets(target_file_path: &Path) -> crate::error::Result<Settings> {
    let dir = target_file_path.parent().ok_or_else(|| {
        crate::error::PatchSweepError::config("Cannot determine target file directory")
    })?;

    let settings_path = dir.join("settings.yaml");

    if settings_path.exists() {
        Settings::from_file(&settings_path)
    } else {
        Ok(Settings::default())
    }
}
