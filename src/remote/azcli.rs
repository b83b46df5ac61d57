// Azure CLI バックエンド: `az` を起動してJSON出力をパースする。

use std::process::Command;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::merged::TargetSpec;
use crate::remote::{Fault, HostInfo, Inventory, MachineKind, OsFamily, PatchClient};

/// Inventory and patch operations backed by the `az` command-line tool.
/// Authentication is whatever `az login` established; this type never
/// handles credentials itself.
pub struct AzCli {
    program: String,
}

impl AzCli {
    pub fn new() -> Self {
        AzCli {
            program: "az".to_string(),
        }
    }

    /// Run `az` with the given arguments and parse stdout as JSON.
    fn run_json(&self, args: &[&str]) -> Result<Value, Fault> {
        debug!(args = ?args, "invoking az");
        let output = Command::new(&self.program).args(args).output().map_err(|e| {
            Fault::new(
                format!("failed to launch '{}': {e}", self.program),
                e.to_string(),
            )
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            let message = stderr
                .lines()
                .find(|l| !l.trim().is_empty())
                .unwrap_or("az exited with a failure status")
                .to_string();
            return Err(Fault::new(message, stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        serde_json::from_str(stdout.trim()).map_err(|e| {
            Fault::new(
                format!("unparsable az output: {e}"),
                format!("stdout:\n{stdout}\nstderr:\n{stderr}"),
            )
        })
    }

    /// Try `az vm show`, fall back to `az connectedmachine show`. Returns
    /// the machine kind plus its OS type string, if either resolves.
    fn show_machine(&self, name: &str, resource_group: &str) -> Option<(MachineKind, Value)> {
        let vm = self.run_json(&[
            "vm",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--output",
            "json",
        ]);
        if let Ok(v) = vm {
            return Some((MachineKind::AzureVm, v));
        }

        let arc = self.run_json(&[
            "connectedmachine",
            "show",
            "--resource-group",
            resource_group,
            "--name",
            name,
            "--output",
            "json",
        ]);
        match arc {
            Ok(v) => Some((MachineKind::ArcServer, v)),
            Err(fault) => {
                debug!(target_name = name, %fault, "inventory miss");
                None
            }
        }
    }
}

impl Default for AzCli {
    fn default() -> Self {
        Self::new()
    }
}

fn os_family_of(kind: MachineKind, body: &Value) -> Option<OsFamily> {
    let raw = match kind {
        MachineKind::AzureVm => body
            .pointer("/storageProfile/osDisk/osType")
            .and_then(Value::as_str),
        MachineKind::ArcServer => body.get("osType").and_then(Value::as_str),
    }?;
    match raw.to_ascii_lowercase().as_str() {
        "windows" => Some(OsFamily::Windows),
        "linux" => Some(OsFamily::Linux),
        other => {
            warn!(os_type = other, "unrecognized OS type from inventory");
            None
        }
    }
}

impl Inventory for AzCli {
    fn lookup(&self, name: &str, resource_group: &str) -> Option<HostInfo> {
        let (kind, body) = self.show_machine(name, resource_group)?;
        Some(HostInfo {
            kind,
            os: os_family_of(kind, &body),
        })
    }
}

impl PatchClient for AzCli {
    fn assess(&self, target: &TargetSpec, host: &HostInfo) -> Result<Value, Fault> {
        let group = match host.kind {
            MachineKind::AzureVm => "vm",
            MachineKind::ArcServer => "connectedmachine",
        };
        self.run_json(&[
            group,
            "assess-patches",
            "--resource-group",
            target.resource_group.as_str(),
            "--name",
            target.name.as_str(),
            "--output",
            "json",
        ])
    }

    fn install(
        &self,
        target: &TargetSpec,
        host: &HostInfo,
        classifications: &[String],
    ) -> Result<Value, Fault> {
        let group = match host.kind {
            MachineKind::AzureVm => "vm",
            MachineKind::ArcServer => "connectedmachine",
        };
        let classification_flag = match host.os {
            Some(OsFamily::Windows) => "--classifications-to-include-win",
            Some(OsFamily::Linux) => "--classifications-to-include-linux",
            // Without an OS family there is no classification flag to use.
            None => {
                return Err(Fault::new(
                    format!("cannot install patches on '{}': unknown OS family", target.name),
                    "inventory returned no usable osType for this machine".to_string(),
                ));
            }
        };

        let mut args: Vec<&str> = vec![
            group,
            "install-patches",
            "--resource-group",
            target.resource_group.as_str(),
            "--name",
            target.name.as_str(),
            "--maximum-duration",
            target.maximum_duration.as_str(),
            "--reboot-setting",
            target.reboot_setting.as_arg(),
            classification_flag,
        ];
        args.extend(classifications.iter().map(String::as_str));
        args.extend(["--output", "json"]);
        self.run_json(&args)
    }
}
