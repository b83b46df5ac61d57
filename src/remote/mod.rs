// 外部コラボレータとの境界: インベントリ参照とリモートパッチ操作。

pub mod azcli;

use serde_json::Value;

use crate::config::merged::TargetSpec;

/// OS family reported by the inventory. Anything the inventory cannot map
/// to one of these surfaces as `None` in [`HostInfo::os`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Windows,
    Linux,
}

/// How the host is managed. The two categories are mutually exclusive and
/// determine which remote surface the patch operations go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineKind {
    /// Natively-managed compute VM.
    AzureVm,
    /// Arc-enabled server connected from outside the platform.
    ArcServer,
}

#[derive(Debug, Clone, Copy)]
pub struct HostInfo {
    pub kind: MachineKind,
    pub os: Option<OsFamily>,
}

/// A failed remote call: one short line for routine triage plus the full
/// diagnostic text for deep debugging.
#[derive(Debug, Clone)]
pub struct Fault {
    pub message: String,
    pub detail: String,
}

impl Fault {
    pub fn new(message: impl Into<String>, detail: impl Into<String>) -> Self {
        Fault {
            message: message.into(),
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Looks a target up in the fleet inventory. A miss means the name does
/// not resolve to either machine category in that resource group.
pub trait Inventory {
    fn lookup(&self, name: &str, resource_group: &str) -> Option<HostInfo>;
}

/// Performs the actual remote patch operations. Result Objects are opaque
/// provider JSON; the core only applies the generic flattening rules and
/// the status/error classification to them.
pub trait PatchClient {
    fn assess(&self, target: &TargetSpec, host: &HostInfo) -> Result<Value, Fault>;

    fn install(
        &self,
        target: &TargetSpec,
        host: &HostInfo,
        classifications: &[String],
    ) -> Result<Value, Fault>;
}
