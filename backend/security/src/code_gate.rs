/// Code execution gate: decides whether rendered code blocks may offer a
/// "run" affordance.
///
/// The decision is taken once per render pass and shared by every block in it.
use std::collections::HashSet;

use chatmark_core::{Permission, PermissionService, PermissionType};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The capability a user needs before code blocks become executable.
pub const RUN_CODE_REQUIREMENT: (PermissionType, Permission) =
    (PermissionType::RunCode, Permission::Use);

/// How a render surface treats code execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPolicy {
    /// Defer to the permission service on every render pass.
    #[default]
    Permitted,
    /// Read-only surface: never offer execution and never assign block indices.
    Never,
}

/// Outcome of the gate for one render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionDecision {
    pub allow_execution: bool,
    /// Whether multi-line blocks draw an index from the per-pass counter.
    pub assign_indices: bool,
}

impl ExecutionDecision {
    pub fn read_only() -> Self {
        Self {
            allow_execution: false,
            assign_indices: false,
        }
    }
}

pub struct CodeExecutionGate;

impl CodeExecutionGate {
    /// Returns `true` if the current user holds `RUN_CODE` / `USE`.
    pub fn can_execute(permissions: &dyn PermissionService) -> bool {
        let (permission_type, permission) = RUN_CODE_REQUIREMENT;
        let allowed = permissions.has_access(permission_type, permission);
        if !allowed {
            debug!("[CodeGate] Run-code permission not granted; execution hidden");
        }
        allowed
    }

    /// Evaluate the gate for a render pass under the given policy.
    pub fn decide(policy: ExecutionPolicy, permissions: &dyn PermissionService) -> ExecutionDecision {
        match policy {
            ExecutionPolicy::Never => ExecutionDecision::read_only(),
            ExecutionPolicy::Permitted => ExecutionDecision {
                allow_execution: Self::can_execute(permissions),
                assign_indices: true,
            },
        }
    }
}

/// A fixed set of granted capabilities.
#[derive(Debug, Clone, Default)]
pub struct GrantedPermissions {
    granted: HashSet<(PermissionType, Permission)>,
}

impl GrantedPermissions {
    pub fn deny_all() -> Self {
        Self::default()
    }

    pub fn grant(mut self, permission_type: PermissionType, permission: Permission) -> Self {
        self.granted.insert((permission_type, permission));
        self
    }

    pub fn revoke(&mut self, permission_type: PermissionType, permission: Permission) {
        self.granted.remove(&(permission_type, permission));
    }

    /// Convenience for hosts that only care about code execution.
    pub fn run_code(allowed: bool) -> Self {
        let perms = Self::deny_all();
        if allowed {
            let (permission_type, permission) = RUN_CODE_REQUIREMENT;
            perms.grant(permission_type, permission)
        } else {
            perms
        }
    }
}

impl PermissionService for GrantedPermissions {
    fn has_access(&self, permission_type: PermissionType, permission: Permission) -> bool {
        self.granted.contains(&(permission_type, permission))
    }
}
