// src/recipe/kitchen/state.rs

//! Lifecycle states and the stages that move a cook between them

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Where a cook is in the lifecycle
///
/// `DECLARED → LAID_OUT → CONFIGURED → BUILT → PACKAGED → PUBLISHED`,
/// with `FAILED` reachable from every non-terminal state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    Declared,
    LaidOut,
    Configured,
    Built,
    Packaged,
    Published,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Published | Self::Failed)
    }
}

/// A lifecycle stage, named after the hook it runs
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Layout,
    Configure,
    Build,
    Package,
    PackageInfo,
    Publish,
}

impl Stage {
    /// All stages in execution order
    pub const ORDER: [Stage; 6] = [
        Stage::Layout,
        Stage::Configure,
        Stage::Build,
        Stage::Package,
        Stage::PackageInfo,
        Stage::Publish,
    ];

    /// State reached when this stage succeeds
    ///
    /// `package_info` has no state of its own; the cook stays `PACKAGED`.
    pub fn completes(self) -> Option<LifecycleState> {
        match self {
            Stage::Layout => Some(LifecycleState::LaidOut),
            Stage::Configure => Some(LifecycleState::Configured),
            Stage::Build => Some(LifecycleState::Built),
            Stage::Package => Some(LifecycleState::Packaged),
            Stage::PackageInfo => None,
            Stage::Publish => Some(LifecycleState::Published),
        }
    }
}
