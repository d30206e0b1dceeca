use crate::id::UnitId;
use crate::time::Ticks;

/// Misuse of the simulation control API.
///
/// Blocked transfers and the micro-step bound are ordinary outcomes and are
/// never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("target step {target} is not ahead of the current step count {current}")]
    TargetNotAhead { target: u64, current: u64 },
    #[error("target time {target} is not ahead of the current time {current}")]
    TimeNotAhead { target: Ticks, current: Ticks },
    #[error("unknown unit {0}")]
    UnknownUnit(UnitId),
}
