use crate::id::ProductId;
use crate::time::Ticks;

/// A product flowing down the line. Created by an Input unit, moved by the
/// transfer protocol, destroyed on discharge by an Output unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// Simulation time at which the Input unit created it.
    pub creation_time: Ticks,
}

impl Product {
    pub fn new(id: ProductId, creation_time: Ticks) -> Self {
        Self { id, creation_time }
    }
}
