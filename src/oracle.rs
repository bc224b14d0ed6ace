use crate::model::Model;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum OracleStatus {
    Optimal,
    /// A valid incumbent, not proven optimal (for example the budget ran out).
    Feasible,
    Infeasible,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OracleResult {
    pub status: OracleStatus,
    pub objective: f64,
    /// One value per model variable, empty unless the status is optimal or feasible.
    pub values: Vec<bool>,
}

impl OracleResult {
    pub fn infeasible() -> Self {
        OracleResult {
            status: OracleStatus::Infeasible,
            objective: 0.0,
            values: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        OracleResult {
            status: OracleStatus::Error(message.into()),
            objective: 0.0,
            values: Vec::new(),
        }
    }
}

/// Caller-supplied limits on one solve.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolveBudget {
    pub time_limit: Option<Duration>,
}

/// Solves a compiled model. Implementations must be deterministic for a given model.
pub trait Oracle {
    fn solve(&self, model: &Model) -> OracleResult;
}
