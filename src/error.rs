use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TimetableError>;

/// Every way a timetabling run can abort. No variant carries a partial timetable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TimetableError {
    /// An input record references something that does not resolve.
    #[error("data integrity error in {record}: {reason}")]
    DataIntegrity { record: String, reason: String },

    /// The placement rule set contradicts itself.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The oracle proved the model infeasible even though the frozen subset was feasible.
    #[error("model infeasible under placement rules [{}]", .rules.join("; "))]
    ModelInfeasible { rules: Vec<String> },

    /// The oracle itself failed.
    #[error("oracle error: {0}")]
    Oracle(String),
}

impl TimetableError {
    pub fn data_integrity(record: impl Into<String>, reason: impl Into<String>) -> Self {
        TimetableError::DataIntegrity {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            TimetableError::DataIntegrity { .. } => ErrorKind::DataIntegrity,
            TimetableError::Configuration(_) => ErrorKind::Configuration,
            TimetableError::ModelInfeasible { .. } => ErrorKind::ModelInfeasible,
            TimetableError::Oracle(_) => ErrorKind::Oracle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    DataIntegrity,
    Configuration,
    ModelInfeasible,
    Oracle,
}
