use thiserror::Error;

use super::state::OperationKind;

/// Why the engine refused a user event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Error: Query is empty.")]
    EmptyQuery,
    #[error("Error: No valid command to {0}.")]
    InvalidCommand(&'static str),
    #[error("Error: Another operation is still running ({}).", .0.label())]
    Busy(OperationKind),
}
