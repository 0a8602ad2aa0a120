//! Errors surfaced by portal operations.

use super::state::Role;
use crate::gateway::error::GatewayError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PortalError {
    /// The service call itself failed; see [`GatewayError::kind`]
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Generation succeeded but the new timetable could not be activated
    #[error("Timetable {timetable_id} was generated but could not be activated: {source}")]
    Activation {
        timetable_id: String,
        #[source]
        source: GatewayError,
    },

    #[error("Operation requires the {expected:?} role, portal is in {actual:?}")]
    WrongRole { expected: Role, actual: Role },

    #[error("Semester must be between 1 and 8, got {0}")]
    InvalidSemester(u8),
}

impl PortalError {
    /// The underlying service error, if any.
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            PortalError::Gateway(e) => Some(e),
            PortalError::Activation { source, .. } => Some(source),
            _ => None,
        }
    }
}
