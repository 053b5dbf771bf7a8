use thiserror::Error;

use shared::domain::{RoomId, UserId};

use crate::attachment::AttachmentError;

/// Failure taxonomy for client-side room operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server explicitly rejected access. Not retriable without a fresh
    /// explicit request.
    #[error("access to room {room} was denied")]
    AuthorizationDenied { room: RoomId },

    /// The local user attempted an action the current grant does not permit.
    /// Rejected before any channel emission.
    #[error("user {user} is not permitted to {action} in room {room}")]
    UnauthorizedAction {
        user: UserId,
        room: RoomId,
        action: &'static str,
    },

    /// The channel could not carry the emission. Nothing is buffered or
    /// retried; the emission is lost.
    #[error("channel unavailable: {0}")]
    TransportUnavailable(String),

    #[error("attachment encoding failed: {0}")]
    Encoding(#[from] AttachmentError),

    #[error("token storage failed: {0}")]
    TokenStore(anyhow::Error),
}
