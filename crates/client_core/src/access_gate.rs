use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};

use shared::domain::{AccessGrant, Role, RoomId, SessionPhase, UserId};
use shared::protocol::{AccessResult, ClientRequest};

use crate::TokenStore;

/// Outcome of applying a `chat_access_result` to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateVerdict {
    Granted,
    Refused,
}

/// State machine deciding whether the local user may observe or participate
/// in the room. Owns the cached access token; the token is read once at
/// startup and only ever mutated here.
pub struct AccessGate {
    room: RoomId,
    user: UserId,
    phase: SessionPhase,
    tokens: Arc<dyn TokenStore>,
}

impl AccessGate {
    pub fn new(room: RoomId, user: UserId, tokens: Arc<dyn TokenStore>) -> Self {
        Self {
            room,
            user,
            phase: SessionPhase::Unauthenticated,
            tokens,
        }
    }

    /// Startup transition. A stored token moves the gate to `AwaitingGrant`
    /// and produces the authorization check to emit; with no token the gate
    /// stays `Unauthenticated` until the user explicitly requests access.
    pub async fn start(&mut self) -> Result<Option<ClientRequest>> {
        match self.tokens.load().await? {
            Some(token) => {
                info!(room = %self.room, "found stored access token, checking access");
                self.phase = SessionPhase::AwaitingGrant;
                Ok(Some(ClientRequest::CheckChatAccess {
                    room_id: self.room.clone(),
                    user_id: self.user.clone(),
                    access_token: Some(token),
                }))
            }
            None => Ok(None),
        }
    }

    /// Explicit access request from the user.
    pub fn request_access(&mut self) -> ClientRequest {
        self.phase = SessionPhase::AwaitingGrant;
        ClientRequest::RequestRoomAccess {
            room_id: self.room.clone(),
            user_id: self.user.clone(),
        }
    }

    /// Applies the server's verdict. A denial always wins over any cached
    /// role or token: the stored token is purged and the gate lands in
    /// `Denied` no matter what phase it was in.
    pub async fn apply_result(&mut self, result: AccessResult) -> Result<GateVerdict> {
        if !result.allowed {
            self.tokens.clear().await?;
            self.phase = SessionPhase::Denied;
            return Ok(GateVerdict::Refused);
        }

        let role = result.role.unwrap_or(Role::Guest);
        let grant = match result.chat_access {
            Some(grant) => grant,
            None => {
                warn!(
                    room = %self.room,
                    "access result carried no grant, treating local user as sole participant"
                );
                match role {
                    Role::Owner => AccessGrant::new(self.user.clone(), []),
                    Role::Guest => {
                        AccessGrant::new(self.user.clone(), [self.user.clone()])
                    }
                }
            }
        };

        if let Some(token) = &result.access_token {
            self.tokens.store(token).await?;
        }

        self.phase = SessionPhase::Authorized {
            role,
            grant,
            token: result.access_token,
        };
        Ok(GateVerdict::Granted)
    }

    /// Pure predicate run before every send or typing emission: the owner
    /// role, or membership in the grant's allowed users.
    pub fn authorize(&self, user: &UserId) -> bool {
        match &self.phase {
            SessionPhase::Authorized { role, grant, .. } => {
                *role == Role::Owner || grant.allowed_users.contains(user)
            }
            _ => false,
        }
    }

    /// Whether inbound message/typing events may be observed at all.
    pub fn can_observe(&self) -> bool {
        self.phase.is_authorized()
    }

    pub fn grant(&self) -> Option<&AccessGrant> {
        match &self.phase {
            SessionPhase::Authorized { grant, .. } => Some(grant),
            _ => None,
        }
    }

    pub fn role(&self) -> Option<Role> {
        match &self.phase {
            SessionPhase::Authorized { role, .. } => Some(*role),
            _ => None,
        }
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }
}

#[cfg(test)]
#[path = "tests/access_gate_tests.rs"]
mod tests;
