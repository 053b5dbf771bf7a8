use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(RoomId);
id_newtype!(UserId);
id_newtype!(AccessToken);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Owner,
    Guest,
}

/// Who may participate in a room once access has been authorized.
///
/// `allowed_users` never implicitly contains the owner; ownership is always
/// checked separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrant {
    pub owner: UserId,
    pub allowed_users: HashSet<UserId>,
}

impl AccessGrant {
    pub fn new(owner: UserId, allowed_users: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            owner,
            allowed_users: allowed_users.into_iter().collect(),
        }
    }

    /// True iff `user` may author messages under this grant: the owner, or a
    /// listed guest.
    pub fn permits_sender(&self, user: &UserId) -> bool {
        *user == self.owner || self.allowed_users.contains(user)
    }
}

/// Authorization state of the local client with respect to one room.
///
/// Exactly one variant is ever active; a role can only exist inside
/// `Authorized`, so combinations like "role set while denied" cannot be
/// represented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Unauthenticated,
    AwaitingGrant,
    Authorized {
        role: Role,
        grant: AccessGrant,
        token: Option<AccessToken>,
    },
    Denied,
}

impl SessionPhase {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized { .. })
    }
}
