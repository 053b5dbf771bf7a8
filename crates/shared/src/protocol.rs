use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{AccessGrant, AccessToken, Role, RoomId, UserId};

/// One chat message as carried on the wire. Immutable once constructed;
/// ordering is whatever order messages arrive in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub room: RoomId,
    pub sender: UserId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Transient presence flag; never stored, only rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingSignal {
    pub room: RoomId,
    pub user: UserId,
    pub typing: bool,
}

/// Server verdict for a `check_chat_access` or `request_room_access` round
/// trip. `grant` and `token` are only meaningful when `allowed` is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResult {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_access: Option<AccessGrant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<AccessToken>,
}

/// Events the client emits on the channel. Variant tags are the channel
/// event names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientRequest {
    Join {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    Message(Message),
    Typing(TypingSignal),
    ClearHistory {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
    CheckChatAccess {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "userId")]
        user_id: UserId,
        #[serde(
            rename = "accessToken",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        access_token: Option<AccessToken>,
    },
    RequestRoomAccess {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "userId")]
        user_id: UserId,
    },
}

/// Events the channel delivers to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    Message(Message),
    Typing(TypingSignal),
    ChatAccessResult(AccessResult),
    ClearHistory {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
}
