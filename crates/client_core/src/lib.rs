use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

use shared::domain::{AccessToken, Role, RoomId, SessionPhase, UserId};
use shared::protocol::{AccessResult, ClientRequest, Message, ServerEvent, TypingSignal};

pub mod access_gate;
pub mod attachment;
pub mod error;
pub mod message_store;
pub mod transport;
pub mod typing;

pub use access_gate::{AccessGate, GateVerdict};
pub use error::ClientError;
pub use message_store::{ClearPolicy, MessageStore};
pub use typing::{TypingIndicator, TYPING_EMIT_INTERVAL, TYPING_EXPIRY};

/// Reliable bidirectional event channel the session runs over. Connection
/// establishment and wire framing are the transport's concern; the client
/// only emits and subscribes.
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Fire-and-forget emission. No local buffering: if the channel is down,
    /// the emission is lost and an error reported.
    async fn emit(&self, request: ClientRequest) -> Result<()>;

    /// Inbound event feed. Dropping the receiver unregisters it, so
    /// re-subscribing never duplicates handlers.
    fn subscribe(&self) -> broadcast::Receiver<ServerEvent>;
}

/// Durable key-value cache for the room access token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<AccessToken>>;
    async fn store(&self, token: &AccessToken) -> Result<()>;
    async fn clear(&self) -> Result<()>;
}

#[async_trait]
impl TokenStore for storage::Storage {
    async fn load(&self) -> Result<Option<AccessToken>> {
        self.load_access_token().await
    }

    async fn store(&self, token: &AccessToken) -> Result<()> {
        self.store_access_token(token).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_access_token().await
    }
}

/// Token store with no persistence; a fresh session every time.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<AccessToken>> {
        Ok(self.token.lock().await.clone())
    }

    async fn store(&self, token: &AccessToken) -> Result<()> {
        *self.token.lock().await = Some(token.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.token.lock().await = None;
        Ok(())
    }
}

/// UI-facing session events.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    PhaseChanged(SessionPhase),
    MessageAccepted(Message),
    HistoryCleared,
    TypingStatusChanged(Option<String>),
    /// Access was denied; the navigation collaborator should redirect to an
    /// unauthorized view.
    RedirectUnauthorized,
    /// User-facing rejection notice (unauthorized action and the like).
    Notice(String),
    Error(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub clear_policy: ClearPolicy,
    pub typing_expiry: Duration,
    pub typing_emit_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            clear_policy: ClearPolicy::default(),
            typing_expiry: TYPING_EXPIRY,
            typing_emit_interval: TYPING_EMIT_INTERVAL,
        }
    }
}

struct SessionState {
    gate: AccessGate,
    store: MessageStore,
    joined: bool,
    pump: Option<JoinHandle<()>>,
}

/// Session controller for one room. Owns the shared channel handle,
/// demultiplexes inbound events to the store and typing indicator, and runs
/// every outbound action through the access gate first.
pub struct RoomClient {
    channel: Arc<dyn ChatChannel>,
    typing: Arc<TypingIndicator>,
    clear_policy: ClearPolicy,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<ClientEvent>,
    room: RoomId,
    user: UserId,
}

impl RoomClient {
    pub fn new(
        channel: Arc<dyn ChatChannel>,
        tokens: Arc<dyn TokenStore>,
        room: RoomId,
        user: UserId,
        config: ClientConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(1024);
        let typing = Arc::new(TypingIndicator::new(
            events.clone(),
            config.typing_expiry,
            config.typing_emit_interval,
        ));
        let gate = AccessGate::new(room.clone(), user.clone(), tokens);
        Arc::new(Self {
            channel,
            typing,
            clear_policy: config.clear_policy,
            inner: Mutex::new(SessionState {
                gate,
                store: MessageStore::new(),
                joined: false,
                pump: None,
            }),
            events,
            room,
            user,
        })
    }

    /// Starts the session: registers the inbound pump (once; restarting is a
    /// no-op) and, if a token was stored from an earlier grant, emits the
    /// authorization check for it. The room itself is only joined after the
    /// gate reaches `Authorized`.
    pub async fn start(self: &Arc<Self>) -> Result<(), ClientError> {
        let mut state = self.inner.lock().await;
        if state.pump.is_none() {
            state.pump = Some(self.spawn_event_pump());
        }
        let check = state
            .gate
            .start()
            .await
            .map_err(ClientError::TokenStore)?;
        if let Some(check) = check {
            self.broadcast_phase(&state);
            self.emit(check).await?;
        }
        Ok(())
    }

    /// Explicitly asks the server for room access (the no-stored-token flow).
    pub async fn request_access(&self) -> Result<(), ClientError> {
        let request = {
            let mut state = self.inner.lock().await;
            let request = state.gate.request_access();
            self.broadcast_phase(&state);
            request
        };
        self.emit(request).await
    }

    /// Sends a chat message. Blank text with no attachment is a silent
    /// no-op; an unpermitted sender is rejected locally with a notice and no
    /// emission.
    pub async fn send(&self, text: &str, image: Option<String>) -> Result<(), ClientError> {
        if text.trim().is_empty() && image.is_none() {
            return Ok(());
        }
        let message = {
            let state = self.inner.lock().await;
            if matches!(state.gate.phase(), SessionPhase::Denied) {
                return Err(ClientError::AuthorizationDenied {
                    room: self.room.clone(),
                });
            }
            if !state.gate.authorize(&self.user) {
                return Err(self.reject("send messages"));
            }
            Message {
                text: text.to_string(),
                room: self.room.clone(),
                sender: self.user.clone(),
                timestamp: Utc::now(),
                image,
            }
        };
        self.emit(ClientRequest::Message(message)).await
    }

    /// Encodes the image file, then sends. Encoding completes before
    /// anything is emitted, so the send cannot race ahead of it.
    pub async fn send_with_attachment(
        &self,
        text: &str,
        image_path: &Path,
    ) -> Result<(), ClientError> {
        let image = attachment::encode_file(image_path).await?;
        self.send(text, Some(image)).await
    }

    /// Signals local typing state. Outbound `typing: true` is throttled on
    /// the leading edge; `typing: false` always goes out.
    pub async fn set_typing(&self, typing: bool) -> Result<(), ClientError> {
        {
            let state = self.inner.lock().await;
            if !state.gate.authorize(&self.user) {
                return Err(self.reject("signal typing"));
            }
        }
        let signal = if typing {
            match self.typing.local_input(&self.room, &self.user).await {
                Some(signal) => signal,
                None => return Ok(()),
            }
        } else {
            self.typing.local_stopped(&self.room, &self.user).await
        };
        self.emit(ClientRequest::Typing(signal)).await
    }

    /// Empties the local history. Whether the clear also goes out to the
    /// rest of the room depends on the configured policy and the local role.
    pub async fn clear_history(&self) -> Result<(), ClientError> {
        let may_broadcast = {
            let mut state = self.inner.lock().await;
            state.store.clear();
            match self.clear_policy {
                ClearPolicy::OwnerOnly => state.gate.role() == Some(Role::Owner),
                ClearPolicy::AnyParticipant => state.gate.can_observe(),
            }
        };
        let _ = self.events.send(ClientEvent::HistoryCleared);
        if may_broadcast {
            self.emit(ClientRequest::ClearHistory {
                room_id: self.room.clone(),
            })
            .await?;
        } else {
            let _ = self.events.send(ClientEvent::Notice(
                "only the room owner can clear history for everyone".to_string(),
            ));
        }
        Ok(())
    }

    /// Tears down inbound handling and the typing timer. Idempotent.
    pub async fn leave(&self) {
        let mut state = self.inner.lock().await;
        if let Some(pump) = state.pump.take() {
            pump.abort();
        }
        state.joined = false;
        self.typing.teardown().await;
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.inner.lock().await.store.messages().to_vec()
    }

    pub async fn phase(&self) -> SessionPhase {
        self.inner.lock().await.gate.phase().clone()
    }

    pub async fn typing_status(&self) -> Option<String> {
        self.typing.status().await
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    fn spawn_event_pump(self: &Arc<Self>) -> JoinHandle<()> {
        let mut inbound = self.channel.subscribe();
        let client = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match inbound.recv().await {
                    Ok(event) => client.handle_inbound(event).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "inbound event pump lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn handle_inbound(&self, event: ServerEvent) {
        match event {
            ServerEvent::ChatAccessResult(result) => self.handle_access_result(result).await,
            ServerEvent::Message(message) => self.handle_message(message).await,
            ServerEvent::Typing(signal) => self.handle_typing(signal).await,
            ServerEvent::ClearHistory { room_id } => self.handle_remote_clear(room_id).await,
        }
    }

    async fn handle_access_result(&self, result: AccessResult) {
        let mut state = self.inner.lock().await;
        match state.gate.apply_result(result).await {
            Ok(GateVerdict::Granted) => {
                info!(room = %self.room, "room access granted");
                if !state.joined {
                    // Join intent goes out exactly once per granted
                    // authorization.
                    let join = ClientRequest::Join {
                        room_id: self.room.clone(),
                    };
                    match self.channel.emit(join).await {
                        Ok(()) => state.joined = true,
                        Err(err) => {
                            let _ = self
                                .events
                                .send(ClientEvent::Error(format!("failed to join room: {err}")));
                        }
                    }
                }
                self.broadcast_phase(&state);
            }
            Ok(GateVerdict::Refused) => {
                warn!(room = %self.room, "room access denied");
                state.joined = false;
                self.broadcast_phase(&state);
                let _ = self.events.send(ClientEvent::RedirectUnauthorized);
            }
            Err(err) => {
                let _ = self.events.send(ClientEvent::Error(format!(
                    "failed to apply access result: {err}"
                )));
            }
        }
    }

    async fn handle_message(&self, message: Message) {
        let mut state = self.inner.lock().await;
        if !state.gate.can_observe() {
            return;
        }
        // Messages for other rooms are never dispatched to the store.
        if message.room != self.room {
            return;
        }
        let Some(grant) = state.gate.grant().cloned() else {
            return;
        };
        if state.store.accept(message.clone(), &grant) {
            let _ = self.events.send(ClientEvent::MessageAccepted(message));
        }
    }

    async fn handle_typing(&self, signal: TypingSignal) {
        {
            let state = self.inner.lock().await;
            if !state.gate.can_observe() {
                return;
            }
        }
        if signal.room != self.room || signal.user == self.user {
            return;
        }
        self.typing.apply_remote(&signal).await;
    }

    async fn handle_remote_clear(&self, room_id: RoomId) {
        let mut state = self.inner.lock().await;
        if !state.gate.can_observe() || room_id != self.room {
            return;
        }
        state.store.clear();
        let _ = self.events.send(ClientEvent::HistoryCleared);
    }

    async fn emit(&self, request: ClientRequest) -> Result<(), ClientError> {
        self.channel
            .emit(request)
            .await
            .map_err(|err| ClientError::TransportUnavailable(err.to_string()))
    }

    fn reject(&self, action: &'static str) -> ClientError {
        let _ = self.events.send(ClientEvent::Notice(format!(
            "{} is not allowed to {action} in this room",
            self.user
        )));
        ClientError::UnauthorizedAction {
            user: self.user.clone(),
            room: self.room.clone(),
            action,
        }
    }

    fn broadcast_phase(&self, state: &SessionState) {
        let _ = self
            .events
            .send(ClientEvent::PhaseChanged(state.gate.phase().clone()));
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
