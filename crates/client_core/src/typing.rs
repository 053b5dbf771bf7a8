use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use shared::domain::{RoomId, UserId};
use shared::protocol::TypingSignal;

use crate::ClientEvent;

/// How long a remote typing status stays visible after the last signal.
pub const TYPING_EXPIRY: Duration = Duration::from_millis(3000);

/// Leading-edge throttle interval for outbound typing emissions.
pub const TYPING_EMIT_INTERVAL: Duration = Duration::from_millis(1000);

struct TypingState {
    status: Option<String>,
    expiry_timer: Option<JoinHandle<()>>,
    last_emit: Option<Instant>,
}

/// Debounced presence signal. Renders remote typing with auto-expiry (one
/// cancellable timer, never more) and throttles the outbound signal so each
/// keystroke does not become a channel emission.
pub struct TypingIndicator {
    inner: Mutex<TypingState>,
    events: broadcast::Sender<ClientEvent>,
    expiry: Duration,
    emit_interval: Duration,
}

impl TypingIndicator {
    pub fn new(
        events: broadcast::Sender<ClientEvent>,
        expiry: Duration,
        emit_interval: Duration,
    ) -> Self {
        Self {
            inner: Mutex::new(TypingState {
                status: None,
                expiry_timer: None,
                last_emit: None,
            }),
            events,
            expiry,
            emit_interval,
        }
    }

    /// Applies a remote typing signal. `typing: true` shows the status and
    /// restarts the expiry timer, cancelling any pending one; `typing: false`
    /// clears immediately.
    pub async fn apply_remote(self: &Arc<Self>, signal: &TypingSignal) {
        let mut state = self.inner.lock().await;
        if let Some(timer) = state.expiry_timer.take() {
            timer.abort();
        }

        if signal.typing {
            let status = format!("{} is typing...", signal.user);
            if state.status.as_deref() != Some(status.as_str()) {
                let _ = self
                    .events
                    .send(ClientEvent::TypingStatusChanged(Some(status.clone())));
            }
            state.status = Some(status);

            let indicator = Arc::clone(self);
            state.expiry_timer = Some(tokio::spawn(async move {
                tokio::time::sleep(indicator.expiry).await;
                indicator.expire().await;
            }));
        } else if state.status.take().is_some() {
            let _ = self.events.send(ClientEvent::TypingStatusChanged(None));
        }
    }

    async fn expire(&self) {
        let mut state = self.inner.lock().await;
        state.expiry_timer = None;
        if state.status.take().is_some() {
            let _ = self.events.send(ClientEvent::TypingStatusChanged(None));
        }
    }

    /// Local keystroke. Returns the signal to emit, or `None` while inside
    /// the throttle window.
    pub async fn local_input(&self, room: &RoomId, user: &UserId) -> Option<TypingSignal> {
        let mut state = self.inner.lock().await;
        let now = Instant::now();
        if let Some(at) = state.last_emit {
            if now.duration_since(at) < self.emit_interval {
                return None;
            }
        }
        state.last_emit = Some(now);
        Some(TypingSignal {
            room: room.clone(),
            user: user.clone(),
            typing: true,
        })
    }

    /// Local explicit stop. Always emitted; resets the throttle window so
    /// the next keystroke emits immediately.
    pub async fn local_stopped(&self, room: &RoomId, user: &UserId) -> TypingSignal {
        let mut state = self.inner.lock().await;
        state.last_emit = None;
        TypingSignal {
            room: room.clone(),
            user: user.clone(),
            typing: false,
        }
    }

    pub async fn status(&self) -> Option<String> {
        self.inner.lock().await.status.clone()
    }

    /// Releases the pending timer, if any, and clears the visible status.
    pub async fn teardown(&self) {
        let mut state = self.inner.lock().await;
        if let Some(timer) = state.expiry_timer.take() {
            timer.abort();
        }
        state.status = None;
        state.last_emit = None;
    }
}

#[cfg(test)]
#[path = "tests/typing_tests.rs"]
mod tests;
