use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::id::ChallengeRef;
use crate::service::Service;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    SessionChanged {
        target: ChallengeRef,
        is_starting: bool,
    },
    SessionCleared,
    StartFailed {
        target: ChallengeRef,
        message: String,
    },
    WorkspaceMismatch {
        viewing: ChallengeRef,
        running: ChallengeRef,
    },
    ServiceReady {
        service: Service,
        url: String,
    },
    ServiceFailed {
        service: Service,
        message: String,
    },
    SolveRecorded(ChallengeRef),
    #[serde(other)]
    Unknown,
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
