use tokio::sync::broadcast;
use tracing::trace;

/// Fire-and-forget notifications for observers of the profile slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileEvent {
    ProfileUpdated,
    ProfileRemoved,
}

pub struct EventBus {
    sender: broadcast::Sender<ProfileEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProfileEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: ProfileEvent) {
        if self.sender.send(event).is_err() {
            trace!(?event, "no subscribers");
        }
    }
}
