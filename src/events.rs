use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events published by the services after their side effects commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Account events
    UserRegistered(Uuid),

    // Catalog events
    FlowerCreated(Uuid),
    FlowerUpdated(Uuid),
    FlowerDeleted(Uuid),

    // Cart events
    CartItemAdded { user_id: Uuid, flower_id: Uuid },
    CartItemRemoved { user_id: Uuid, flower_id: Uuid },
    CartCleared(Uuid),

    // Address events
    AddressCreated(Uuid),
    AddressDeleted(Uuid),

    // Order events
    OrderCreated(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    PaymentStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
}

/// Cloneable handle for publishing events onto the in-process channel.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    /// Event delivery is best-effort and must never fail a committed request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Dropping domain event: {}", e);
        }
    }
}

/// Background consumer for the event channel. Today events only feed the
/// structured log; notification and webhook fan-out would hang off here.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(event = ?event, "domain event");
    }
    info!("Event channel closed; consumer exiting");
}
