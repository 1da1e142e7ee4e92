use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Domain events emitted by the service layer.
///
/// Emission is fire-and-forget: a full or closed channel is logged and
/// swallowed, never surfaced to the request that triggered it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeactivated(Uuid),

    // Sales events
    SaleRecorded {
        sale_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    },

    // Account events
    UserCreated(Uuid),
    UserUpdated(Uuid),

    // Forecast events
    ForecastGenerated {
        category: String,
        products: usize,
    },
    ForecastSaved {
        rows: usize,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, logging (not propagating) delivery failures.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("Failed to deliver domain event: {}", e);
        }
    }
}

/// Consume events off the channel and log them. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::ProductCreated(id) => info!(product_id = %id, "product created"),
            Event::ProductUpdated(id) => info!(product_id = %id, "product updated"),
            Event::ProductDeactivated(id) => info!(product_id = %id, "product deactivated"),
            Event::SaleRecorded {
                sale_id,
                product_id,
                quantity,
            } => info!(sale_id = %sale_id, product_id = %product_id, quantity, "sale recorded"),
            Event::UserCreated(id) => info!(user_id = %id, "user created"),
            Event::UserUpdated(id) => info!(user_id = %id, "user updated"),
            Event::ForecastGenerated { category, products } => {
                info!(category = %category, products, "forecast generated")
            }
            Event::ForecastSaved { rows } => info!(rows, "forecast saved"),
        }
    }
    info!("Event channel closed; processor exiting");
}
