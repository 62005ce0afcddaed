use crate::entities::stock_transaction::MovementType;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the ledger. Consumed by the background processor for
/// audit logging; manual corrections are tagged distinctly from
/// transaction-driven changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    MovementRecorded {
        transaction_id: Uuid,
        movement_type: MovementType,
        material_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        new_stock: i32,
        user_id: Uuid,
    },
    StockRegistered {
        stock_level_id: Uuid,
        material_id: Uuid,
        warehouse_id: Uuid,
        current_stock: i32,
        user_id: Uuid,
    },
    StockManuallyAdjusted {
        stock_level_id: Uuid,
        old_stock: i32,
        new_stock: i32,
        old_safety_stock: i32,
        new_safety_stock: i32,
        user_id: Uuid,
    },
    StockLevelDeleted {
        stock_level_id: Uuid,
        material_id: Uuid,
        warehouse_id: Uuid,
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

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Best-effort send for events describing work that already committed.
    /// A full channel must not fail the committed write, so failures are
    /// logged and swallowed.
    pub async fn send_logged(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("dropping audit event: {}", e);
        }
    }
}

/// Background task draining the event channel into the audit log.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::MovementRecorded {
                transaction_id,
                movement_type,
                material_id,
                warehouse_id,
                quantity,
                new_stock,
                user_id,
            } => {
                info!(
                    %transaction_id,
                    %material_id,
                    %warehouse_id,
                    %user_id,
                    quantity,
                    new_stock,
                    "stock movement recorded: {}",
                    movement_type
                );
            }
            Event::StockRegistered {
                stock_level_id,
                material_id,
                warehouse_id,
                current_stock,
                user_id,
            } => {
                info!(
                    %stock_level_id,
                    %material_id,
                    %warehouse_id,
                    %user_id,
                    current_stock,
                    "stock level registered"
                );
            }
            Event::StockManuallyAdjusted {
                stock_level_id,
                old_stock,
                new_stock,
                user_id,
                ..
            } => {
                // Deliberate correction outside the transaction ledger; keep
                // it loud and distinguishable in the audit stream.
                warn!(
                    %stock_level_id,
                    %user_id,
                    old_stock,
                    new_stock,
                    "manual stock adjustment (no ledger transaction)"
                );
            }
            Event::StockLevelDeleted {
                stock_level_id,
                material_id,
                warehouse_id,
            } => {
                info!(%stock_level_id, %material_id, %warehouse_id, "stock level deleted");
            }
        }
    }

    info!("event channel closed, stopping event processor");
}
