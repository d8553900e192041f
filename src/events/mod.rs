use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Cloneable handle for emitting audit events onto the async channel.
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

    /// Best-effort send for use after a transaction has already committed.
    /// A full or closed channel is logged and dropped; it must never roll
    /// back committed work.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            error!("Event delivery failed: {}", e);
        }
    }
}

// The audit trail of the system: one variant per committed state change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Item lifecycle
    ItemCreated {
        item_id: Uuid,
        sku: String,
    },
    ItemDeactivated(Uuid),
    ItemActivated(Uuid),
    LowStockDetected {
        item_id: Uuid,
        sku: String,
        quantity: Decimal,
        reorder_point: Decimal,
    },

    // Ledger
    TransactionRecorded {
        transaction_id: Uuid,
        item_id: Uuid,
        transaction_type: String,
        direction: String,
        quantity: Decimal,
        balance_after: Decimal,
        actor: String,
    },

    // Purchasing
    PurchaseCreated {
        purchase_id: Uuid,
        purchase_number: String,
        supplier_id: Uuid,
        total: Decimal,
    },
    PurchaseOrdered {
        purchase_id: Uuid,
        actor: String,
    },
    PurchaseReceived {
        purchase_id: Uuid,
        old_status: String,
        new_status: String,
        lines_received: usize,
        actor: String,
    },
    PurchaseCancelled {
        purchase_id: Uuid,
        old_status: String,
        actor: String,
    },

    // Production
    BatchCreated {
        batch_id: Uuid,
        batch_number: String,
        planned_quantity: Decimal,
    },
    BatchStarted {
        batch_id: Uuid,
        materials_cost: Decimal,
        actor: String,
    },
    BatchCompleted {
        batch_id: Uuid,
        produced_quantity: Decimal,
        cost_per_unit: Decimal,
        actor: String,
    },
    BatchHeld {
        batch_id: Uuid,
        actor: String,
    },
    BatchResumed {
        batch_id: Uuid,
        actor: String,
    },
    BatchCancelled {
        batch_id: Uuid,
        old_status: String,
        actor: String,
    },

    // Adjustments
    AdjustmentApplied {
        adjustment_id: Uuid,
        item_id: Uuid,
        kind: String,
        applied_delta: Decimal,
        reason: String,
        actor: String,
    },

    // Reconciliation
    ReconciliationCompleted {
        items_checked: usize,
        discrepancies: usize,
    },
}

/// Consumes the event stream and logs it. Spawned once from main; lives
/// until the sending half is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::LowStockDetected {
                item_id,
                sku,
                quantity,
                reorder_point,
            } => {
                warn!(
                    %item_id,
                    %sku,
                    %quantity,
                    %reorder_point,
                    "item at or below reorder point"
                );
            }
            Event::TransactionRecorded {
                transaction_id,
                item_id,
                transaction_type,
                direction,
                quantity,
                balance_after,
                actor,
            } => {
                info!(
                    %transaction_id,
                    %item_id,
                    transaction_type,
                    direction,
                    %quantity,
                    %balance_after,
                    actor,
                    "ledger transaction recorded"
                );
            }
            Event::ReconciliationCompleted {
                items_checked,
                discrepancies,
            } => {
                if *discrepancies > 0 {
                    warn!(
                        items_checked,
                        discrepancies, "reconciliation found ledger drift"
                    );
                } else {
                    info!(items_checked, "reconciliation clean");
                }
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    info!("Event processing loop stopped");
}
