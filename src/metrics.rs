use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    Encoder, HistogramVec, IntCounter, IntCounterVec, IntGauge, TextEncoder,
};

lazy_static! {
    /// Ledger transactions recorded, by type and direction
    pub static ref LEDGER_TRANSACTIONS: IntCounterVec = register_int_counter_vec!(
        "stockledger_ledger_transactions_total",
        "Total number of inventory ledger transactions recorded",
        &["transaction_type", "direction"]
    )
    .expect("metric can be created");

    /// Purchase receipts posted to inventory
    pub static ref PURCHASE_RECEIPTS: IntCounter = register_int_counter!(
        "stockledger_purchase_receipts_total",
        "Total number of purchase receipts posted"
    )
    .expect("metric can be created");

    /// Production batches started (materials consumed)
    pub static ref BATCHES_STARTED: IntCounter = register_int_counter!(
        "stockledger_batches_started_total",
        "Total number of production batches started"
    )
    .expect("metric can be created");

    /// Production batches completed
    pub static ref BATCHES_COMPLETED: IntCounter = register_int_counter!(
        "stockledger_batches_completed_total",
        "Total number of production batches completed"
    )
    .expect("metric can be created");

    /// Manual stock adjustments applied, by kind
    pub static ref ADJUSTMENTS_APPLIED: IntCounterVec = register_int_counter_vec!(
        "stockledger_adjustments_applied_total",
        "Total number of manual stock adjustments applied",
        &["kind"]
    )
    .expect("metric can be created");

    /// Reconciliation runs executed
    pub static ref RECONCILIATION_RUNS: IntCounter = register_int_counter!(
        "stockledger_reconciliation_runs_total",
        "Total number of ledger reconciliation runs"
    )
    .expect("metric can be created");

    /// Items with a variance in the most recent reconciliation run
    pub static ref RECONCILIATION_DISCREPANCIES: IntGauge = register_int_gauge!(
        "stockledger_reconciliation_discrepancies",
        "Number of items flagged by the most recent reconciliation run"
    )
    .expect("metric can be created");

    /// Service call latency, by operation
    pub static ref SERVICE_DURATION: HistogramVec = register_histogram_vec!(
        "stockledger_service_duration_seconds",
        "Duration of service operations in seconds",
        &["operation"]
    )
    .expect("metric can be created");
}

/// Renders all registered metrics in Prometheus text exposition format
pub async fn metrics_handler() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exposition_includes_registered_metrics() {
        LEDGER_TRANSACTIONS
            .with_label_values(&["purchase", "in"])
            .inc();
        RECONCILIATION_RUNS.inc();
        RECONCILIATION_DISCREPANCIES.set(3);

        let body = metrics_handler().await.expect("metrics render");
        assert!(body.contains("stockledger_ledger_transactions_total"));
        assert!(body.contains("stockledger_reconciliation_runs_total"));
        assert!(body.contains("stockledger_reconciliation_discrepancies 3"));
    }
}
