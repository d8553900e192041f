// Costing math and the ledger primitive
pub mod costing;
pub mod ledger;

// Item master and valuation
pub mod inventory;

// Document workflows
pub mod production;
pub mod purchasing;

// Corrections and audit
pub mod adjustments;
pub mod reconciliation;

use chrono::{DateTime, Datelike, Utc};

/// Year-month period used in document numbers, e.g. "202508".
pub(crate) fn document_period(now: DateTime<Utc>) -> String {
    format!("{:04}{:02}", now.year(), now.month())
}

/// Period-scoped document number, e.g. `PO-202508-0042`.
pub(crate) fn document_number(prefix: &str, period: &str, seq: u64) -> String {
    format!("{}-{}-{:04}", prefix, period, seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn period_is_year_month() {
        let now = Utc.with_ymd_and_hms(2025, 8, 3, 12, 0, 0).unwrap();
        assert_eq!(document_period(now), "202508");
    }

    #[test]
    fn number_zero_pads_to_four() {
        assert_eq!(document_number("PO", "202508", 7), "PO-202508-0007");
        assert_eq!(document_number("BATCH", "202512", 1234), "BATCH-202512-1234");
        assert_eq!(document_number("PO", "202601", 10001), "PO-202601-10001");
    }
}
