//! Count report data types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One donation line on a count report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportLine {
    /// Donation ID.
    pub donation_id: Uuid,
    /// Date the donation was received.
    pub donation_date: NaiveDate,
    /// Donor display name, or "Anonymous" when no member is attached.
    pub donor_name: String,
    /// Donation type (cash, check).
    pub donation_type: String,
    /// Check number, empty for cash.
    pub check_number: Option<String>,
    /// Donation amount.
    pub amount: Decimal,
    /// Free-form notes recorded by the counter.
    pub notes: Option<String>,
}

/// Attestation record as it appears on a report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportAttestation {
    /// Signature name recorded at attestation time.
    pub signature_name: String,
    /// When the attestation was recorded.
    pub attested_at: DateTime<Utc>,
}

/// Finalized count report for a single batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountReport {
    /// Report type identifier.
    pub report_type: String,
    /// Batch ID.
    pub batch_id: Uuid,
    /// Service name the batch was collected at.
    pub service_name: String,
    /// Service date.
    pub service_date: NaiveDate,
    /// Congregation name.
    pub congregation_name: String,
    /// Donation lines, ordered by entry time.
    pub lines: Vec<ReportLine>,
    /// Sum of cash lines.
    pub cash_total: Decimal,
    /// Sum of check lines.
    pub check_total: Decimal,
    /// Grand total.
    pub total: Decimal,
    /// Primary counter's attestation.
    pub primary_attestation: ReportAttestation,
    /// Secondary counter's attestation.
    pub secondary_attestation: ReportAttestation,
    /// When finalization was confirmed.
    pub finalized_at: DateTime<Utc>,
}
