//! Count report generation service.

use super::types::{CountReport, ReportAttestation, ReportLine};
use crate::batch::BatchTotals;
use crate::ledger::{DonationLine, DonationType};

/// Service for assembling finalized count reports.
pub struct ReportService;

/// Input describing a finalized batch, assembled by the caller from storage.
#[derive(Debug, Clone)]
pub struct CountReportInput {
    /// Batch ID.
    pub batch_id: uuid::Uuid,
    /// Service name.
    pub service_name: String,
    /// Service date.
    pub service_date: chrono::NaiveDate,
    /// Congregation name.
    pub congregation_name: String,
    /// Donation lines in entry order.
    pub lines: Vec<ReportLine>,
    /// Primary attestation.
    pub primary_attestation: ReportAttestation,
    /// Secondary attestation.
    pub secondary_attestation: ReportAttestation,
    /// Finalization timestamp.
    pub finalized_at: chrono::DateTime<chrono::Utc>,
}

impl ReportService {
    /// Assembles a count report, computing totals from the donation lines.
    #[must_use]
    pub fn generate_count_report(input: CountReportInput) -> CountReport {
        let ledger_lines: Vec<DonationLine> = input
            .lines
            .iter()
            .map(|line| DonationLine {
                donation_type: DonationType::parse(&line.donation_type)
                    .unwrap_or(DonationType::Cash),
                amount: line.amount,
            })
            .collect();
        let partition = BatchTotals::partition(&ledger_lines);

        CountReport {
            report_type: "count_report".to_string(),
            batch_id: input.batch_id,
            service_name: input.service_name,
            service_date: input.service_date,
            congregation_name: input.congregation_name,
            lines: input.lines,
            cash_total: partition.cash_total,
            check_total: partition.check_total,
            total: partition.total(),
            primary_attestation: input.primary_attestation,
            secondary_attestation: input.secondary_attestation,
            finalized_at: input.finalized_at,
        }
    }

    /// Renders a report as CSV with a header row and a trailing totals section.
    #[must_use]
    pub fn to_csv(report: &CountReport) -> String {
        let mut out = String::from("date,donor,type,check_number,amount,notes\n");
        for line in &report.lines {
            out.push_str(&format!(
                "{},{},{},{},{},{}\n",
                line.donation_date,
                csv_field(&line.donor_name),
                line.donation_type,
                csv_field(line.check_number.as_deref().unwrap_or("")),
                line.amount,
                csv_field(line.notes.as_deref().unwrap_or("")),
            ));
        }
        out.push_str(&format!(",,,,,\ncash_total,,,,{},\n", report.cash_total));
        out.push_str(&format!("check_total,,,,{},\n", report.check_total));
        out.push_str(&format!("total,,,,{},\n", report.total));
        out
    }

    /// Renders the plain-text email body for report dispatch.
    #[must_use]
    pub fn to_email_body(report: &CountReport) -> String {
        format!(
            "Offering count report for {} — {}\n\
             Congregation: {}\n\n\
             Cash total:  {}\n\
             Check total: {}\n\
             Grand total: {}\n\n\
             Counted by: {} (primary), {} (secondary)\n\
             Finalized at: {}\n\n\
             The full donation listing is attached as CSV.\n",
            report.service_name,
            report.service_date,
            report.congregation_name,
            report.cash_total,
            report.check_total,
            report.total,
            report.primary_attestation.signature_name,
            report.secondary_attestation.signature_name,
            report.finalized_at.to_rfc3339(),
        )
    }

    /// Suggested filename for the CSV attachment.
    #[must_use]
    pub fn csv_filename(report: &CountReport) -> String {
        format!(
            "count-report-{}-{}.csv",
            report.service_date,
            report.batch_id.simple()
        )
    }
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::*;

    fn sample_line(
        donor: &str,
        donation_type: &str,
        check_number: Option<&str>,
        amount: rust_decimal::Decimal,
    ) -> ReportLine {
        ReportLine {
            donation_id: Uuid::new_v4(),
            donation_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            donor_name: donor.to_string(),
            donation_type: donation_type.to_string(),
            check_number: check_number.map(String::from),
            amount,
            notes: None,
        }
    }

    fn sample_input() -> CountReportInput {
        CountReportInput {
            batch_id: Uuid::new_v4(),
            service_name: "Sunday Morning".to_string(),
            service_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            congregation_name: "First Church".to_string(),
            lines: vec![
                sample_line("Jane Doe", "cash", None, dec!(50.00)),
                sample_line("Anonymous", "cash", None, dec!(75.00)),
                sample_line("Bob Smith", "check", Some("1041"), dec!(120.00)),
            ],
            primary_attestation: ReportAttestation {
                signature_name: "Alice Counter".to_string(),
                attested_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            },
            secondary_attestation: ReportAttestation {
                signature_name: "Carol Verifier".to_string(),
                attested_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 10, 0).unwrap(),
            },
            finalized_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 15, 0).unwrap(),
        }
    }

    #[test]
    fn generate_computes_partitioned_totals() {
        let report = ReportService::generate_count_report(sample_input());
        assert_eq!(report.cash_total, dec!(125.00));
        assert_eq!(report.check_total, dec!(120.00));
        assert_eq!(report.total, dec!(245.00));
        assert_eq!(report.report_type, "count_report");
        assert_eq!(report.lines.len(), 3);
    }

    #[test]
    fn csv_contains_header_lines_and_totals() {
        let report = ReportService::generate_count_report(sample_input());
        let csv = ReportService::to_csv(&report);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "date,donor,type,check_number,amount,notes");
        assert_eq!(lines[1], "2026-03-01,Jane Doe,cash,,50.00,");
        assert_eq!(lines[3], "2026-03-01,Bob Smith,check,1041,120.00,");
        assert!(csv.contains("cash_total,,,,125.00,"));
        assert!(csv.contains("check_total,,,,120.00,"));
        assert!(csv.contains("total,,,,245.00,"));
    }

    #[test]
    fn csv_quotes_fields_with_commas() {
        let mut input = sample_input();
        input.lines = vec![sample_line("Doe, Jane", "cash", None, dec!(10.00))];
        let report = ReportService::generate_count_report(input);
        let csv = ReportService::to_csv(&report);
        assert!(csv.contains("\"Doe, Jane\""));
    }

    #[test]
    fn email_body_names_both_attestors() {
        let report = ReportService::generate_count_report(sample_input());
        let body = ReportService::to_email_body(&report);
        assert!(body.contains("Alice Counter (primary)"));
        assert!(body.contains("Carol Verifier (secondary)"));
        assert!(body.contains("Grand total: 245.00"));
    }

    #[test]
    fn csv_filename_includes_service_date() {
        let report = ReportService::generate_count_report(sample_input());
        let name = ReportService::csv_filename(&report);
        assert!(name.starts_with("count-report-2026-03-01-"));
        assert!(name.ends_with(".csv"));
    }
}
