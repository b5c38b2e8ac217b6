use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::domain::{TransactionRecord, format_cents};

/// Transaction history snapshot for JSON export
#[derive(Debug, Clone, Serialize)]
pub struct HistorySnapshot<'a> {
    pub version: &'static str,
    pub exported_at: DateTime<Utc>,
    pub account: &'a str,
    pub transactions: &'a [TransactionRecord],
}

/// Writes transaction records out as CSV or JSON.
pub struct Exporter<'a> {
    account: &'a str,
    records: &'a [TransactionRecord],
}

impl<'a> Exporter<'a> {
    pub fn new(account: &'a str, records: &'a [TransactionRecord]) -> Self {
        Self { account, records }
    }

    /// Export records to CSV format
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "sequence",
            "id",
            "timestamp",
            "sender",
            "recipient",
            "amount",
            "status",
            "reason",
        ])?;

        for record in self.records {
            csv_writer.write_record([
                record.sequence.to_string(),
                record.id.to_string(),
                record.timestamp.to_rfc3339(),
                record.sender.clone(),
                record.recipient.clone(),
                format_cents(record.amount_cents),
                record.status.as_str().to_string(),
                record.reason.clone().unwrap_or_default(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(self.records.len())
    }

    /// Export records as a JSON snapshot
    pub fn export_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let snapshot = HistorySnapshot {
            version: env!("CARGO_PKG_VERSION"),
            exported_at: Utc::now(),
            account: self.account,
            transactions: self.records,
        };

        serde_json::to_writer_pretty(&mut writer, &snapshot)?;
        writeln!(writer)?;
        writer.flush()?;

        Ok(self.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_records() -> Vec<TransactionRecord> {
        let mut ok = TransactionRecord::success("ada@example.com", "bob@example.com", 50000);
        ok.sequence = 1;
        let mut failed = TransactionRecord::failed(
            "ada@example.com",
            "bob@example.com",
            100000,
            "Insufficient funds",
        );
        failed.sequence = 2;
        vec![ok, failed]
    }

    #[test]
    fn test_export_csv() {
        let records = sample_records();
        let mut out = Vec::new();
        let count = Exporter::new("ada@example.com", &records)
            .export_csv(&mut out)
            .unwrap();

        assert_eq!(count, 2);
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("sequence,id,timestamp"));
        assert!(lines[1].contains(",500.00,SUCCESS,"));
        assert!(lines[2].ends_with(",1000.00,FAILED,Insufficient funds"));
    }

    #[test]
    fn test_export_json() {
        let records = sample_records();
        let mut out = Vec::new();
        Exporter::new("ada@example.com", &records)
            .export_json(&mut out)
            .unwrap();

        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["account"], "ada@example.com");
        assert_eq!(value["transactions"].as_array().unwrap().len(), 2);
        assert_eq!(value["transactions"][1]["status"], "FAILED");
    }
}
