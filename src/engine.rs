//! Batch reconciliation driver.
//!
//! Streams both canonical CSV feeds into memory, applies the upstream
//! relevance rules, runs the matcher and writes the comparison snapshot.
//! Rows that cannot be used are logged and skipped; they never abort a run.

use crate::config::ReconConfig;
use crate::error::{ReconError, Result};
use crate::record::{BillingRecord, BillingRow, ProcessorRecord, ProcessorRow};
use crate::registry::{ComparisonRegistry, Statistics};
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::io::{Read, Write};

/// Header of the comparison CSV written by [`ReconEngine::write_output`].
pub const OUTPUT_HEADER: [&str; 12] = [
    "identity",
    "date",
    "amount",
    "status",
    "confidence",
    "processor_id",
    "processor_amount",
    "invoice",
    "billing_amount",
    "difference",
    "confirmed",
    "rejected",
];

/// Holds both ledgers for one reconciliation run.
///
/// Record ids are unique per feed; a repeated id is skipped with a warning.
pub struct ReconEngine {
    config: ReconConfig,

    processor: Vec<ProcessorRecord>,
    billing: Vec<BillingRecord>,

    seen_charges: HashSet<String>,
    seen_invoices: HashSet<String>,
}

impl ReconEngine {
    pub fn new(config: ReconConfig) -> Self {
        ReconEngine {
            config,
            processor: Vec::new(),
            billing: Vec::new(),
            seen_charges: HashSet::new(),
            seen_invoices: HashSet::new(),
        }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    pub fn processor_records(&self) -> &[ProcessorRecord] {
        &self.processor
    }

    pub fn billing_records(&self) -> &[BillingRecord] {
        &self.billing
    }

    /// Loads the processor feed. Returns the number of records accepted.
    pub fn load_processor_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let mut csv_reader = reader_for(reader);
        let mut accepted = 0;

        for (row_idx, result) in csv_reader.deserialize::<ProcessorRow>().enumerate() {
            let row_num = row_idx + 2; // 1-indexed, accounting for header row

            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|row| row.parse())
                .map_err(|message| ReconError::InvalidRecord { row: row_num, message });
            let record = match parsed {
                Ok(record) => record,
                Err(e) => {
                    warn!("Processor feed: {}", e);
                    continue;
                }
            };

            if !record.is_relevant() {
                debug!(
                    "Processor row {}: charge {} not relevant (status '{}'), skipping",
                    row_num, record.id, record.status
                );
                continue;
            }
            if !self.seen_charges.insert(record.id.clone()) {
                warn!("Processor row {}: Duplicate charge id {}, ignoring", row_num, record.id);
                continue;
            }

            self.processor.push(record);
            accepted += 1;
        }

        info!("Loaded {} processor charges", accepted);
        Ok(accepted)
    }

    /// Loads the billing feed. Returns the number of records accepted.
    pub fn load_billing_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let mut csv_reader = reader_for(reader);
        let mut accepted = 0;

        for (row_idx, result) in csv_reader.deserialize::<BillingRow>().enumerate() {
            let row_num = row_idx + 2;

            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|row| row.parse())
                .map_err(|message| ReconError::InvalidRecord { row: row_num, message });
            let record = match parsed {
                Ok(record) => record,
                Err(e) => {
                    warn!("Billing feed: {}", e);
                    continue;
                }
            };

            if !record.is_relevant() {
                debug!(
                    "Billing row {}: invoice {} not relevant (method '{}', cancelled {}), skipping",
                    row_num,
                    record.invoice,
                    record.payment_method,
                    record.is_cancelled()
                );
                continue;
            }
            if !self.seen_invoices.insert(record.invoice.clone()) {
                warn!("Billing row {}: Duplicate invoice {}, ignoring", row_num, record.invoice);
                continue;
            }

            self.billing.push(record);
            accepted += 1;
        }

        info!("Loaded {} billing invoices", accepted);
        Ok(accepted)
    }

    /// Matches the loaded ledgers into a fresh registry.
    pub fn run(&self) -> ComparisonRegistry {
        let registry = ComparisonRegistry::rebuild(&self.processor, &self.billing, &self.config);
        let stats = registry.statistics();
        info!(
            "Reconciled {} comparisons: {} matched ({:.1}%), {} pending confirmation, {} processor only, {} billing only",
            stats.total,
            stats.matched,
            stats.match_rate(),
            stats.pending_confirmation,
            stats.processor_only,
            stats.billing_only
        );
        registry
    }

    /// Writes the comparison snapshot as CSV.
    ///
    /// Rows are sorted by date, then identity, for reproducible output.
    pub fn write_output<W: Write>(registry: &ComparisonRegistry, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(OUTPUT_HEADER)?;

        let mut comparisons: Vec<_> = registry.comparisons().iter().collect();
        comparisons.sort_by(|a, b| {
            a.date()
                .cmp(&b.date())
                .then_with(|| a.identity_key().cmp(&b.identity_key()))
                .then_with(|| a.key().cmp(&b.key()))
        });

        for comparison in comparisons {
            let processor = comparison.processor();
            let billing = comparison.billing();
            csv_writer.write_record([
                comparison.identity_key(),
                comparison.date().format("%Y-%m-%d").to_string(),
                comparison.amount().to_string(),
                registry.status(comparison).to_string(),
                comparison.confidence().map(|c| c.to_string()).unwrap_or_default(),
                processor.map(|p| p.id.clone()).unwrap_or_default(),
                processor.map(|p| p.net_amount().to_string()).unwrap_or_default(),
                billing.map(|b| b.invoice.clone()).unwrap_or_default(),
                billing.map(|b| b.net_amount().to_string()).unwrap_or_default(),
                comparison.amount_difference().to_string(),
                comparison.is_manually_confirmed().to_string(),
                comparison.is_manually_rejected().to_string(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes statistics as pretty-printed JSON.
    pub fn write_statistics<W: Write>(stats: &Statistics, mut writer: W) -> Result<()> {
        #[derive(Serialize)]
        struct Report<'a> {
            #[serde(flatten)]
            stats: &'a Statistics,
            match_rate: f64,
        }

        serde_json::to_writer_pretty(
            &mut writer,
            &Report {
                stats,
                match_rate: stats.match_rate(),
            },
        )?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

impl Default for ReconEngine {
    fn default() -> Self {
        Self::new(ReconConfig::default())
    }
}

fn reader_for<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader)
}
