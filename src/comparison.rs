//! Comparison model and status resolution.
//!
//! A [`Comparison`] is the unit of reconciliation output. It is a tagged
//! union, so a comparison with neither side cannot be represented.
//!
//! # Derived values
//!
//! Identity, date and amount mirror the processor side when present and the
//! billing side otherwise. The amount difference (processor minus billing)
//! is zero unless both sides are present. Status is never stored; it is
//! recomputed from current values by [`StatusResolver`].

use crate::confidence::MatchConfidence;
use crate::identity;
use crate::money::Money;
use crate::record::{BillingRecord, ProcessorRecord};
use chrono::{Duration, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// Display status of a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Match,
    ProcessorOnly,
    BillingOnly,
    AmountMismatch,
    ManuallyRejected,
}

impl ComparisonStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Match => "match",
            Self::ProcessorOnly => "processor_only",
            Self::BillingOnly => "billing_only",
            Self::AmountMismatch => "amount_mismatch",
            Self::ManuallyRejected => "manually_rejected",
        }
    }
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a comparison by the records it references.
///
/// Record ids never repeat within a registry, so the key is unique there.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComparisonKey {
    pub processor_id: Option<String>,
    pub invoice: Option<String>,
}

impl fmt::Display for ComparisonKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} / {}]",
            self.processor_id.as_deref().unwrap_or("-"),
            self.invoice.as_deref().unwrap_or("-")
        )
    }
}

/// Both sides of a paired comparison plus operator review flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pairing {
    pub processor: ProcessorRecord,
    pub billing: BillingRecord,
    pub confidence: MatchConfidence,
    pub manually_confirmed: bool,
    pub manually_rejected: bool,
}

impl Pairing {
    pub fn new(processor: ProcessorRecord, billing: BillingRecord, confidence: MatchConfidence) -> Self {
        Pairing {
            processor,
            billing,
            confidence,
            manually_confirmed: false,
            manually_rejected: false,
        }
    }

    /// Processor net amount minus billing payment amount.
    pub fn amount_difference(&self) -> Money {
        self.processor.net_amount() - self.billing.net_amount()
    }

    /// Processor timestamp minus billing document timestamp.
    pub fn date_offset(&self) -> Duration {
        self.processor.created - self.billing.document_date
    }
}

/// A reconciliation unit: one record from either ledger, or a pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    ProcessorOnly(ProcessorRecord),
    BillingOnly(BillingRecord),
    Paired(Pairing),
}

impl Comparison {
    pub fn paired(processor: ProcessorRecord, billing: BillingRecord, confidence: MatchConfidence) -> Self {
        Comparison::Paired(Pairing::new(processor, billing, confidence))
    }

    pub fn processor(&self) -> Option<&ProcessorRecord> {
        match self {
            Comparison::ProcessorOnly(p) => Some(p),
            Comparison::Paired(pair) => Some(&pair.processor),
            Comparison::BillingOnly(_) => None,
        }
    }

    pub fn billing(&self) -> Option<&BillingRecord> {
        match self {
            Comparison::BillingOnly(b) => Some(b),
            Comparison::Paired(pair) => Some(&pair.billing),
            Comparison::ProcessorOnly(_) => None,
        }
    }

    pub fn pairing(&self) -> Option<&Pairing> {
        match self {
            Comparison::Paired(pair) => Some(pair),
            _ => None,
        }
    }

    pub fn is_paired(&self) -> bool {
        matches!(self, Comparison::Paired(_))
    }

    pub fn key(&self) -> ComparisonKey {
        ComparisonKey {
            processor_id: self.processor().map(|p| p.id.clone()),
            invoice: self.billing().map(|b| b.invoice.clone()),
        }
    }

    /// Identity as delivered by the source that leads this comparison.
    pub fn identity(&self) -> &str {
        match self {
            Comparison::ProcessorOnly(p) => &p.email,
            Comparison::BillingOnly(b) => &b.recipient,
            Comparison::Paired(pair) => &pair.processor.email,
        }
    }

    pub fn identity_key(&self) -> String {
        identity::normalize(self.identity())
    }

    pub fn date(&self) -> NaiveDateTime {
        match self {
            Comparison::ProcessorOnly(p) => p.created,
            Comparison::BillingOnly(b) => b.document_date,
            Comparison::Paired(pair) => pair.processor.created,
        }
    }

    pub fn amount(&self) -> Money {
        match self {
            Comparison::ProcessorOnly(p) => p.net_amount(),
            Comparison::BillingOnly(b) => b.net_amount(),
            Comparison::Paired(pair) => pair.processor.net_amount(),
        }
    }

    pub fn amount_difference(&self) -> Money {
        self.pairing()
            .map(Pairing::amount_difference)
            .unwrap_or(Money::ZERO)
    }

    pub fn confidence(&self) -> Option<MatchConfidence> {
        self.pairing().map(|pair| pair.confidence)
    }

    pub fn is_manually_confirmed(&self) -> bool {
        self.pairing().map_or(false, |pair| pair.manually_confirmed)
    }

    pub fn is_manually_rejected(&self) -> bool {
        self.pairing().map_or(false, |pair| pair.manually_rejected)
    }

    /// Medium and low confidence pairs stay pending until confirmed.
    pub fn requires_confirmation(&self) -> bool {
        self.pairing()
            .map_or(false, |pair| pair.confidence.requires_confirmation() && !pair.manually_confirmed)
    }

    /// Human label: processor customer description, then billing contract,
    /// then the identity itself.
    pub fn display_name(&self) -> &str {
        if let Some(p) = self.processor() {
            if !p.description.is_empty() {
                return &p.description;
            }
        }
        if let Some(b) = self.billing() {
            if !b.contract.is_empty() {
                return &b.contract;
            }
        }
        self.identity()
    }

    /// Splits the comparison back into its records.
    pub fn into_parts(self) -> (Option<ProcessorRecord>, Option<BillingRecord>) {
        match self {
            Comparison::ProcessorOnly(p) => (Some(p), None),
            Comparison::BillingOnly(b) => (None, Some(b)),
            Comparison::Paired(pair) => (Some(pair.processor), Some(pair.billing)),
        }
    }
}

/// Computes display status from a comparison's current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusResolver {
    amount_mismatch_tolerance: Money,
}

impl StatusResolver {
    pub fn new(amount_mismatch_tolerance: Money) -> Self {
        StatusResolver {
            amount_mismatch_tolerance,
        }
    }

    pub fn tolerance(&self) -> Money {
        self.amount_mismatch_tolerance
    }

    /// Rejection takes precedence over an amount mismatch.
    pub fn resolve(&self, comparison: &Comparison) -> ComparisonStatus {
        match comparison {
            Comparison::ProcessorOnly(_) => ComparisonStatus::ProcessorOnly,
            Comparison::BillingOnly(_) => ComparisonStatus::BillingOnly,
            Comparison::Paired(pair) if pair.manually_rejected => ComparisonStatus::ManuallyRejected,
            Comparison::Paired(pair) if pair.amount_difference().abs() > self.amount_mismatch_tolerance => {
                ComparisonStatus::AmountMismatch
            }
            Comparison::Paired(_) => ComparisonStatus::Match,
        }
    }
}

impl Default for StatusResolver {
    fn default() -> Self {
        Self::new(Money::CENT)
    }
}
