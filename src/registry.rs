//! The current set of comparisons and its read-side views.
//!
//! The registry is rebuilt from scratch by [`ComparisonRegistry::rebuild`]
//! and otherwise changes only through [`ComparisonRegistry::replace`], which
//! swaps whole comparisons atomically.
//!
//! # Invariant
//!
//! No processor id and no invoice number is referenced by more than one
//! comparison. `replace` checks this before mutating.

use crate::comparison::{Comparison, ComparisonKey, ComparisonStatus, StatusResolver};
use crate::confidence::MatchConfidence;
use crate::config::ReconConfig;
use crate::error::OverrideError;
use crate::filter::FilterOptions;
use crate::matcher;
use crate::money::Money;
use crate::record::{BillingRecord, ProcessorRecord};
use log::debug;
use serde::Serialize;
use std::collections::HashSet;

/// Aggregate counts and totals over a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub total: usize,

    pub matched: usize,
    pub processor_only: usize,
    pub billing_only: usize,
    pub amount_mismatch: usize,
    pub manually_rejected: usize,

    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub manual_confidence: usize,

    /// Medium/low pairs not yet confirmed by an operator.
    pub pending_confirmation: usize,

    pub total_processor_amount: Money,
    pub total_billing_amount: Money,

    /// `|total_processor_amount - total_billing_amount|`
    pub total_discrepancy: Money,
}

impl Statistics {
    /// Share of comparisons with status `Match`, in percent.
    pub fn match_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.matched as f64 / self.total as f64 * 100.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComparisonRegistry {
    comparisons: Vec<Comparison>,
    resolver: StatusResolver,
}

impl ComparisonRegistry {
    /// Creates an empty registry.
    pub fn new(resolver: StatusResolver) -> Self {
        ComparisonRegistry {
            comparisons: Vec::new(),
            resolver,
        }
    }

    /// Runs the matcher over both ledgers and returns a fresh registry.
    pub fn rebuild(processor: &[ProcessorRecord], billing: &[BillingRecord], config: &ReconConfig) -> Self {
        ComparisonRegistry {
            comparisons: matcher::reconcile(processor, billing, &config.tolerance()),
            resolver: config.status_resolver(),
        }
    }

    /// Wraps an existing comparison list, enforcing the record-uniqueness invariant.
    pub fn from_comparisons(
        comparisons: Vec<Comparison>,
        resolver: StatusResolver,
    ) -> Result<Self, OverrideError> {
        check_unique(comparisons.iter())?;
        Ok(ComparisonRegistry {
            comparisons,
            resolver,
        })
    }

    pub fn comparisons(&self) -> &[Comparison] {
        &self.comparisons
    }

    pub fn len(&self) -> usize {
        self.comparisons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comparisons.is_empty()
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    pub fn status(&self, comparison: &Comparison) -> ComparisonStatus {
        self.resolver.resolve(comparison)
    }

    pub fn get(&self, key: &ComparisonKey) -> Option<&Comparison> {
        self.comparisons.iter().find(|c| &c.key() == key)
    }

    pub fn contains(&self, key: &ComparisonKey) -> bool {
        self.get(key).is_some()
    }

    /// Atomically removes `removed` and appends `added`.
    ///
    /// Fails with `OperationFailed`, leaving the registry untouched, when a
    /// removed comparison is not present or when the result would reference
    /// a record twice.
    pub fn replace(&mut self, removed: &[Comparison], added: Vec<Comparison>) -> Result<(), OverrideError> {
        let mut removed_keys = HashSet::new();
        for comparison in removed {
            let key = comparison.key();
            if !self.comparisons.contains(comparison) {
                return Err(OverrideError::OperationFailed {
                    reason: format!("comparison {} is no longer in the registry", key),
                });
            }
            if !removed_keys.insert(key.clone()) {
                return Err(OverrideError::OperationFailed {
                    reason: format!("comparison {} removed twice", key),
                });
            }
        }

        let kept = self
            .comparisons
            .iter()
            .filter(|c| !removed_keys.contains(&c.key()));
        check_unique(kept.chain(added.iter()))?;

        debug!(
            "Replacing {} comparisons with {}",
            removed_keys.len(),
            added.len()
        );
        self.comparisons.retain(|c| !removed_keys.contains(&c.key()));
        self.comparisons.extend(added);
        Ok(())
    }

    /// Counts by status and tier plus ledger totals.
    pub fn statistics(&self) -> Statistics {
        let mut stats = Statistics {
            total: self.comparisons.len(),
            ..Statistics::default()
        };

        for comparison in &self.comparisons {
            match self.resolver.resolve(comparison) {
                ComparisonStatus::Match => stats.matched += 1,
                ComparisonStatus::ProcessorOnly => stats.processor_only += 1,
                ComparisonStatus::BillingOnly => stats.billing_only += 1,
                ComparisonStatus::AmountMismatch => stats.amount_mismatch += 1,
                ComparisonStatus::ManuallyRejected => stats.manually_rejected += 1,
            }

            match comparison.confidence() {
                Some(MatchConfidence::High) => stats.high_confidence += 1,
                Some(MatchConfidence::Medium) => stats.medium_confidence += 1,
                Some(MatchConfidence::Low) => stats.low_confidence += 1,
                Some(MatchConfidence::Manual) => stats.manual_confidence += 1,
                None => {}
            }

            if comparison.requires_confirmation() {
                stats.pending_confirmation += 1;
            }
            if let Some(p) = comparison.processor() {
                stats.total_processor_amount += p.net_amount();
            }
            if let Some(b) = comparison.billing() {
                stats.total_billing_amount += b.net_amount();
            }
        }

        stats.total_discrepancy = stats.total_processor_amount.distance(stats.total_billing_amount);
        stats
    }

    /// Read-only view of comparisons satisfying `predicate`.
    pub fn filter<P>(&self, predicate: P) -> Vec<&Comparison>
    where
        P: Fn(&Comparison) -> bool,
    {
        self.comparisons.iter().filter(|c| predicate(c)).collect()
    }

    pub fn with_status(&self, status: ComparisonStatus) -> Vec<&Comparison> {
        self.filter(|c| self.resolver.resolve(c) == status)
    }

    pub fn apply_filters(&self, options: &FilterOptions) -> Vec<&Comparison> {
        self.filter(|c| options.matches(c, &self.resolver))
    }
}

/// Fails if any processor id or invoice number occurs more than once.
fn check_unique<'a, I>(comparisons: I) -> Result<(), OverrideError>
where
    I: IntoIterator<Item = &'a Comparison>,
{
    let mut charges = HashSet::new();
    let mut invoices = HashSet::new();
    for comparison in comparisons {
        if let Some(p) = comparison.processor() {
            if !charges.insert(p.id.as_str()) {
                return Err(OverrideError::OperationFailed {
                    reason: format!("charge {} would be referenced twice", p.id),
                });
            }
        }
        if let Some(b) = comparison.billing() {
            if !invoices.insert(b.invoice.as_str()) {
                return Err(OverrideError::OperationFailed {
                    reason: format!("invoice {} would be referenced twice", b.invoice),
                });
            }
        }
    }
    Ok(())
}
