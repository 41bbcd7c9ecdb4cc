//! Manual override workflow.
//!
//! Operators correct the matcher by selecting comparisons and matching,
//! unmatching, confirming or rejecting them. Every operation validates the
//! whole request first and then applies a single atomic
//! [`ComparisonRegistry::replace`]; a failed request leaves the registry
//! exactly as it was.

use crate::comparison::{Comparison, ComparisonKey, ComparisonStatus, Pairing};
use crate::confidence::MatchConfidence;
use crate::config::ReconConfig;
use crate::error::OverrideError;
use crate::record::{BillingRecord, ProcessorRecord};
use crate::registry::ComparisonRegistry;
use log::{info, warn};
use std::collections::HashSet;
use std::fmt;

/// Non-fatal findings reported alongside a successful manual match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideWarning {
    /// Processor-bearing and billing-bearing entries differ in number; the
    /// excess stays unmatched.
    UnequalCounts { processor: usize, billing: usize },

    /// Entries that were already paired get re-paired.
    AlreadyPaired { count: usize },
}

impl fmt::Display for OverrideWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnequalCounts { processor, billing } => write!(
                f,
                "unequal selection: {} processor and {} billing transactions, the excess stays unmatched",
                processor, billing
            ),
            Self::AlreadyPaired { count } => {
                write!(f, "{} already paired comparisons will be re-paired", count)
            }
        }
    }
}

/// Result of a successful manual match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Comparisons appended to the registry.
    pub created: Vec<Comparison>,
    pub warnings: Vec<OverrideWarning>,
}

impl MatchOutcome {
    pub fn paired_count(&self) -> usize {
        self.created.iter().filter(|c| c.is_paired()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManualOverrideService {
    min_selection: usize,
    max_selection: usize,
}

impl Default for ManualOverrideService {
    fn default() -> Self {
        Self::from_config(&ReconConfig::default())
    }
}

impl ManualOverrideService {
    pub fn new(min_selection: usize, max_selection: usize) -> Self {
        ManualOverrideService {
            min_selection,
            max_selection,
        }
    }

    pub fn from_config(config: &ReconConfig) -> Self {
        Self::new(config.min_selection, config.max_selection)
    }

    /// Checks a match selection and returns the warnings it would raise.
    ///
    /// Order of checks: selection size, presence of both sides, duplicate
    /// records.
    pub fn validate_match(&self, selection: &[Comparison]) -> Result<Vec<OverrideWarning>, OverrideError> {
        let count = selection.len();
        if count < self.min_selection {
            return Err(OverrideError::SelectionTooSmall {
                count,
                min: self.min_selection,
            });
        }
        if count > self.max_selection {
            return Err(OverrideError::SelectionTooLarge {
                count,
                max: self.max_selection,
            });
        }

        let processor_count = selection.iter().filter(|c| c.processor().is_some()).count();
        let billing_count = selection.iter().filter(|c| c.billing().is_some()).count();
        if processor_count == 0 {
            return Err(OverrideError::NoProcessorRecord);
        }
        if billing_count == 0 {
            return Err(OverrideError::NoBillingRecord);
        }

        check_no_duplicates(selection)?;

        let mut warnings = Vec::new();
        if processor_count != billing_count {
            warnings.push(OverrideWarning::UnequalCounts {
                processor: processor_count,
                billing: billing_count,
            });
        }
        let already_paired = selection.iter().filter(|c| c.is_paired()).count();
        if already_paired > 0 {
            warnings.push(OverrideWarning::AlreadyPaired {
                count: already_paired,
            });
        }
        Ok(warnings)
    }

    /// Pairs every record in `selection` by timestamp order.
    ///
    /// Both sides are sorted ascending (processor by creation, billing by
    /// document date) and zipped; the longer side's excess is returned as
    /// single-sided comparisons.
    pub fn plan_match(selection: &[Comparison]) -> Vec<Comparison> {
        let mut processor: Vec<ProcessorRecord> = selection.iter().filter_map(|c| c.processor().cloned()).collect();
        let mut billing: Vec<BillingRecord> = selection.iter().filter_map(|c| c.billing().cloned()).collect();
        processor.sort_by_key(|p| p.created);
        billing.sort_by_key(|b| b.document_date);

        let pairs = processor.len().min(billing.len());
        let excess_processor = processor.split_off(pairs);
        let excess_billing = billing.split_off(pairs);

        let mut planned: Vec<Comparison> = processor
            .into_iter()
            .zip(billing)
            .map(|(p, b)| Comparison::paired(p, b, MatchConfidence::Manual))
            .collect();
        planned.extend(excess_processor.into_iter().map(Comparison::ProcessorOnly));
        planned.extend(excess_billing.into_iter().map(Comparison::BillingOnly));
        planned
    }

    /// Manually matches the selected comparisons.
    pub fn match_selected(
        &self,
        registry: &mut ComparisonRegistry,
        selection: &[Comparison],
    ) -> Result<MatchOutcome, OverrideError> {
        let warnings = self.validate_match(selection)?;
        let created = Self::plan_match(selection);

        registry.replace(selection, created.clone())?;

        for warning in &warnings {
            warn!("Manual match: {}", warning);
        }
        let outcome = MatchOutcome { created, warnings };
        info!(
            "Manually matched {} pairs from {} selected comparisons",
            outcome.paired_count(),
            selection.len()
        );
        Ok(outcome)
    }

    /// Splits fully matched pairs back into single-sided comparisons.
    ///
    /// Only pairs whose status is `Match` qualify; mismatched or rejected
    /// pairs must be handled through a new manual match instead.
    pub fn unmatch_selected(
        &self,
        registry: &mut ComparisonRegistry,
        selection: &[Comparison],
    ) -> Result<Vec<Comparison>, OverrideError> {
        if selection.is_empty() {
            return Err(OverrideError::SelectionTooSmall { count: 0, min: 1 });
        }
        for comparison in selection {
            if !comparison.is_paired() || registry.status(comparison) != ComparisonStatus::Match {
                return Err(OverrideError::NotFullyMatchedForUnmatch {
                    key: comparison.key(),
                });
            }
        }
        check_no_duplicates(selection)?;

        let split: Vec<Comparison> = selection
            .iter()
            .cloned()
            .flat_map(|c| {
                let (processor, billing) = c.into_parts();
                processor
                    .map(Comparison::ProcessorOnly)
                    .into_iter()
                    .chain(billing.map(Comparison::BillingOnly))
            })
            .collect();

        registry.replace(selection, split.clone())?;
        info!("Unmatched {} pairs", selection.len());
        Ok(split)
    }

    /// Marks a pair as confirmed by the operator (clears any rejection).
    pub fn confirm(
        &self,
        registry: &mut ComparisonRegistry,
        key: &ComparisonKey,
    ) -> Result<Comparison, OverrideError> {
        self.review(registry, key, |pair| {
            pair.manually_confirmed = true;
            pair.manually_rejected = false;
        })
    }

    /// Marks a pair as rejected by the operator (clears any confirmation).
    pub fn reject(
        &self,
        registry: &mut ComparisonRegistry,
        key: &ComparisonKey,
    ) -> Result<Comparison, OverrideError> {
        self.review(registry, key, |pair| {
            pair.manually_confirmed = false;
            pair.manually_rejected = true;
        })
    }

    fn review<F>(
        &self,
        registry: &mut ComparisonRegistry,
        key: &ComparisonKey,
        update: F,
    ) -> Result<Comparison, OverrideError>
    where
        F: FnOnce(&mut Pairing),
    {
        let current = registry
            .get(key)
            .cloned()
            .ok_or_else(|| OverrideError::OperationFailed {
                reason: format!("comparison {} is no longer in the registry", key),
            })?;

        let mut pair = match &current {
            Comparison::Paired(pair) => pair.clone(),
            _ => return Err(OverrideError::NotPaired { key: key.clone() }),
        };
        update(&mut pair);
        let updated = Comparison::Paired(pair);

        registry.replace(std::slice::from_ref(&current), vec![updated.clone()])?;
        Ok(updated)
    }
}

fn check_no_duplicates(selection: &[Comparison]) -> Result<(), OverrideError> {
    let mut charges = HashSet::new();
    let mut invoices = HashSet::new();
    for comparison in selection {
        if let Some(p) = comparison.processor() {
            if !charges.insert(p.id.as_str()) {
                return Err(OverrideError::DuplicateRecordInSelection { id: p.id.clone() });
            }
        }
        if let Some(b) = comparison.billing() {
            if !invoices.insert(b.invoice.as_str()) {
                return Err(OverrideError::DuplicateRecordInSelection {
                    id: b.invoice.clone(),
                });
            }
        }
    }
    Ok(())
}
