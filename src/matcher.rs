//! Three-tier greedy matcher.
//!
//! Records are grouped into buckets by normalized identity. Inside each
//! bucket three layers run in order, each consuming from the pools the
//! previous layer left behind:
//!
//! 1. **High**: amount within tolerance, date within window.
//! 2. **Medium**: as High, plus equal derived names.
//! 3. **Low**: amount and date window only.
//!
//! Processor records are visited in input order and each claims the
//! closest-dated eligible billing record. Earlier claims are never revisited,
//! so the result is deterministic rather than globally optimal.

use crate::comparison::{Comparison, Pairing};
use crate::confidence::MatchConfidence;
use crate::config::Tolerance;
use crate::identity::{derive_name, normalize};
use crate::record::{BillingRecord, ProcessorRecord};
use chrono::{Duration, NaiveDateTime};
use log::{debug, info};
use std::collections::HashMap;

/// Records of both ledgers sharing one identity key.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub key: String,
    pub processor: Vec<ProcessorRecord>,
    pub billing: Vec<BillingRecord>,
}

/// Result of one matching layer: pairs formed plus the shrunk pools.
#[derive(Debug, Clone, Default)]
pub struct LayerOutput {
    pub pairs: Vec<Pairing>,
    pub processor: Vec<ProcessorRecord>,
    pub billing: Vec<BillingRecord>,
}

/// Absolute distance between two timestamps.
pub fn date_distance(a: NaiveDateTime, b: NaiveDateTime) -> Duration {
    let delta = a - b;
    if delta < Duration::zero() {
        -delta
    } else {
        delta
    }
}

/// Groups both ledgers by normalized identity.
///
/// Buckets appear in first-seen order: processor keys first, then keys that
/// only occur on the billing side.
pub fn group_by_identity(processor: &[ProcessorRecord], billing: &[BillingRecord]) -> Vec<Bucket> {
    let mut buckets: Vec<Bucket> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let mut slot = |key: String, buckets: &mut Vec<Bucket>| -> usize {
        *index.entry(key.clone()).or_insert_with(|| {
            buckets.push(Bucket {
                key,
                ..Bucket::default()
            });
            buckets.len() - 1
        })
    };

    for record in processor {
        let i = slot(normalize(&record.email), &mut buckets);
        buckets[i].processor.push(record.clone());
    }
    for record in billing {
        let i = slot(normalize(&record.recipient), &mut buckets);
        buckets[i].billing.push(record.clone());
    }

    buckets
}

/// Index of the closest-dated billing record that passes the amount
/// tolerance, the date window and `eligible`.
///
/// Equal distances resolve to the earliest record in the pool.
fn closest_candidate<F>(
    record: &ProcessorRecord,
    pool: &[BillingRecord],
    tolerance: &Tolerance,
    eligible: &F,
) -> Option<usize>
where
    F: Fn(&ProcessorRecord, &BillingRecord) -> bool,
{
    let amount = record.net_amount();
    pool.iter()
        .enumerate()
        .filter(|(_, b)| amount.within(b.net_amount(), tolerance.amount))
        .filter(|(_, b)| eligible(record, b))
        .map(|(i, b)| (i, date_distance(record.created, b.document_date)))
        .min_by_key(|(_, distance)| *distance)
        .filter(|(_, distance)| *distance <= tolerance.date_window)
        .map(|(i, _)| i)
}

fn match_layer<F>(
    processor: Vec<ProcessorRecord>,
    mut billing: Vec<BillingRecord>,
    tolerance: &Tolerance,
    confidence: MatchConfidence,
    eligible: F,
) -> LayerOutput
where
    F: Fn(&ProcessorRecord, &BillingRecord) -> bool,
{
    let mut pairs = Vec::new();
    let mut unmatched = Vec::new();

    for record in processor {
        match closest_candidate(&record, &billing, tolerance, &eligible) {
            Some(idx) => {
                let candidate = billing.remove(idx);
                debug!(
                    "Paired charge {} with invoice {} at {} confidence",
                    record.id, candidate.invoice, confidence
                );
                pairs.push(Pairing::new(record, candidate, confidence));
            }
            None => unmatched.push(record),
        }
    }

    LayerOutput {
        pairs,
        processor: unmatched,
        billing,
    }
}

/// High-confidence layer. Callers pass pools from a single bucket, so the
/// identity already agrees and is not re-checked.
pub fn match_high(
    processor: Vec<ProcessorRecord>,
    billing: Vec<BillingRecord>,
    tolerance: &Tolerance,
) -> LayerOutput {
    match_layer(processor, billing, tolerance, MatchConfidence::High, |_, _| true)
}

/// Medium-confidence layer: derived names must be present and equal.
pub fn match_medium(
    processor: Vec<ProcessorRecord>,
    billing: Vec<BillingRecord>,
    tolerance: &Tolerance,
) -> LayerOutput {
    match_layer(processor, billing, tolerance, MatchConfidence::Medium, |a, b| {
        match derive_name(&a.email) {
            Some(name) => derive_name(&b.recipient).as_deref() == Some(name.as_str()),
            None => false,
        }
    })
}

/// Low-confidence layer: amount and date window only.
pub fn match_low(
    processor: Vec<ProcessorRecord>,
    billing: Vec<BillingRecord>,
    tolerance: &Tolerance,
) -> LayerOutput {
    match_layer(processor, billing, tolerance, MatchConfidence::Low, |_, _| true)
}

/// Runs all three layers over one bucket.
///
/// Output order: high, medium and low pairs, then processor-only, then
/// billing-only records.
pub fn match_bucket(bucket: Bucket, tolerance: &Tolerance) -> Vec<Comparison> {
    let high = match_high(bucket.processor, bucket.billing, tolerance);
    let medium = match_medium(high.processor, high.billing, tolerance);
    let low = match_low(medium.processor, medium.billing, tolerance);

    high.pairs
        .into_iter()
        .chain(medium.pairs)
        .chain(low.pairs)
        .map(Comparison::Paired)
        .chain(low.processor.into_iter().map(Comparison::ProcessorOnly))
        .chain(low.billing.into_iter().map(Comparison::BillingOnly))
        .collect()
}

/// Builds the full comparison set from both ledgers.
///
/// Absence of a match is a normal outcome; this never fails.
pub fn reconcile(
    processor: &[ProcessorRecord],
    billing: &[BillingRecord],
    tolerance: &Tolerance,
) -> Vec<Comparison> {
    let buckets = group_by_identity(processor, billing);
    let bucket_count = buckets.len();

    let comparisons: Vec<Comparison> = buckets
        .into_iter()
        .flat_map(|bucket| match_bucket(bucket, tolerance))
        .collect();

    let paired = comparisons.iter().filter(|c| c.is_paired()).count();
    info!(
        "Matched {} of {} charges against {} invoices across {} identities",
        paired,
        processor.len(),
        billing.len(),
        bucket_count
    );

    comparisons
}
