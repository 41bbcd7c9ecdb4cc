//! Library-level reconciliation tests.
//!
//! Drives the public API end to end: CSV load, matching, manual overrides
//! and filtering.

use charge_recon::{
    Comparison, ComparisonRegistry, ComparisonStatus, FilterOptions, ManualOverrideService,
    MatchConfidence, OverrideError, OverrideWarning, ReconConfig, ReconEngine, StatusFilter,
};
use std::collections::HashSet;
use std::io::Cursor;

const PROCESSOR_HEADER: &str = "id,email,created,amount,amount_refunded,currency,status,captured,description";
const BILLING_HEADER: &str = "invoice,recipient,document_date,booking_date,gross_amount,payment_amount,amount_paid,open_amount,cancellation_invoice,payment_method,contract";

fn charge(id: &str, email: &str, amount: &str, created: &str) -> String {
    format!("{},{},{},{},0,eur,succeeded,true,", id, email, created, amount)
}

fn invoice(number: &str, recipient: &str, amount: &str, date: &str) -> String {
    format!("{},{},{},,{},{},{},0,,token,", number, recipient, date, amount, amount, amount)
}

fn load(config: ReconConfig, charges: &[String], invoices: &[String]) -> ReconEngine {
    let processor = format!("{}\n{}\n", PROCESSOR_HEADER, charges.join("\n"));
    let billing = format!("{}\n{}\n", BILLING_HEADER, invoices.join("\n"));

    let mut engine = ReconEngine::new(config);
    engine.load_processor_csv(Cursor::new(processor)).unwrap();
    engine.load_billing_csv(Cursor::new(billing)).unwrap();
    engine
}

fn reconcile(charges: &[String], invoices: &[String]) -> ComparisonRegistry {
    load(ReconConfig::default(), charges, invoices).run()
}

fn find<'a>(registry: &'a ComparisonRegistry, id: &str) -> &'a Comparison {
    registry
        .comparisons()
        .iter()
        .find(|c| c.processor().map(|p| p.id.as_str()) == Some(id) || c.billing().map(|b| b.invoice.as_str()) == Some(id))
        .unwrap()
}

fn assert_each_record_once(registry: &ComparisonRegistry, charges: usize, invoices: usize) {
    let mut processor_ids = HashSet::new();
    let mut invoice_ids = HashSet::new();
    for comparison in registry.comparisons() {
        if let Some(p) = comparison.processor() {
            assert!(processor_ids.insert(p.id.clone()), "charge {} referenced twice", p.id);
        }
        if let Some(b) = comparison.billing() {
            assert!(invoice_ids.insert(b.invoice.clone()), "invoice {} referenced twice", b.invoice);
        }
    }
    assert_eq!(processor_ids.len(), charges);
    assert_eq!(invoice_ids.len(), invoices);
}

// =============================================================================
// AUTOMATIC MATCHING
// =============================================================================

#[test]
fn test_single_pair_within_window_is_high() {
    let registry = reconcile(
        &[charge("1", "a@x.com", "80.00", "2024-01-10")],
        &[invoice("R1", "a@x.com", "80.00", "2024-01-12")],
    );

    assert_eq!(registry.len(), 1);
    let pair = &registry.comparisons()[0];
    assert_eq!(pair.confidence(), Some(MatchConfidence::High));
    assert!(pair.amount_difference().is_zero());
    assert_eq!(registry.status(pair), ComparisonStatus::Match);
}

#[test]
fn test_gap_beyond_window_leaves_both_unmatched() {
    let registry = reconcile(
        &[charge("1", "a@x.com", "80.00", "2024-01-10")],
        &[invoice("R1", "a@x.com", "80.00", "2024-02-18")],
    );

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.status(find(&registry, "1")), ComparisonStatus::ProcessorOnly);
    assert_eq!(registry.status(find(&registry, "R1")), ComparisonStatus::BillingOnly);
}

#[test]
fn test_window_and_tolerance_are_inclusive() {
    let registry = reconcile(
        &[charge("1", "a@x.com", "80.00", "2024-01-10")],
        &[invoice("R1", "a@x.com", "80.01", "2024-01-17")],
    );

    assert_eq!(registry.len(), 1);
    assert!(registry.comparisons()[0].is_paired());
}

#[test]
fn test_identity_is_case_and_space_insensitive() {
    let registry = reconcile(
        &[charge("1", " Anna@Example.COM", "12.00", "2024-05-01")],
        &[invoice("R1", "anna@example.com ", "12.00", "2024-05-01")],
    );

    assert_eq!(registry.len(), 1);
    assert!(registry.comparisons()[0].is_paired());
}

#[test]
fn test_closest_date_wins_when_amounts_tie() {
    let registry = reconcile(
        &[charge("1", "a@x.com", "20.00", "2024-03-10")],
        &[
            invoice("R-far", "a@x.com", "20.00", "2024-03-15"),
            invoice("R-near", "a@x.com", "20.00", "2024-03-11"),
        ],
    );

    let pair = find(&registry, "1");
    assert_eq!(pair.billing().unwrap().invoice, "R-near");
    assert_eq!(registry.status(find(&registry, "R-far")), ComparisonStatus::BillingOnly);
}

#[test]
fn test_records_never_cross_identities() {
    let registry = reconcile(
        &[charge("1", "a@x.com", "20.00", "2024-03-10")],
        &[invoice("R1", "b@x.com", "20.00", "2024-03-10")],
    );

    assert_eq!(registry.len(), 2);
    assert!(registry.comparisons().iter().all(|c| !c.is_paired()));
}

#[test]
fn test_every_record_appears_exactly_once() {
    let charges: Vec<String> = (0..12)
        .map(|i| {
            charge(
                &format!("ch_{}", i),
                &format!("user{}@x.com", i % 4),
                &format!("{}.00", 10 + (i % 3) * 5),
                &format!("2024-01-{:02}", 1 + i * 2),
            )
        })
        .collect();
    let invoices: Vec<String> = (0..9)
        .map(|i| {
            invoice(
                &format!("R{}", i),
                &format!("USER{}@x.com", i % 3),
                &format!("{}.00", 10 + (i % 3) * 5),
                &format!("2024-01-{:02}", 2 + i * 3),
            )
        })
        .collect();

    let registry = reconcile(&charges, &invoices);
    assert_each_record_once(&registry, 12, 9);
}

#[test]
fn test_status_is_stable_across_reads() {
    let registry = reconcile(
        &[charge("1", "a@x.com", "80.00", "2024-01-10")],
        &[invoice("R1", "a@x.com", "80.00", "2024-01-12")],
    );
    let first: Vec<_> = registry.comparisons().iter().map(|c| registry.status(c)).collect();
    let second: Vec<_> = registry.comparisons().iter().map(|c| registry.status(c)).collect();
    assert_eq!(first, second);
    assert_eq!(registry.statistics(), registry.statistics());
}

#[test]
fn test_separate_mismatch_tolerance() {
    let config = ReconConfig::from_toml("amount_tolerance = \"1.00\"").unwrap();
    let registry = load(
        config,
        &[charge("1", "a@x.com", "10.00", "2024-01-10")],
        &[invoice("R1", "a@x.com", "10.50", "2024-01-10")],
    )
    .run();

    let pair = find(&registry, "1");
    assert!(pair.is_paired());
    assert_eq!(registry.status(pair), ComparisonStatus::AmountMismatch);
    assert_eq!(registry.statistics().amount_mismatch, 1);
}

// =============================================================================
// MANUAL OVERRIDES
// =============================================================================

#[test]
fn test_manual_match_with_unequal_counts() {
    let mut registry = reconcile(
        &[
            charge("1", "a@x.com", "10.00", "2024-01-01"),
            charge("2", "b@x.com", "20.00", "2024-01-05"),
        ],
        &[invoice("R1", "c@x.com", "10.00", "2024-01-02")],
    );
    let selection = registry.comparisons().to_vec();

    let outcome = ManualOverrideService::default()
        .match_selected(&mut registry, &selection)
        .unwrap();

    assert_eq!(outcome.paired_count(), 1);
    assert_eq!(
        outcome.warnings,
        vec![OverrideWarning::UnequalCounts { processor: 2, billing: 1 }]
    );

    // Earliest charge pairs with earliest invoice.
    let pair = find(&registry, "1");
    assert_eq!(pair.confidence(), Some(MatchConfidence::Manual));
    assert_eq!(pair.billing().unwrap().invoice, "R1");
    assert_eq!(registry.status(find(&registry, "2")), ComparisonStatus::ProcessorOnly);
    assert_each_record_once(&registry, 2, 1);
}

#[test]
fn test_unmatch_of_single_sided_is_rejected() {
    let mut registry = reconcile(
        &[charge("1", "a@x.com", "10.00", "2024-01-01")],
        &[invoice("R1", "z@x.com", "99.00", "2024-06-01")],
    );
    let before = registry.comparisons().to_vec();
    let target = find(&registry, "1").clone();

    let err = ManualOverrideService::default()
        .unmatch_selected(&mut registry, &[target.clone()])
        .unwrap_err();

    assert_eq!(err, OverrideError::NotFullyMatchedForUnmatch { key: target.key() });
    assert_eq!(registry.comparisons(), before.as_slice());
}

#[test]
fn test_match_then_unmatch_restores_split() {
    let mut registry = reconcile(
        &[charge("1", "a@x.com", "10.00", "2024-01-01")],
        &[invoice("R1", "z@x.com", "10.00", "2024-01-01")],
    );
    let service = ManualOverrideService::default();
    let selection = registry.comparisons().to_vec();

    let outcome = service.match_selected(&mut registry, &selection).unwrap();
    assert_eq!(registry.len(), 1);

    let split = service.unmatch_selected(&mut registry, &outcome.created).unwrap();
    assert_eq!(split.len(), 2);

    let mut after: Vec<_> = registry.comparisons().iter().map(|c| c.key()).collect();
    let mut original: Vec<_> = selection.iter().map(|c| c.key()).collect();
    after.sort();
    original.sort();
    assert_eq!(after, original);
}

#[test]
fn test_stale_selection_fails_atomically() {
    let mut registry = reconcile(
        &[charge("1", "a@x.com", "10.00", "2024-01-01")],
        &[invoice("R1", "z@x.com", "10.00", "2024-01-01")],
    );
    let service = ManualOverrideService::default();
    let selection = registry.comparisons().to_vec();
    service.match_selected(&mut registry, &selection).unwrap();
    let before = registry.comparisons().to_vec();

    // Same selection again: those comparisons no longer exist.
    let err = service.match_selected(&mut registry, &selection).unwrap_err();
    assert!(matches!(err, OverrideError::OperationFailed { .. }));
    assert_eq!(registry.comparisons(), before.as_slice());
}

#[test]
fn test_reject_then_confirm() {
    let mut registry = reconcile(
        &[charge("1", "a@x.com", "80.00", "2024-01-10")],
        &[invoice("R1", "a@x.com", "80.00", "2024-01-12")],
    );
    let service = ManualOverrideService::default();
    let key = registry.comparisons()[0].key();

    let rejected = service.reject(&mut registry, &key).unwrap();
    assert_eq!(registry.status(&rejected), ComparisonStatus::ManuallyRejected);
    assert_eq!(registry.statistics().manually_rejected, 1);

    let confirmed = service.confirm(&mut registry, &key).unwrap();
    assert!(confirmed.is_manually_confirmed());
    assert_eq!(registry.status(&confirmed), ComparisonStatus::Match);
    assert_eq!(registry.len(), 1);
}

// =============================================================================
// FILTERING
// =============================================================================

#[test]
fn test_filters_over_reconciled_registry() {
    let registry = reconcile(
        &[
            charge("1", "a@x.com", "80.00", "2024-01-10"),
            charge("2", "b@x.com", "15.00", "2024-02-10"),
        ],
        &[
            invoice("R1", "a@x.com", "80.00", "2024-01-12"),
            invoice("R2", "c@x.com", "300.00", "2024-02-11"),
        ],
    );

    let problems = FilterOptions {
        status: StatusFilter::OnlyProblems,
        ..FilterOptions::default()
    };
    assert_eq!(registry.apply_filters(&problems).len(), 2);

    let february_problems = FilterOptions {
        month: Some(2),
        status: StatusFilter::OnlyProblems,
        search_text: Some("processor".to_string()),
        ..FilterOptions::default()
    };
    let hits = registry.apply_filters(&february_problems);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].processor().unwrap().id, "2");
}
