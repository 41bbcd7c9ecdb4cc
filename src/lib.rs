//! # Charge Reconciliation
//!
//! Matches charges from a payment processor against invoices from a billing
//! system, classifies every record, and lets an operator correct the result
//! by hand.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: Amounts carry 4 decimal places via `rust_decimal`
//! - **Layered matching**: High, then medium, then low confidence over shrinking pools
//! - **Strict invariants**: Every record appears in exactly one comparison
//! - **Atomic overrides**: Manual changes validate fully before touching the registry
//! - **Deterministic output**: Comparisons sorted by date and identity
//!
//! ## Example
//!
//! ```no_run
//! use charge_recon::{ReconConfig, ReconEngine};
//! use std::io::Cursor;
//!
//! let charges = "id,email,created,amount,status\nch_1,a@x.com,2024-01-10,80.00,succeeded\n";
//! let invoices = "invoice,recipient,document_date,payment_amount,payment_method\nR1,a@x.com,2024-01-12,80.00,token\n";
//!
//! let mut engine = ReconEngine::new(ReconConfig::default());
//! engine.load_processor_csv(Cursor::new(charges)).unwrap();
//! engine.load_billing_csv(Cursor::new(invoices)).unwrap();
//! let registry = engine.run();
//! ReconEngine::write_output(&registry, std::io::stdout()).unwrap();
//! ```

pub mod comparison;
pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod identity;
pub mod matcher;
pub mod money;
pub mod overrides;
pub mod record;
pub mod registry;

pub use comparison::{Comparison, ComparisonKey, ComparisonStatus, Pairing, StatusResolver};
pub use confidence::MatchConfidence;
pub use config::{ReconConfig, Tolerance};
pub use engine::ReconEngine;
pub use error::{OverrideError, ReconError, Result};
pub use filter::{FilterOptions, StatusFilter};
pub use money::Money;
pub use overrides::{ManualOverrideService, MatchOutcome, OverrideWarning};
pub use record::{BillingRecord, ProcessorRecord};
pub use registry::{ComparisonRegistry, Statistics};
