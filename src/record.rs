//! Source record models for both ledgers.
//!
//! `ProcessorRow` / `BillingRow` are the raw canonical CSV shapes;
//! `ProcessorRecord` / `BillingRecord` are the parsed, immutable records the
//! matcher works on.

use crate::money::Money;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Parses `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` or a bare date
/// (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_money(value: &str) -> Option<Money> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(Money::ZERO);
    }
    Money::from_str(trimmed).ok()
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "yes" | "1" | "y"
    )
}

/// A charge from the payment processor feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessorRecord {
    /// Processor charge id, unique within the feed.
    pub id: String,

    /// Customer email as delivered.
    pub email: String,

    pub created: NaiveDateTime,

    /// Gross charged amount.
    pub amount: Money,

    pub amount_refunded: Money,

    pub currency: String,

    /// Processor status (`succeeded`, `paid`, `failed`, ...).
    pub status: String,

    pub captured: bool,

    pub description: String,
}

impl ProcessorRecord {
    /// Amount net of refunds; this is the amount matched against billing.
    pub fn net_amount(&self) -> Money {
        self.amount - self.amount_refunded
    }

    /// Upstream relevance rule: successful, captured, or still carrying a
    /// positive net amount after refunds.
    pub fn is_relevant(&self) -> bool {
        let status = self.status.trim().to_lowercase();
        if status == "succeeded" || status == "paid" {
            return true;
        }
        if self.captured && self.amount > Money::ZERO {
            return true;
        }
        self.net_amount() > Money::ZERO
    }
}

/// An invoice from the billing feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BillingRecord {
    /// Invoice number, unique within the feed.
    pub invoice: String,

    /// Recipient email as delivered.
    pub recipient: String,

    pub document_date: NaiveDateTime,

    pub booking_date: NaiveDateTime,

    pub gross_amount: Money,

    /// Amount actually collected; this is the amount matched against the processor.
    pub payment_amount: Money,

    pub amount_paid: Money,

    pub open_amount: Money,

    /// Number of the cancelling invoice, if this one was cancelled.
    pub cancellation_invoice: Option<String>,

    pub payment_method: String,

    pub contract: String,
}

impl BillingRecord {
    pub fn net_amount(&self) -> Money {
        self.payment_amount
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_invoice.is_some()
    }

    pub fn is_token_payment(&self) -> bool {
        self.payment_method.trim().eq_ignore_ascii_case("token")
    }

    /// Upstream relevance rule: only non-cancelled token payments are ever
    /// settled through the processor.
    pub fn is_relevant(&self) -> bool {
        self.is_token_payment() && !self.is_cancelled()
    }
}

/// Raw processor row as read from CSV.
#[derive(Debug, Deserialize)]
pub struct ProcessorRow {
    pub id: String,
    pub email: String,
    pub created: String,
    pub amount: String,
    #[serde(default)]
    pub amount_refunded: String,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub captured: String,
    #[serde(default)]
    pub description: String,
}

impl ProcessorRow {
    /// Parses the raw CSV row into a typed record.
    ///
    /// Returns `Err` with a reason when a required field is blank or
    /// malformed.
    pub fn parse(&self) -> Result<ProcessorRecord, String> {
        let id = self.id.trim();
        if id.is_empty() {
            return Err("blank id".to_string());
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(format!("charge {}: blank email", id));
        }
        let created = parse_timestamp(&self.created)
            .ok_or_else(|| format!("charge {}: bad created date '{}'", id, self.created))?;
        let amount = Money::from_str(&self.amount)
            .map_err(|_| format!("charge {}: bad amount '{}'", id, self.amount))?;
        let amount_refunded = parse_money(&self.amount_refunded).ok_or_else(|| {
            format!("charge {}: bad refunded amount '{}'", id, self.amount_refunded)
        })?;

        Ok(ProcessorRecord {
            id: id.to_string(),
            email: email.to_string(),
            created,
            amount,
            amount_refunded,
            currency: self.currency.trim().to_uppercase(),
            status: self.status.trim().to_string(),
            captured: parse_flag(&self.captured),
            description: self.description.trim().to_string(),
        })
    }
}

/// Raw billing row as read from CSV.
#[derive(Debug, Deserialize)]
pub struct BillingRow {
    pub invoice: String,
    pub recipient: String,
    pub document_date: String,
    #[serde(default)]
    pub booking_date: String,
    #[serde(default)]
    pub gross_amount: String,
    pub payment_amount: String,
    #[serde(default)]
    pub amount_paid: String,
    #[serde(default)]
    pub open_amount: String,
    #[serde(default)]
    pub cancellation_invoice: String,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub contract: String,
}

impl BillingRow {
    pub fn parse(&self) -> Result<BillingRecord, String> {
        let invoice = self.invoice.trim();
        if invoice.is_empty() {
            return Err("blank invoice number".to_string());
        }
        let recipient = self.recipient.trim();
        if recipient.is_empty() {
            return Err(format!("invoice {}: blank recipient", invoice));
        }
        let document_date = parse_timestamp(&self.document_date).ok_or_else(|| {
            format!("invoice {}: bad document date '{}'", invoice, self.document_date)
        })?;
        // Booking date falls back to the document date when absent.
        let booking_date = if self.booking_date.trim().is_empty() {
            document_date
        } else {
            parse_timestamp(&self.booking_date).ok_or_else(|| {
                format!("invoice {}: bad booking date '{}'", invoice, self.booking_date)
            })?
        };
        let amount = |field: &str, value: &str| {
            parse_money(value)
                .ok_or_else(|| format!("invoice {}: bad {} '{}'", invoice, field, value))
        };
        let payment_amount = Money::from_str(&self.payment_amount).map_err(|_| {
            format!("invoice {}: bad payment amount '{}'", invoice, self.payment_amount)
        })?;
        let cancellation = self.cancellation_invoice.trim();

        Ok(BillingRecord {
            invoice: invoice.to_string(),
            recipient: recipient.to_string(),
            document_date,
            booking_date,
            gross_amount: amount("gross amount", &self.gross_amount)?,
            payment_amount,
            amount_paid: amount("paid amount", &self.amount_paid)?,
            open_amount: amount("open amount", &self.open_amount)?,
            cancellation_invoice: (!cancellation.is_empty()).then(|| cancellation.to_string()),
            payment_method: self.payment_method.trim().to_string(),
            contract: self.contract.trim().to_string(),
        })
    }
}
