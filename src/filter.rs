//! Operator-facing filter criteria.
//!
//! Every criterion that is set must hold. Filters never mutate the registry.

use crate::comparison::{Comparison, ComparisonStatus, StatusResolver};
use crate::confidence::MatchConfidence;
use crate::money::Money;
use chrono::{Datelike, NaiveDate};

/// Predefined status views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    OnlyMatches,
    /// Everything that is not a clean `Match`.
    OnlyProblems,
    ProcessorOnly,
    BillingOnly,
    AmountMismatch,
    ManuallyRejected,
    /// Operator-created pairs and confirmed automatic pairs.
    ManuallyConfirmed,
}

impl StatusFilter {
    pub fn matches(self, comparison: &Comparison, status: ComparisonStatus) -> bool {
        match self {
            Self::All => true,
            Self::OnlyMatches => status == ComparisonStatus::Match,
            Self::OnlyProblems => status != ComparisonStatus::Match,
            Self::ProcessorOnly => status == ComparisonStatus::ProcessorOnly,
            Self::BillingOnly => status == ComparisonStatus::BillingOnly,
            Self::AmountMismatch => status == ComparisonStatus::AmountMismatch,
            Self::ManuallyRejected => status == ComparisonStatus::ManuallyRejected,
            Self::ManuallyConfirmed => {
                comparison.confidence() == Some(MatchConfidence::Manual)
                    || comparison.is_manually_confirmed()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    /// Case-insensitive substring of identity, display name or status label.
    /// The label matches with either spaces or underscores (`processor only`).
    pub search_text: Option<String>,

    /// Case-insensitive identity equality.
    pub customer: Option<String>,

    /// Calendar month (1-12), independent of `year`.
    pub month: Option<u32>,

    pub year: Option<i32>,

    /// Inclusive range; ignored while `month` or `year` is set.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    pub status: StatusFilter,

    /// Bounds on the absolute amount.
    pub min_amount: Option<Money>,
    pub max_amount: Option<Money>,
}

impl FilterOptions {
    pub fn has_any_filter(&self) -> bool {
        self.search_text.as_deref().map_or(false, |s| !s.trim().is_empty())
            || self.customer.as_deref().map_or(false, |s| !s.trim().is_empty())
            || self.month.is_some()
            || self.year.is_some()
            || self.start_date.is_some()
            || self.end_date.is_some()
            || self.status != StatusFilter::All
            || self.min_amount.is_some()
            || self.max_amount.is_some()
    }

    pub fn clear(&mut self) {
        *self = FilterOptions::default();
    }

    pub fn matches(&self, comparison: &Comparison, resolver: &StatusResolver) -> bool {
        let status = resolver.resolve(comparison);
        let date = comparison.date().date();
        let amount = comparison.amount().abs();

        if let Some(text) = self.search_text.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = text.to_lowercase();
            let hit = comparison.identity().to_lowercase().contains(&needle)
                || comparison.display_name().to_lowercase().contains(&needle)
                || status.as_str().contains(&needle)
                || status.as_str().replace('_', " ").contains(&needle);
            if !hit {
                return false;
            }
        }

        if let Some(customer) = self.customer.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            if comparison.identity().trim().to_lowercase() != customer.to_lowercase() {
                return false;
            }
        }

        if self.month.map_or(false, |m| date.month() != m) {
            return false;
        }
        if self.year.map_or(false, |y| date.year() != y) {
            return false;
        }

        if self.month.is_none() && self.year.is_none() {
            if self.start_date.map_or(false, |start| date < start) {
                return false;
            }
            if self.end_date.map_or(false, |end| date > end) {
                return false;
            }
        }

        if !self.status.matches(comparison, status) {
            return false;
        }

        if self.min_amount.map_or(false, |min| amount < min) {
            return false;
        }
        if self.max_amount.map_or(false, |max| amount > max) {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparison::fixtures::{billing, processor};
    use std::str::FromStr;

    fn sample() -> Vec<Comparison> {
        let mut described = processor("1", "Anna@x.com", "80.00", "2024-01-10");
        described.description = "Anna Schmidt".to_string();
        vec![
            Comparison::paired(
                described,
                billing("R1", "anna@x.com", "80.00", "2024-01-12"),
                MatchConfidence::High,
            ),
            Comparison::ProcessorOnly(processor("2", "bob@x.com", "-15.00", "2024-02-03")),
            Comparison::BillingOnly(billing("R2", "carl@x.com", "300.00", "2023-12-30")),
            Comparison::paired(
                processor("3", "dora@x.com", "20.00", "2024-02-20"),
                billing("R3", "dora@x.com", "25.00", "2024-02-20"),
                MatchConfidence::Manual,
            ),
        ]
    }

    fn hits(options: &FilterOptions) -> Vec<String> {
        let resolver = StatusResolver::default();
        sample()
            .iter()
            .filter(|c| options.matches(c, &resolver))
            .map(|c| c.key().to_string())
            .collect()
    }

    #[test]
    fn test_no_filter_matches_everything() {
        let options = FilterOptions::default();
        assert!(!options.has_any_filter());
        assert_eq!(hits(&options).len(), 4);
    }

    #[test]
    fn test_search_text_covers_display_name_and_status() {
        let by_name = FilterOptions {
            search_text: Some("schmidt".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&by_name), vec!["[1 / R1]"]);

        let by_status = FilterOptions {
            search_text: Some("mismatch".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&by_status), vec!["[3 / R3]"]);
    }

    #[test]
    fn test_search_text_matches_spaced_status_label() {
        let spaced = FilterOptions {
            search_text: Some("Processor Only".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&spaced), vec!["[2 / -]"]);

        let padded = FilterOptions {
            search_text: Some(" amount mismatch ".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&padded), vec!["[3 / R3]"]);
    }

    #[test]
    fn test_customer_is_case_insensitive() {
        let options = FilterOptions {
            customer: Some("ANNA@X.COM".to_string()),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&options), vec!["[1 / R1]"]);
    }

    #[test]
    fn test_month_and_year_are_independent() {
        let february = FilterOptions {
            month: Some(2),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&february).len(), 2);

        let year_2023 = FilterOptions {
            year: Some(2023),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&year_2023), vec!["[- / R2]"]);
    }

    #[test]
    fn test_date_range_ignored_when_month_set() {
        let options = FilterOptions {
            month: Some(1),
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&options), vec!["[1 / R1]"]);

        let range_only = FilterOptions {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 3),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&range_only), vec!["[1 / R1]", "[2 / -]"]);
    }

    #[test]
    fn test_status_views() {
        let problems = FilterOptions {
            status: StatusFilter::OnlyProblems,
            ..FilterOptions::default()
        };
        assert_eq!(hits(&problems).len(), 3);

        let confirmed = FilterOptions {
            status: StatusFilter::ManuallyConfirmed,
            ..FilterOptions::default()
        };
        assert_eq!(hits(&confirmed), vec!["[3 / R3]"]);
    }

    #[test]
    fn test_amount_bounds_use_absolute_value() {
        let options = FilterOptions {
            min_amount: Some(Money::from_str("15").unwrap()),
            max_amount: Some(Money::from_str("80").unwrap()),
            ..FilterOptions::default()
        };
        assert_eq!(hits(&options), vec!["[1 / R1]", "[2 / -]", "[3 / R3]"]);
    }

    #[test]
    fn test_clear_resets() {
        let mut options = FilterOptions {
            year: Some(2024),
            status: StatusFilter::BillingOnly,
            ..FilterOptions::default()
        };
        assert!(options.has_any_filter());
        options.clear();
        assert!(!options.has_any_filter());
    }
}
