//! Filter predicates for the record browser
//!
//! A [`FilterSet`] is a value: every edit returns a new set and leaves the
//! receiver untouched. Empty fields mean "no constraint".

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Multi-value fields that can be toggled value by value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterField {
    LicensePrefix,
    Category,
    Color,
    Gate,
}

impl FilterField {
    pub const ALL: [FilterField; 4] = [
        FilterField::LicensePrefix,
        FilterField::Category,
        FilterField::Color,
        FilterField::Gate,
    ];
}

/// Inclusive entry-time window; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Reversed bounds are swapped so that `start <= end` always holds.
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        match (start, end) {
            (Some(s), Some(e)) if s > e => Self { start: Some(e), end: Some(s) },
            _ => Self { start, end },
        }
    }

    /// Whole calendar days in UTC: `start 00:00:00` through `end 23:59:59`.
    pub fn days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let (start, end) = match (start, end) {
            (Some(s), Some(e)) if s > e => (Some(e), Some(s)),
            other => other,
        };
        let at = |day: NaiveDate, h: u32, m: u32, s: u32| {
            NaiveTime::from_hms_opt(h, m, s).map(|t| Utc.from_utc_datetime(&day.and_time(t)))
        };
        Self {
            start: start.and_then(|d| at(d, 0, 0, 0)),
            end: end.and_then(|d| at(d, 23, 59, 59)),
        }
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Every active search and filter predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSet {
    search_term: String,
    date_range: DateRange,
    license_prefixes: BTreeSet<String>,
    categories: BTreeSet<String>,
    colors: BTreeSet<String>,
    gates: BTreeSet<String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_term(&self, term: impl Into<String>) -> Self {
        Self {
            search_term: term.into(),
            ..self.clone()
        }
    }

    pub fn with_date_range(&self, range: DateRange) -> Self {
        Self {
            date_range: range,
            ..self.clone()
        }
    }

    /// Flip membership of `value` in `field`; blank values are ignored.
    pub fn toggle_value(&self, field: FilterField, value: &str) -> Self {
        let value = value.trim();
        let mut next = self.clone();
        if value.is_empty() {
            return next;
        }
        let set = next.values_mut(field);
        if !set.remove(value) {
            set.insert(value.to_string());
        }
        next
    }

    pub fn reset(&self) -> Self {
        Self::default()
    }

    /// Clear prefix/category/color/gate choices, keeping search and dates.
    pub fn without_vehicle_filters(&self) -> Self {
        Self {
            search_term: self.search_term.clone(),
            date_range: self.date_range,
            ..Self::default()
        }
    }

    pub fn without_date_range(&self) -> Self {
        self.with_date_range(DateRange::default())
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Search term with surrounding whitespace removed, `None` when blank
    pub fn effective_search(&self) -> Option<&str> {
        let term = self.search_term.trim();
        (!term.is_empty()).then_some(term)
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn values(&self, field: FilterField) -> &BTreeSet<String> {
        match field {
            FilterField::LicensePrefix => &self.license_prefixes,
            FilterField::Category => &self.categories,
            FilterField::Color => &self.colors,
            FilterField::Gate => &self.gates,
        }
    }

    pub fn contains(&self, field: FilterField, value: &str) -> bool {
        self.values(field).contains(value.trim())
    }

    pub fn is_unconstrained(&self) -> bool {
        self.effective_search().is_none()
            && self.date_range.is_open()
            && FilterField::ALL.iter().all(|f| self.values(*f).is_empty())
    }

    fn values_mut(&mut self, field: FilterField) -> &mut BTreeSet<String> {
        match field {
            FilterField::LicensePrefix => &mut self.license_prefixes,
            FilterField::Category => &mut self.categories,
            FilterField::Color => &mut self.colors,
            FilterField::Gate => &mut self.gates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_toggle_twice_restores_membership() {
        let base = FilterSet::new().toggle_value(FilterField::Color, "Red");

        for field in FilterField::ALL {
            for value in ["Red", "Sedan", "MH"] {
                let twice = base.toggle_value(field, value).toggle_value(field, value);
                assert_eq!(twice, base, "field {:?} value {}", field, value);
            }
        }
    }

    #[test]
    fn test_toggle_does_not_mutate_receiver() {
        let base = FilterSet::new();
        let next = base.toggle_value(FilterField::Gate, "north_in");

        assert!(base.is_unconstrained());
        assert!(next.contains(FilterField::Gate, "north_in"));
    }

    #[test]
    fn test_blank_toggle_is_ignored() {
        let base = FilterSet::new();
        assert_eq!(base.toggle_value(FilterField::Category, "   "), base);
    }

    #[test]
    fn test_equality_is_order_independent() {
        let a = FilterSet::new()
            .toggle_value(FilterField::Category, "Sedan")
            .toggle_value(FilterField::Category, "Truck");
        let b = FilterSet::new()
            .toggle_value(FilterField::Category, "Truck")
            .toggle_value(FilterField::Category, "Sedan");
        assert_eq!(a, b);
    }

    #[test]
    fn test_reversed_date_range_is_swapped() {
        let range = DateRange::days(Some(day(2024, 1, 31)), Some(day(2024, 1, 1)));
        assert!(range.start().unwrap() < range.end().unwrap());
        assert_eq!(range.start().unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_without_vehicle_filters_keeps_search_and_dates() {
        let range = DateRange::days(Some(day(2024, 1, 1)), None);
        let set = FilterSet::new()
            .with_search_term("MH12")
            .with_date_range(range)
            .toggle_value(FilterField::LicensePrefix, "MH")
            .toggle_value(FilterField::Gate, "north_in");

        let cleared = set.without_vehicle_filters();
        assert_eq!(cleared.search_term(), "MH12");
        assert_eq!(cleared.date_range(), range);
        assert!(cleared.values(FilterField::LicensePrefix).is_empty());
        assert!(cleared.values(FilterField::Gate).is_empty());
        assert!(set.reset().is_unconstrained());
    }

    #[test]
    fn test_blank_search_is_unconstrained() {
        let set = FilterSet::new().with_search_term("   ");
        assert_eq!(set.effective_search(), None);
        assert!(set.is_unconstrained());
    }
}
