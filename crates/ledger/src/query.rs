//! Movement listing: filters and the snapshot sequence returned to callers.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::employee::EmployeeId;
use crate::error::LedgerError;
use crate::movement::{Movement, MovementKind};
use crate::product::{ProductCategory, ProductId};

/// Inclusive range of effective dates. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<Self, LedgerError> {
        if let (Some(f), Some(t)) = (from, to) {
            if f > t {
                return Err(LedgerError::validation(format!(
                    "date range start {f} is after its end {t}"
                )));
            }
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.from.is_none_or(|f| day >= f) && self.to.is_none_or(|t| day <= t)
    }
}

/// Criteria for `list_movements`. Every populated field must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementFilter {
    #[serde(default)]
    pub range: DateRange,
    pub product_id: Option<ProductId>,
    pub employee_id: Option<EmployeeId>,
    pub kind: Option<MovementKind>,
    pub category: Option<ProductCategory>,
    /// Case-insensitive match against the movement number, supplier and notes.
    pub search: Option<String>,
}

impl MovementFilter {
    /// `category` is the category of the movement's product, resolved by the caller.
    pub fn matches(&self, movement: &Movement, category: Option<ProductCategory>) -> bool {
        if !self.range.contains(movement.effective_date) {
            return false;
        }
        if self.product_id.is_some_and(|p| p != movement.product_id) {
            return false;
        }
        if self.employee_id.is_some() && self.employee_id != movement.employee_id {
            return false;
        }
        if self.kind.is_some_and(|k| k != movement.kind) {
            return false;
        }
        if self.category.is_some() && self.category != category {
            return false;
        }
        match self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                let hit = |s: &str| s.to_lowercase().contains(&needle);
                hit(movement.number.as_str())
                    || movement.supplier.as_deref().is_some_and(hit)
                    || movement.notes.as_deref().is_some_and(hit)
            }
        }
    }
}

/// Listing order: effective date desc, then recorded_at desc, then number.
pub fn listing_order(a: &Movement, b: &Movement) -> Ordering {
    b.effective_date
        .cmp(&a.effective_date)
        .then_with(|| b.recorded_at.cmp(&a.recorded_at))
        .then_with(|| a.number.cmp(&b.number))
}

/// Ordered, finite snapshot of movements.
///
/// Cloning is cheap and every clone (or `iter()` call) starts from the
/// beginning again, so a result can be consumed any number of times.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Movements(Arc<[Movement]>);

impl Movements {
    /// Sort into listing order and freeze.
    pub fn collect(mut movements: Vec<Movement>) -> Self {
        movements.sort_by(listing_order);
        Self(movements.into())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Movement> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Movement] {
        &self.0
    }

    /// The newest `n` movements, still in listing order.
    pub fn first(&self, n: usize) -> &[Movement] {
        &self.0[..n.min(self.0.len())]
    }
}

impl<'a> IntoIterator for &'a Movements {
    type Item = &'a Movement;
    type IntoIter = std::slice::Iter<'a, Movement>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for Movements {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}
