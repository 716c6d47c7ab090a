//! Flat, read-only shapes handed to reporting and export consumers.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::UserId;

use crate::movement::{Movement, MovementKind};
use crate::product::ProductCategory;
use crate::status::StockStatusReport;

/// One movement flattened for CSV/report generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementReportRow {
    pub number: String,
    pub kind: MovementKind,
    pub effective_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub product_code: String,
    pub product_name: String,
    pub category: Option<ProductCategory>,
    pub quantity: i64,
    pub employee_name: Option<String>,
    pub recorded_by: UserId,
    pub signature: Option<String>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

/// Catalog facts needed to flatten a movement.
#[derive(Debug, Clone, Copy)]
pub struct ProductLabel<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub category: Option<ProductCategory>,
}

impl MovementReportRow {
    pub fn new(movement: &Movement, product: ProductLabel<'_>, employee_name: Option<&str>) -> Self {
        Self {
            number: movement.number.as_str().to_string(),
            kind: movement.kind,
            effective_date: movement.effective_date,
            recorded_at: movement.recorded_at,
            product_code: product.code.to_string(),
            product_name: product.name.to_string(),
            category: product.category,
            quantity: movement.quantity.get(),
            employee_name: employee_name.map(str::to_string),
            recorded_by: movement.recorded_by,
            signature: movement.signature.as_ref().map(|s| s.as_str().to_string()),
            supplier: movement.supplier.clone(),
            notes: movement.notes.clone(),
        }
    }
}

/// Totals over a filtered set of movements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_movements: u64,
    pub total_entries: u64,
    pub total_deliveries: u64,
    pub total_returns: u64,
    /// Entries plus returns.
    pub quantity_in: i64,
    pub quantity_out: i64,
}

impl ReportSummary {
    pub fn add(&mut self, movement: &Movement) {
        let q = movement.quantity.get();
        self.total_movements += 1;
        match movement.kind {
            MovementKind::Entry => {
                self.total_entries += 1;
                self.quantity_in = self.quantity_in.saturating_add(q);
            }
            MovementKind::Delivered => {
                self.total_deliveries += 1;
                self.quantity_out = self.quantity_out.saturating_add(q);
            }
            MovementKind::Returned => {
                self.total_returns += 1;
                self.quantity_in = self.quantity_in.saturating_add(q);
            }
        }
    }

    pub fn net_change(&self) -> i64 {
        self.quantity_in.saturating_sub(self.quantity_out)
    }
}

impl<'a> FromIterator<&'a Movement> for ReportSummary {
    fn from_iter<I: IntoIterator<Item = &'a Movement>>(iter: I) -> Self {
        let mut summary = ReportSummary::default();
        for m in iter {
            summary.add(m);
        }
        summary
    }
}

/// A line of the dashboard's recent activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub number: String,
    pub kind: MovementKind,
    pub product_name: String,
    pub employee_name: Option<String>,
    pub quantity: i64,
    pub effective_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    /// Sum of stock over active products.
    pub total_stock: i64,
    pub active_products: u64,
    pub entries_this_month: u64,
    pub deliveries_this_month: u64,
    pub returns_this_month: u64,
    pub low_stock_alerts: u64,
    pub recent_activity: Vec<RecentActivity>,
    pub low_stock_products: Vec<StockStatusReport>,
}

/// Whether `day` falls in the same calendar month as `today`.
pub fn same_month(day: NaiveDate, today: NaiveDate) -> bool {
    day.year() == today.year() && day.month() == today.month()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::EmployeeId;
    use crate::movement::{MovementId, MovementNumber, Quantity, Signature};
    use crate::product::ProductId;
    use stockroom_core::AggregateId;

    fn movement(kind: MovementKind, q: i64) -> Movement {
        let id = MovementId::new();
        let day = NaiveDate::from_ymd_opt(2026, 3, 12).unwrap();
        Movement {
            id,
            number: MovementNumber::generate(kind, day, id),
            kind,
            product_id: ProductId::new(AggregateId::new()),
            employee_id: kind.is_exit().then(|| EmployeeId::new(AggregateId::new())),
            quantity: Quantity::new(q).unwrap(),
            effective_date: day,
            recorded_at: Utc::now(),
            recorded_by: UserId::new(),
            signature: (kind == MovementKind::Delivered)
                .then(|| Signature::parse(Some("Juan Pérez")).unwrap()),
            supplier: None,
            notes: None,
        }
    }

    #[test]
    fn summary_counts_by_kind() {
        let ms = vec![
            movement(MovementKind::Entry, 10),
            movement(MovementKind::Delivered, 4),
            movement(MovementKind::Returned, 1),
            movement(MovementKind::Delivered, 2),
        ];
        let summary: ReportSummary = ms.iter().collect();
        assert_eq!(summary.total_movements, 4);
        assert_eq!(summary.total_entries, 1);
        assert_eq!(summary.total_deliveries, 2);
        assert_eq!(summary.total_returns, 1);
        assert_eq!(summary.quantity_in, 11);
        assert_eq!(summary.quantity_out, 6);
        assert_eq!(summary.net_change(), 5);
    }

    #[test]
    fn summary_totals_saturate_across_products() {
        let ms = vec![
            movement(MovementKind::Entry, i64::MAX),
            movement(MovementKind::Entry, i64::MAX),
            movement(MovementKind::Delivered, 1),
        ];
        let summary: ReportSummary = ms.iter().collect();
        assert_eq!(summary.quantity_in, i64::MAX);
        assert_eq!(summary.net_change(), i64::MAX - 1);
    }

    #[test]
    fn row_flattens_signature_and_labels() {
        let m = movement(MovementKind::Delivered, 3);
        let row = MovementReportRow::new(
            &m,
            ProductLabel {
                code: "CAM-M",
                name: "Camisa M",
                category: Some(ProductCategory::Uniform),
            },
            Some("Juan Pérez"),
        );
        assert_eq!(row.signature.as_deref(), Some("Juan Pérez"));
        assert_eq!(row.product_code, "CAM-M");
        assert_eq!(row.quantity, 3);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["kind"], "delivered");
    }

    #[test]
    fn month_boundaries() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        assert!(same_month(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), today));
        assert!(!same_month(NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(), today));
        assert!(!same_month(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(), today));
    }
}
