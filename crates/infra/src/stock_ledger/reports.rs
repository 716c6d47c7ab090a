//! Report rows and dashboard figures computed from the read models.

use std::collections::HashMap;

use chrono::NaiveDate;

use stockroom_ledger::{
    DashboardStats, EmployeeId, MovementKind, MovementReportRow, Movements, ProductId, ProductLabel,
    RecentActivity, same_month,
};

use crate::projections::{EmployeeReadModel, ProductReadModel};

/// Id → display name lookups for flattening movements.
pub struct Labels<'a> {
    products: HashMap<ProductId, &'a ProductReadModel>,
    employees: HashMap<EmployeeId, &'a EmployeeReadModel>,
}

impl<'a> Labels<'a> {
    pub fn new(products: &'a [ProductReadModel], employees: &'a [EmployeeReadModel]) -> Self {
        Self {
            products: products.iter().map(|p| (p.product_id, p)).collect(),
            employees: employees.iter().map(|e| (e.employee_id, e)).collect(),
        }
    }

    pub fn product(&self, id: ProductId) -> ProductLabel<'a> {
        match self.products.get(&id) {
            Some(p) => ProductLabel {
                code: &p.code,
                name: &p.name,
                category: Some(p.category),
            },
            None => ProductLabel {
                code: "",
                name: "",
                category: None,
            },
        }
    }

    pub fn employee_name(&self, id: Option<EmployeeId>) -> Option<&'a str> {
        id.and_then(|id| self.employees.get(&id)).map(|e| e.name.as_str())
    }
}

pub fn report_rows(movements: &Movements, labels: &Labels<'_>) -> Vec<MovementReportRow> {
    movements
        .iter()
        .map(|m| MovementReportRow::new(m, labels.product(m.product_id), labels.employee_name(m.employee_id)))
        .collect()
}

pub fn dashboard(
    products: &[ProductReadModel],
    movements: &Movements,
    labels: &Labels<'_>,
    today: NaiveDate,
    recent_limit: usize,
) -> DashboardStats {
    let active: Vec<_> = products.iter().filter(|p| p.is_active()).collect();

    let mut low: Vec<_> = active.iter().filter(|p| p.stock_status.is_alert()).collect();
    low.sort_by(|a, b| a.current_stock.cmp(&b.current_stock).then_with(|| a.code.cmp(&b.code)));

    let mut stats = DashboardStats {
        total_stock: active.iter().fold(0i64, |sum, p| sum.saturating_add(p.current_stock)),
        active_products: active.len() as u64,
        low_stock_alerts: low.len() as u64,
        low_stock_products: low.iter().map(|p| p.stock_report()).collect(),
        ..DashboardStats::default()
    };

    for m in movements.iter().filter(|m| same_month(m.effective_date, today)) {
        match m.kind {
            MovementKind::Entry => stats.entries_this_month += 1,
            MovementKind::Delivered => stats.deliveries_this_month += 1,
            MovementKind::Returned => stats.returns_this_month += 1,
        }
    }

    stats.recent_activity = movements
        .first(recent_limit)
        .iter()
        .map(|m| RecentActivity {
            number: m.number.as_str().to_string(),
            kind: m.kind,
            product_name: labels.product(m.product_id).name.to_string(),
            employee_name: labels.employee_name(m.employee_id).map(str::to_string),
            quantity: m.quantity.get(),
            effective_date: m.effective_date,
            recorded_at: m.recorded_at,
        })
        .collect();

    stats
}
