//! Inputs of the ledger service operations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockroom_ledger::{EmployeeId, ExitKind, ProductCategory, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub category: ProductCategory,
    pub unit: String,
    #[serde(default)]
    pub minimum_stock: i64,
    /// Counted stock at creation, recorded as an opening entry.
    pub opening_stock: Option<i64>,
    /// Effective date of the opening entry; today when absent.
    pub opening_date: Option<NaiveDate>,
}

/// Fields left `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub minimum_stock: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub position: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRequest {
    pub product_id: ProductId,
    pub quantity: i64,
    pub supplier: String,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitRequest {
    pub product_id: ProductId,
    pub employee_id: EmployeeId,
    pub quantity: i64,
    pub kind: ExitKind,
    pub effective_date: NaiveDate,
    pub signature: Option<String>,
    pub notes: Option<String>,
}
