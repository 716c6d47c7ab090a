use axum::response::Response;
use chrono::NaiveDate;
use serde::Deserialize;

use stockroom_core::AggregateId;
use stockroom_infra::projections::{EmployeeQuery, ProductQuery};
use stockroom_infra::stock_ledger::{EntryRequest, ExitRequest, NewEmployee, NewProduct, ProductChanges};
use stockroom_ledger::{DateRange, EmployeeId, ExitKind, MovementFilter, MovementKind, ProductCategory, ProductId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub code: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    #[serde(default)]
    pub minimum_stock: i64,
    pub opening_stock: Option<i64>,
    pub opening_date: Option<NaiveDate>,
}

impl CreateProductRequest {
    pub fn into_new_product(self) -> Result<NewProduct, Response> {
        Ok(NewProduct {
            category: parse_category(&self.category)?,
            code: self.code,
            name: self.name,
            unit: self.unit,
            minimum_stock: self.minimum_stock,
            opening_stock: self.opening_stock,
            opening_date: self.opening_date,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub minimum_stock: Option<i64>,
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(value: UpdateProductRequest) -> Self {
        ProductChanges {
            name: value.name,
            unit: value.unit,
            minimum_stock: value.minimum_stock,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterEmployeeRequest {
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub area: String,
    #[serde(default)]
    pub position: String,
}

impl From<RegisterEmployeeRequest> for NewEmployee {
    fn from(value: RegisterEmployeeRequest) -> Self {
        NewEmployee {
            name: value.name,
            email: value.email,
            area: value.area,
            position: value.position,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordEntryRequest {
    pub product_id: String,
    pub quantity: i64,
    pub supplier: String,
    pub effective_date: NaiveDate,
    pub notes: Option<String>,
}

impl RecordEntryRequest {
    pub fn into_entry(self) -> Result<EntryRequest, Response> {
        Ok(EntryRequest {
            product_id: ProductId::new(parse_id(&self.product_id, "product")?),
            quantity: self.quantity,
            supplier: self.supplier,
            effective_date: self.effective_date,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordExitRequest {
    pub product_id: String,
    pub employee_id: String,
    pub quantity: i64,
    /// `delivered` or `returned`.
    pub kind: String,
    pub effective_date: NaiveDate,
    pub signature: Option<String>,
    pub notes: Option<String>,
}

impl RecordExitRequest {
    pub fn into_exit(self) -> Result<ExitRequest, Response> {
        let kind = match self.kind.trim().to_lowercase().as_str() {
            "delivered" | "delivery" => ExitKind::Delivered,
            "returned" | "return" => ExitKind::Returned,
            _ => return Err(errors::bad_request("kind must be one of: delivered, returned")),
        };
        Ok(ExitRequest {
            product_id: ProductId::new(parse_id(&self.product_id, "product")?),
            employee_id: EmployeeId::new(parse_id(&self.employee_id, "employee")?),
            quantity: self.quantity,
            kind,
            effective_date: self.effective_date,
            signature: self.signature,
            notes: self.notes,
        })
    }
}

// -------------------------
// Query strings
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ProductListParams {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl ProductListParams {
    pub fn into_query(self) -> Result<ProductQuery, Response> {
        Ok(ProductQuery {
            category: self.category.as_deref().map(parse_category).transpose()?,
            search: self.search,
            include_inactive: self.include_inactive,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeListParams {
    pub area: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl From<EmployeeListParams> for EmployeeQuery {
    fn from(value: EmployeeListParams) -> Self {
        EmployeeQuery {
            area: value.area,
            search: value.search,
            include_inactive: value.include_inactive,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub product_id: Option<String>,
    pub employee_id: Option<String>,
    pub kind: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

impl MovementParams {
    pub fn into_filter(self) -> Result<MovementFilter, Response> {
        let range = DateRange::new(self.from, self.to).map_err(|e| errors::bad_request(e.to_string()))?;
        let kind = self
            .kind
            .as_deref()
            .map(|k| {
                k.parse::<MovementKind>()
                    .map_err(|_| errors::bad_request("kind must be one of: entry, delivered, returned"))
            })
            .transpose()?;
        Ok(MovementFilter {
            range,
            product_id: self
                .product_id
                .as_deref()
                .map(|id| parse_id(id, "product").map(ProductId::new))
                .transpose()?,
            employee_id: self
                .employee_id
                .as_deref()
                .map(|id| parse_id(id, "employee").map(EmployeeId::new))
                .transpose()?,
            kind,
            category: self.category.as_deref().map(parse_category).transpose()?,
            search: self.search,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardParams {
    /// Reference day for the "this month" counters; today when absent.
    pub today: Option<NaiveDate>,
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_id(raw: &str, what: &str) -> Result<AggregateId, Response> {
    raw.trim()
        .parse()
        .map_err(|_| errors::json_error(axum::http::StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

pub fn parse_category(raw: &str) -> Result<ProductCategory, Response> {
    raw.parse()
        .map_err(|_| errors::bad_request("category must be one of: uniform, medication"))
}
