use serde::{Deserialize, Serialize};

use crate::product::ProductId;

/// Derived alert state of a product's stock.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    LowStock,
    Normal,
}

impl StockStatus {
    /// Equality at the minimum counts as low.
    pub fn classify(level: i64, minimum: i64) -> Self {
        if level <= 0 {
            StockStatus::OutOfStock
        } else if level <= minimum {
            StockStatus::LowStock
        } else {
            StockStatus::Normal
        }
    }

    /// Whether the level deserves an alert on the dashboard.
    pub fn is_alert(self) -> bool {
        !matches!(self, StockStatus::Normal)
    }
}

/// Answer of `get_stock_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockStatusReport {
    pub product_id: ProductId,
    pub code: String,
    pub level: i64,
    pub minimum: i64,
    pub status: StockStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_boundaries() {
        assert_eq!(StockStatus::classify(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(1, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::classify(6, 5), StockStatus::Normal);
        assert_eq!(StockStatus::classify(0, 0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::classify(1, 0), StockStatus::Normal);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&StockStatus::OutOfStock).unwrap(),
            "\"out_of_stock\""
        );
    }
}
