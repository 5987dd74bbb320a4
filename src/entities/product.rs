use serde::{Deserialize, Serialize};

/// A sellable product. Ids are externally assigned; the store never
/// generates them. In practice a product is immutable once an invoice line
/// references it, though the store allows updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Unit price excluding tax, non-negative.
    pub unit_price: f64,
    /// Tax rate as a percentage, 0-100.
    pub tax_rate: f64,
}
